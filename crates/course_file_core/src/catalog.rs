//! Template catalog: the ordered, togglable set of required artifact types.
//!
//! Edits here never reach tasks that already exist; assignments keep the
//! checklist they were created with.

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Actor, AuditAction, AuditContext, Role, TaskTemplate};
use crate::engine::WorkflowEngine;
use crate::ports::{PortError, PortResult};

/// The checklist a fresh installation starts with, in display order.
pub const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("Syllabus Copy", "Copy of the university-prescribed syllabus"),
    ("Academic Calendar", "Institution academic calendar for the term"),
    ("Time Table", "Class and individual time table"),
    ("Lesson Plan", "Session-wise lesson plan covering the syllabus"),
    ("Course Outcomes & CO-PO Mapping", "Course outcomes and their mapping to programme outcomes"),
    ("Question Bank", "Unit-wise question bank"),
    ("Assignment Questions", "Assignment questions issued to students"),
    ("Internal Assessment Question Papers", "Question papers of internal assessments"),
    ("Result Analysis", "Analysis of internal and university results"),
    ("Attendance Register", "Attendance record for the term"),
];

/// Builds the default catalog as template values, all active.
pub fn default_templates() -> Vec<TaskTemplate> {
    DEFAULT_TEMPLATES
        .iter()
        .enumerate()
        .map(|(index, (title, description))| TaskTemplate {
            id: Uuid::new_v4(),
            title: (*title).to_string(),
            description: (*description).to_string(),
            order: index as i32 + 1,
            is_active: true,
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
}

fn ensure_catalog_editor(actor: &Actor) -> PortResult<()> {
    match actor.role {
        Role::Hod => Ok(()),
        Role::Cc | Role::Faculty | Role::Student => Err(PortError::Unauthorized(
            "Only a department head can edit the template catalog".to_string(),
        )),
    }
}

fn validated_title(title: &str) -> PortResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PortError::InvalidState(
            "Template title must not be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

impl WorkflowEngine {
    pub async fn list_templates(&self, active_only: bool) -> PortResult<Vec<TaskTemplate>> {
        self.store.list_templates(active_only).await
    }

    pub async fn create_template(
        &self,
        actor: &Actor,
        new: NewTemplate,
    ) -> PortResult<TaskTemplate> {
        ensure_catalog_editor(actor)?;
        let title = validated_title(&new.title)?;

        let order = match new.order {
            Some(order) => order,
            None => {
                let existing = self.store.list_templates(false).await?;
                existing.iter().map(|t| t.order).max().unwrap_or(0) + 1
            }
        };

        let template = self
            .store
            .insert_template(TaskTemplate {
                id: Uuid::new_v4(),
                title,
                description: new.description.trim().to_string(),
                order,
                is_active: true,
            })
            .await?;

        info!(template_id = %template.id, title = %template.title, "Template created");
        self.record(
            AuditAction::TemplateCreated,
            format!("{} added template \"{}\"", actor.name, template.title),
            actor,
            AuditContext::default().with_metadata(json!({
                "template_id": template.id,
                "order": template.order,
            })),
        )
        .await;

        Ok(template)
    }

    pub async fn update_template(
        &self,
        actor: &Actor,
        template_id: Uuid,
        update: TemplateUpdate,
    ) -> PortResult<TaskTemplate> {
        ensure_catalog_editor(actor)?;
        let mut template = self.store.get_template(template_id).await?;

        if let Some(title) = update.title.as_deref() {
            template.title = validated_title(title)?;
        }
        if let Some(description) = update.description {
            template.description = description.trim().to_string();
        }
        if let Some(order) = update.order {
            template.order = order;
        }

        let template = self.store.update_template(template).await?;
        self.record(
            AuditAction::TemplateUpdated,
            format!("{} edited template \"{}\"", actor.name, template.title),
            actor,
            AuditContext::default().with_metadata(json!({ "template_id": template.id })),
        )
        .await;

        Ok(template)
    }

    /// Soft-removes (`false`) or restores (`true`) a template.
    pub async fn set_template_active(
        &self,
        actor: &Actor,
        template_id: Uuid,
        is_active: bool,
    ) -> PortResult<TaskTemplate> {
        ensure_catalog_editor(actor)?;
        let mut template = self.store.get_template(template_id).await?;
        template.is_active = is_active;
        let template = self.store.update_template(template).await?;

        info!(%template_id, is_active, "Template availability changed");
        self.record(
            AuditAction::TemplateUpdated,
            format!(
                "{} {} template \"{}\"",
                actor.name,
                if is_active { "enabled" } else { "disabled" },
                template.title
            ),
            actor,
            AuditContext::default().with_metadata(json!({
                "template_id": template.id,
                "is_active": is_active,
            })),
        )
        .await;

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn create_appends_to_end_of_catalog() {
        let fx = Fixture::new().await;
        let hod = fx.actor(fx.hod).await;

        let template = fx
            .engine
            .create_template(
                &hod,
                NewTemplate {
                    title: "  Lab Manual ".to_string(),
                    description: String::new(),
                    order: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(template.title, "Lab Manual");
        assert_eq!(template.order, 4);
        let all = fx.engine.list_templates(true).await.unwrap();
        assert_eq!(all.last().map(|t| t.id), Some(template.id));
    }

    #[tokio::test]
    async fn only_hod_edits_catalog() {
        let fx = Fixture::new().await;
        let cc = fx.actor(fx.cc).await;

        let err = fx
            .engine
            .create_template(
                &cc,
                NewTemplate {
                    title: "Lab Manual".to_string(),
                    description: String::new(),
                    order: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let fx = Fixture::new().await;
        let hod = fx.actor(fx.hod).await;
        let err = fx
            .engine
            .update_template(
                &hod,
                fx.templates[0],
                TemplateUpdate {
                    title: Some("   ".to_string()),
                    ..TemplateUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidState(_)));
    }

    #[tokio::test]
    async fn disabling_a_template_does_not_touch_existing_checklists() {
        let fx = Fixture::new().await;
        let hod = fx.actor(fx.hod).await;
        let before = fx.assign_default().await;

        fx.engine
            .set_template_active(&hod, fx.templates[0], false)
            .await
            .unwrap();

        let existing = fx.engine.list_assignment_tasks(before.id).await.unwrap();
        assert_eq!(existing.len(), 3);

        let later = fx.assign(fx.subject, fx.faculty2, fx.class).await;
        let fresh = fx.engine.list_assignment_tasks(later.id).await.unwrap();
        assert_eq!(fresh.len(), 2);
        assert!(fresh.iter().all(|v| v.task.template_id != fx.templates[0]));
    }

    #[test]
    fn default_catalog_is_ordered_from_one() {
        let templates = default_templates();
        assert_eq!(templates.len(), DEFAULT_TEMPLATES.len());
        assert_eq!(templates[0].title, "Syllabus Copy");
        assert!(templates.windows(2).all(|w| w[0].order < w[1].order));
    }
}
