//! Assignment registry: one assignment per (subject, faculty, class) triple, each
//! with a checklist snapshotted from the active templates at creation time.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Actor, Assignment, AuditAction, AuditContext, Role, Task, TaskView};
use crate::engine::{ensure_class_manager, WorkflowEngine};
use crate::ports::{PortError, PortResult};

impl WorkflowEngine {
    /// Creates the assignment and its full checklist in one atomic write.
    ///
    /// `deadlines` may carry a per-template deadline; templates without one get
    /// `now + default_deadline_days`. Entries for templates outside the active
    /// snapshot are ignored.
    #[instrument(skip(self, actor, deadlines), fields(actor = %actor.id))]
    pub async fn create_assignment(
        &self,
        actor: &Actor,
        subject_id: Uuid,
        faculty_id: Uuid,
        class_id: Uuid,
        deadlines: &HashMap<Uuid, DateTime<Utc>>,
    ) -> PortResult<Assignment> {
        let (class, department) = self.load_class_lineage(class_id).await?;
        ensure_class_manager(actor, &class, &department)?;

        let subject = self.store.get_subject(subject_id).await?;
        if subject.semester_id != class.semester_id {
            return Err(PortError::InvalidState(format!(
                "Subject {} is not taught in the semester of class {}",
                subject.name, class.name
            )));
        }

        let faculty = self.store.get_user(faculty_id).await?;
        match faculty.role {
            Role::Faculty | Role::Cc | Role::Hod => {}
            Role::Student => {
                return Err(PortError::InvalidState(format!(
                    "{} is a student and cannot be assigned a subject",
                    faculty.name
                )))
            }
        }

        if self
            .store
            .find_assignment(subject_id, faculty_id, class_id)
            .await?
            .is_some()
        {
            return Err(PortError::Conflict(format!(
                "{} is already assigned {} in class {}",
                faculty.name, subject.name, class.name
            )));
        }

        let now = Utc::now();
        let default_deadline = Duration::try_days(self.settings.default_deadline_days)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(|| {
                PortError::InvalidState(format!(
                    "A default deadline of {} days is out of range",
                    self.settings.default_deadline_days
                ))
            })?;
        let assignment = Assignment {
            id: Uuid::new_v4(),
            subject_id,
            faculty_id,
            class_id,
            created_at: now,
        };

        let templates = self.store.list_templates(true).await?;
        let tasks: Vec<Task> = templates
            .iter()
            .map(|template| {
                let deadline = deadlines
                    .get(&template.id)
                    .copied()
                    .unwrap_or(default_deadline);
                Task::new_pending(assignment.id, template.id, deadline)
            })
            .collect();
        let task_count = tasks.len();

        let assignment = self
            .store
            .create_assignment_with_tasks(assignment, tasks)
            .await?;

        info!(assignment_id = %assignment.id, task_count, "Assignment created");
        self.record(
            AuditAction::FacultyAssigned,
            format!(
                "{} assigned {} to {} for class {}",
                actor.name, faculty.name, subject.name, class.name
            ),
            actor,
            AuditContext {
                assignment_id: Some(assignment.id),
                class_name: Some(class.name.clone()),
                subject_name: Some(subject.name.clone()),
                task_title: None,
                metadata: Some(json!({
                    "faculty_id": faculty.id,
                    "faculty_name": faculty.name,
                    "task_count": task_count,
                })),
            },
        )
        .await;

        Ok(assignment)
    }

    /// Deletes an assignment and every task on its checklist.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_assignment(&self, actor: &Actor, assignment_id: Uuid) -> PortResult<()> {
        let assignment = self.store.get_assignment(assignment_id).await?;
        let (class, department) = self.load_class_lineage(assignment.class_id).await?;
        ensure_class_manager(actor, &class, &department)?;

        // Names are captured now; they cannot be joined once the rows are gone.
        let subject = self.store.get_subject(assignment.subject_id).await?;
        let faculty = self.store.get_user(assignment.faculty_id).await?;
        self.record(
            AuditAction::AssignmentDeleted,
            format!(
                "{} removed {} from {} in class {}",
                actor.name, faculty.name, subject.name, class.name
            ),
            actor,
            AuditContext {
                assignment_id: Some(assignment.id),
                class_name: Some(class.name.clone()),
                subject_name: Some(subject.name.clone()),
                task_title: None,
                metadata: Some(json!({
                    "faculty_id": faculty.id,
                    "faculty_name": faculty.name,
                })),
            },
        )
        .await;

        let removed = self.store.delete_assignment(assignment_id).await?;
        info!(%assignment_id, removed, "Assignment deleted");
        Ok(())
    }

    pub async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment> {
        self.store.get_assignment(assignment_id).await
    }

    pub async fn list_assignment_tasks(&self, assignment_id: Uuid) -> PortResult<Vec<TaskView>> {
        self.store.get_assignment(assignment_id).await?;
        self.store.list_task_views(assignment_id).await
    }
}
