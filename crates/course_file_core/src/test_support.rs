//! Shared fixture for engine tests: a small organisation seeded into an
//! `InMemoryStore`.
//!
//! ```text
//! CSE (head: hod)                      ECE (head: other_hod)
//!  ├─ semester 3                        └─ semester 1
//!  │   ├─ CSE-3A (cc)  ── Data Structures [faculty, faculty2]
//!  │   └─ CSE-3B (other_cc)
//!  └─ semester 5 (empty)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Actor, Assignment, AuditFilter, AuditLogEntry, Class, Department, Role, Semester, Subject,
    Task, TaskTemplate, User,
};
use crate::engine::WorkflowEngine;
use crate::memory::{InMemoryStore, OrgSeed};
use crate::ports::{AuditLogService, PortError, PortResult};
use crate::settings::WorkflowSettings;

const TEMPLATE_TITLES: [&str; 3] = ["Syllabus Copy", "Lesson Plan", "Question Bank"];

/// An audit sink that rejects every write.
struct FailingAuditLog;

#[async_trait]
impl AuditLogService for FailingAuditLog {
    async fn append(&self, _entry: AuditLogEntry) -> PortResult<()> {
        Err(PortError::Unexpected("audit table unavailable".to_string()))
    }

    async fn list(&self, _filter: &AuditFilter) -> PortResult<Vec<AuditLogEntry>> {
        Ok(Vec::new())
    }
}

pub(crate) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub engine: WorkflowEngine,
    pub semester: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
    pub hod: Uuid,
    pub other_hod: Uuid,
    pub cc: Uuid,
    pub other_cc: Uuid,
    pub faculty: Uuid,
    pub faculty2: Uuid,
    pub student: Uuid,
    pub templates: Vec<Uuid>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::build(WorkflowSettings::default(), TEMPLATE_TITLES.len(), false)
    }

    pub async fn with_settings(settings: WorkflowSettings) -> Self {
        Self::build(settings, TEMPLATE_TITLES.len(), false)
    }

    pub async fn with_template_count(count: usize) -> Self {
        Self::build(WorkflowSettings::default(), count, false)
    }

    pub async fn with_failing_audit() -> Self {
        Self::build(WorkflowSettings::default(), TEMPLATE_TITLES.len(), true)
    }

    fn build(settings: WorkflowSettings, template_count: usize, failing_audit: bool) -> Self {
        let user = |name: &str, role: Role, home_class_id: Option<Uuid>| User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role,
            home_class_id,
        };

        let hod = user("Dr. Rao", Role::Hod, None);
        let other_hod = user("Dr. Iyer", Role::Hod, None);
        let cc = user("Ms. Khan", Role::Cc, None);
        let other_cc = user("Mr. Das", Role::Cc, None);
        let faculty = user("Mr. Pillai", Role::Faculty, None);
        let faculty2 = user("Ms. Mehta", Role::Faculty, None);

        let cse = Department {
            id: Uuid::new_v4(),
            name: "Computer Science".to_string(),
            head_user_id: Some(hod.id),
        };
        let ece = Department {
            id: Uuid::new_v4(),
            name: "Electronics".to_string(),
            head_user_id: Some(other_hod.id),
        };
        let semester = |number: i32, department_id: Uuid| Semester {
            id: Uuid::new_v4(),
            number,
            department_id,
        };
        let sem3 = semester(3, cse.id);
        let sem5 = semester(5, cse.id);
        let ece_sem1 = semester(1, ece.id);

        let class_a = Class {
            id: Uuid::new_v4(),
            name: "CSE-3A".to_string(),
            semester_id: sem3.id,
            coordinator_user_id: Some(cc.id),
        };
        let class_b = Class {
            id: Uuid::new_v4(),
            name: "CSE-3B".to_string(),
            semester_id: sem3.id,
            coordinator_user_id: Some(other_cc.id),
        };
        let student = user("Ravi", Role::Student, Some(class_a.id));

        let subject = Subject {
            id: Uuid::new_v4(),
            name: "Data Structures".to_string(),
            semester_id: sem3.id,
            faculty_ids: vec![faculty.id, faculty2.id],
        };

        let templates: Vec<TaskTemplate> = (0..template_count)
            .map(|i| TaskTemplate {
                id: Uuid::new_v4(),
                title: TEMPLATE_TITLES
                    .get(i)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| format!("Artifact {:02}", i + 1)),
                description: String::new(),
                order: i as i32 + 1,
                is_active: true,
            })
            .collect();

        let fixture_ids = (
            sem3.id, class_a.id, subject.id, hod.id, other_hod.id, cc.id, other_cc.id,
            faculty.id, faculty2.id, student.id,
        );
        let template_ids = templates.iter().map(|t| t.id).collect();

        let store = Arc::new(
            InMemoryStore::from_seed(OrgSeed {
                departments: vec![cse, ece],
                semesters: vec![sem3, sem5, ece_sem1],
                classes: vec![class_a, class_b],
                subjects: vec![subject],
                users: vec![hod, other_hod, cc, other_cc, faculty, faculty2, student],
                templates,
            })
            .expect("seed in-memory store"),
        );

        let audit: Arc<dyn AuditLogService> = if failing_audit {
            Arc::new(FailingAuditLog)
        } else {
            store.clone()
        };
        let engine = WorkflowEngine::new(store.clone(), audit, settings);

        let (semester, class, subject, hod, other_hod, cc, other_cc, faculty, faculty2, student) =
            fixture_ids;
        Self {
            store,
            engine,
            semester,
            class,
            subject,
            hod,
            other_hod,
            cc,
            other_cc,
            faculty,
            faculty2,
            student,
            templates: template_ids,
        }
    }

    pub async fn actor(&self, user_id: Uuid) -> Actor {
        self.engine
            .resolve_actor(user_id)
            .await
            .expect("resolve fixture actor")
    }

    /// Creates an assignment as the class coordinator.
    pub async fn assign(&self, subject_id: Uuid, faculty_id: Uuid, class_id: Uuid) -> Assignment {
        let cc = self.actor(self.cc).await;
        self.engine
            .create_assignment(&cc, subject_id, faculty_id, class_id, &HashMap::new())
            .await
            .expect("create fixture assignment")
    }

    pub async fn assign_default(&self) -> Assignment {
        self.assign(self.subject, self.faculty, self.class).await
    }

    pub async fn first_task(&self, assignment_id: Uuid) -> Task {
        self.engine
            .list_assignment_tasks(assignment_id)
            .await
            .expect("list fixture tasks")
            .remove(0)
            .task
    }
}
