//! A single-department organisation behind an in-memory store, for handler tests.

use std::sync::Arc;

use course_file_core::catalog::default_templates;
use course_file_core::{
    Actor, Class, Department, InMemoryStore, OrgSeed, Role, Semester, Subject, User,
    WorkflowEngine,
};
use uuid::Uuid;

use crate::config::Config;
use crate::web::state::AppState;

pub(crate) struct TestOrg {
    pub state: Arc<AppState>,
    pub hod: Uuid,
    pub cc: Uuid,
    pub faculty: Uuid,
    pub student: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
}

impl TestOrg {
    pub fn new() -> Self {
        let user = |name: &str, role: Role| User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role,
            home_class_id: None,
        };
        let hod = user("Dr. Rao", Role::Hod);
        let cc = user("Ms. Khan", Role::Cc);
        let faculty = user("Mr. Pillai", Role::Faculty);
        let student = user("Ravi", Role::Student);

        let department = Department {
            id: Uuid::new_v4(),
            name: "Computer Science".to_string(),
            head_user_id: Some(hod.id),
        };
        let semester = Semester {
            id: Uuid::new_v4(),
            number: 3,
            department_id: department.id,
        };
        let class = Class {
            id: Uuid::new_v4(),
            name: "CSE-3A".to_string(),
            semester_id: semester.id,
            coordinator_user_id: Some(cc.id),
        };
        let subject = Subject {
            id: Uuid::new_v4(),
            name: "Data Structures".to_string(),
            semester_id: semester.id,
            faculty_ids: vec![faculty.id],
        };

        let ids = (hod.id, cc.id, faculty.id, student.id, class.id, subject.id);
        let store = Arc::new(
            InMemoryStore::from_seed(OrgSeed {
                departments: vec![department],
                semesters: vec![semester],
                classes: vec![class],
                subjects: vec![subject],
                users: vec![hod, cc, faculty, student],
                templates: default_templates(),
            })
            .expect("seed in-memory store"),
        );

        let config = Config::from_lookup(|name| match name {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("test config");
        let engine = WorkflowEngine::new(store.clone(), store, config.workflow_settings());

        let (hod, cc, faculty, student, class, subject) = ids;
        Self {
            state: Arc::new(AppState {
                engine,
                config: Arc::new(config),
            }),
            hod,
            cc,
            faculty,
            student,
            class,
            subject,
        }
    }

    pub async fn actor(&self, user_id: Uuid) -> Actor {
        self.state
            .engine
            .resolve_actor(user_id)
            .await
            .expect("resolve test actor")
    }
}

/// Reads a handler response into its status and JSON body.
pub(crate) async fn read_json(
    response: axum::response::Response,
) -> (axum::http::StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, body)
}
