//! crates/course_file_core/src/ports.rs
//!
//! Defines the service contracts (traits) the workflow engine depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! state machine independent of the concrete store (Postgres or in-memory).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AlertScope, Assignment, AuditFilter, AuditLogEntry, Class, Department, OverdueTask,
    ReviewStatus, Semester, Subject, Task, TaskState, TaskTemplate, TaskView, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type for every port and engine operation.
///
/// The first four variants are terminal workflow outcomes surfaced to the caller;
/// `Unexpected` wraps failures of the underlying store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // --- Organisational Tree ---
    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_department(&self, department_id: Uuid) -> PortResult<Department>;

    async fn get_semester(&self, semester_id: Uuid) -> PortResult<Semester>;

    async fn get_class(&self, class_id: Uuid) -> PortResult<Class>;

    async fn get_subject(&self, subject_id: Uuid) -> PortResult<Subject>;

    async fn departments_headed_by(&self, user_id: Uuid) -> PortResult<Vec<Department>>;

    async fn class_coordinated_by(&self, user_id: Uuid) -> PortResult<Option<Class>>;

    /// Semesters of a department, ordered by number.
    async fn list_semesters(&self, department_id: Uuid) -> PortResult<Vec<Semester>>;

    /// Classes of a semester, ordered by name.
    async fn list_classes(&self, semester_id: Uuid) -> PortResult<Vec<Class>>;

    // --- Template Catalog ---
    /// Templates ordered by `order`, then title.
    async fn list_templates(&self, active_only: bool) -> PortResult<Vec<TaskTemplate>>;

    async fn get_template(&self, template_id: Uuid) -> PortResult<TaskTemplate>;

    async fn insert_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate>;

    /// Overwrites title, description, order and the active flag.
    async fn update_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate>;

    // --- Assignments ---
    /// Inserts the assignment and all of its tasks atomically.
    ///
    /// Fails with `Conflict` if an assignment already exists for the same
    /// `(subject, faculty, class)` triple; in that case no task is written.
    async fn create_assignment_with_tasks(
        &self,
        assignment: Assignment,
        tasks: Vec<Task>,
    ) -> PortResult<Assignment>;

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment>;

    async fn find_assignment(
        &self,
        subject_id: Uuid,
        faculty_id: Uuid,
        class_id: Uuid,
    ) -> PortResult<Option<Assignment>>;

    async fn list_assignments_for_class(&self, class_id: Uuid) -> PortResult<Vec<Assignment>>;

    /// Deletes the assignment together with its tasks. Returns the number of
    /// tasks removed.
    async fn delete_assignment(&self, assignment_id: Uuid) -> PortResult<u64>;

    // --- Tasks ---
    async fn get_task(&self, task_id: Uuid) -> PortResult<Task>;

    async fn list_tasks(&self, assignment_id: Uuid) -> PortResult<Vec<Task>>;

    /// Tasks of an assignment joined with their template, in template order.
    async fn list_task_views(&self, assignment_id: Uuid) -> PortResult<Vec<TaskView>>;

    /// Compare-and-set write of the workflow columns of `task`.
    ///
    /// The write only happens if the stored `(status, cc_status, hod_status)` still
    /// equals `expected`. Returns `None` when it does not. The deadline column is
    /// never touched by this call.
    async fn update_task_if(&self, task: &Task, expected: TaskState) -> PortResult<Option<Task>>;

    async fn update_task_deadline(
        &self,
        task_id: Uuid,
        deadline: DateTime<Utc>,
    ) -> PortResult<Task>;

    /// Sets the HOD decision on every task of the assignment that currently has
    /// `cc_status = YES AND hod_status = PENDING`, evaluating that predicate in the
    /// same step that writes. Returns the number of rows changed.
    async fn batch_review_hod(
        &self,
        assignment_id: Uuid,
        decision: ReviewStatus,
        remarks: &str,
        at: DateTime<Utc>,
    ) -> PortResult<u64>;

    // --- Compliance ---
    /// Tasks with `status = PENDING AND deadline < now` inside `scope`, oldest
    /// deadline first.
    async fn overdue_tasks(
        &self,
        scope: &AlertScope,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortResult<Vec<OverdueTask>>;
}

#[async_trait]
pub trait AuditLogService: Send + Sync {
    /// Appends an entry. Entries are never modified afterwards.
    async fn append(&self, entry: AuditLogEntry) -> PortResult<()>;

    async fn list(&self, filter: &AuditFilter) -> PortResult<Vec<AuditLogEntry>>;
}
