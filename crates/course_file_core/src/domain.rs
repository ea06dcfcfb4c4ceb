//! crates/course_file_core/src/domain.rs
//!
//! Defines the core data structures for the course-file workflow: the
//! organisational tree that is read by the engine, the workflow entities it
//! owns, and the closed enums that drive the review state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Closed Enums
//=========================================================================================

/// The role a user holds in the institution.
///
/// HOD status is ultimately decided by `Department::head_user_id`; the role only
/// selects which rules apply when the user acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Faculty,
    Cc,
    Hod,
    Student,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Faculty => "FACULTY",
            Self::Cc => "CC",
            Self::Hod => "HOD",
            Self::Student => "STUDENT",
        }
    }
}

/// Instructor-side status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

/// Reviewer-side decision on a task. CC and HOD each carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Yes,
    No,
}

impl ReviewStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A reviewer's verdict. Unlike `ReviewStatus` it cannot be `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Yes,
    No,
}

impl From<Decision> for ReviewStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Yes => ReviewStatus::Yes,
            Decision::No => ReviewStatus::No,
        }
    }
}

macro_rules! display_and_parse {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case(Self::$variant.as_str()) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} value '{}'", stringify!($ty), s))
            }
        }
    };
}

display_and_parse!(Role { Faculty, Cc, Hod, Student });
display_and_parse!(TaskStatus { Pending, Completed });
display_and_parse!(ReviewStatus { Pending, Yes, No });

impl Decision {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

display_and_parse!(Decision { Yes, No });

//=========================================================================================
// Organisational Tree (read-only for the engine)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub head_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: Uuid,
    pub number: i32,
    pub department_id: Uuid,
}

/// A class (section) within a semester, optionally led by a coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub semester_id: Uuid,
    pub coordinator_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub semester_id: Uuid,
    pub faculty_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub home_class_id: Option<Uuid>,
}

/// The authenticated user on whose behalf an operation runs.
///
/// Built once per request by `WorkflowEngine::resolve_actor` and passed
/// explicitly into every engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub class_coordinated: Option<Uuid>,
    pub departments_headed: Vec<Uuid>,
}

//=========================================================================================
// Workflow Entities
//=========================================================================================

/// A required compliance artifact type, e.g. "Lesson Plan".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub is_active: bool,
}

/// One instructor's responsibility for one subject in one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub faculty_id: Uuid,
    pub class_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One checklist item of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub template_id: Uuid,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub cc_status: ReviewStatus,
    pub cc_remarks: Option<String>,
    pub cc_review_date: Option<DateTime<Utc>>,
    pub hod_status: ReviewStatus,
    pub hod_remarks: Option<String>,
    pub hod_review_date: Option<DateTime<Utc>>,
}

impl Task {
    /// A freshly created checklist item: `(PENDING, PENDING, PENDING)`.
    pub fn new_pending(assignment_id: Uuid, template_id: Uuid, deadline: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            template_id,
            deadline,
            status: TaskStatus::Pending,
            completed_at: None,
            cc_status: ReviewStatus::Pending,
            cc_remarks: None,
            cc_review_date: None,
            hod_status: ReviewStatus::Pending,
            hod_remarks: None,
            hod_review_date: None,
        }
    }

    pub fn state(&self) -> TaskState {
        TaskState {
            status: self.status,
            cc_status: self.cc_status,
            hod_status: self.hod_status,
        }
    }
}

/// The `(status, ccStatus, hodStatus)` triple that the state machine keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    pub cc_status: ReviewStatus,
    pub hod_status: ReviewStatus,
}

impl TaskState {
    /// `hod decided ⟹ cc decided ⟹ completed`.
    pub fn is_ordered(&self) -> bool {
        let cc_ok = !self.cc_status.is_decided() || self.status == TaskStatus::Completed;
        let hod_ok = !self.hod_status.is_decided() || self.cc_status.is_decided();
        cc_ok && hod_ok
    }
}

/// A task joined with the template it was snapshotted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub task: Task,
    pub template_title: String,
    pub template_order: i32,
}

/// Everything needed to authorise and describe an action on one task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task: Task,
    pub template: TaskTemplate,
    pub assignment: Assignment,
    pub subject: Subject,
    pub class: Class,
    pub semester: Semester,
    pub department: Department,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentProgress {
    pub completed: u64,
    pub total: u64,
}

//=========================================================================================
// Compliance Alerts
//=========================================================================================

/// Which part of the organisation an alert query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertScope {
    Global,
    Departments(Vec<Uuid>),
    Class(Uuid),
    Faculty(Uuid),
}

/// A task whose deadline has passed while the instructor has not completed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueTask {
    pub task: Task,
    pub template_title: String,
    pub assignment_id: Uuid,
    pub faculty_id: Uuid,
    pub class_name: String,
    pub subject_name: String,
    pub days_overdue: i64,
}

//=========================================================================================
// Audit Log
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    FacultyAssigned,
    AssignmentDeleted,
    TaskCompleted,
    TaskReverted,
    CcReviewed,
    HodReviewed,
    HodBatchReview,
    DeadlineUpdated,
    TemplateCreated,
    TemplateUpdated,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FacultyAssigned => "FACULTY_ASSIGNED",
            Self::AssignmentDeleted => "ASSIGNMENT_DELETED",
            Self::TaskCompleted => "TASK_COMPLETED",
            Self::TaskReverted => "TASK_REVERTED",
            Self::CcReviewed => "CC_REVIEWED",
            Self::HodReviewed => "HOD_REVIEWED",
            Self::HodBatchReview => "HOD_BATCH_REVIEW",
            Self::DeadlineUpdated => "DEADLINE_UPDATED",
            Self::TemplateCreated => "TEMPLATE_CREATED",
            Self::TemplateUpdated => "TEMPLATE_UPDATED",
        }
    }
}

display_and_parse!(AuditAction {
    FacultyAssigned,
    AssignmentDeleted,
    TaskCompleted,
    TaskReverted,
    CcReviewed,
    HodReviewed,
    HodBatchReview,
    DeadlineUpdated,
    TemplateCreated,
    TemplateUpdated,
});

/// An immutable record of one state-changing action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub message: String,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub assignment_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub subject_name: Option<String>,
    pub task_title: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Optional descriptive fields attached to an audit entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditContext {
    pub assignment_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub subject_name: Option<String>,
    pub task_title: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl AuditContext {
    pub fn for_task(ctx: &TaskContext) -> Self {
        Self {
            assignment_id: Some(ctx.assignment.id),
            class_name: Some(ctx.class.name.clone()),
            subject_name: Some(ctx.subject.name.clone()),
            task_title: Some(ctx.template.title.clone()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Filter for reading back the audit log. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub assignment_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_invariant_rejects_review_before_completion() {
        let state = TaskState {
            status: TaskStatus::Pending,
            cc_status: ReviewStatus::Yes,
            hod_status: ReviewStatus::Pending,
        };
        assert!(!state.is_ordered());

        let state = TaskState {
            status: TaskStatus::Completed,
            cc_status: ReviewStatus::Pending,
            hod_status: ReviewStatus::No,
        };
        assert!(!state.is_ordered());

        let state = TaskState {
            status: TaskStatus::Completed,
            cc_status: ReviewStatus::No,
            hod_status: ReviewStatus::Pending,
        };
        assert!(state.is_ordered());
    }

    #[test]
    fn enums_parse_their_storage_strings() {
        assert_eq!("HOD".parse::<Role>().unwrap(), Role::Hod);
        assert_eq!("cc".parse::<Role>().unwrap(), Role::Cc);
        assert_eq!("COMPLETED".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!("NO".parse::<ReviewStatus>().unwrap(), ReviewStatus::No);
        assert_eq!(
            "HOD_BATCH_REVIEW".parse::<AuditAction>().unwrap(),
            AuditAction::HodBatchReview
        );
        assert!("ADMIN".parse::<Role>().is_err());
        assert!("PENDING".parse::<Decision>().is_err());
    }

    #[test]
    fn decision_maps_onto_review_status() {
        assert_eq!(ReviewStatus::from(Decision::Yes), ReviewStatus::Yes);
        assert_eq!(ReviewStatus::from(Decision::No), ReviewStatus::No);
    }

    #[test]
    fn role_serializes_in_upper_case() {
        let json = serde_json::to_string(&Role::Faculty).unwrap();
        assert_eq!(json, "\"FACULTY\"");
    }
}
