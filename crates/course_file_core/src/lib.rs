pub mod audit;
pub mod batch;
pub mod catalog;
pub mod compliance;
pub mod domain;
pub mod engine;
pub mod memory;
pub mod ports;
pub mod registry;
pub mod settings;
pub mod tasks;
pub mod transitions;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{NewTemplate, TemplateUpdate};
pub use compliance::{ComplianceStats, ComplianceSummary};
pub use domain::{
    Actor, AlertScope, Assignment, AssignmentProgress, AuditAction, AuditFilter, AuditLogEntry,
    Class, Decision, Department, OverdueTask, ReviewStatus, Role, Semester, Subject, Task,
    TaskState, TaskStatus, TaskTemplate, TaskView, User,
};
pub use engine::WorkflowEngine;
pub use memory::{InMemoryStore, OrgSeed};
pub use ports::{AuditLogService, PortError, PortResult, WorkflowStore};
pub use settings::{RevertPolicy, WorkflowSettings};
