//! Tunables of the workflow engine.

use std::fmt;
use std::str::FromStr;

/// Whether an HOD decision locks a task against revert for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevertPolicy {
    /// Plain instructors are locked out once the HOD has decided; a CC or HOD
    /// reverting a task they self-approved may still do so.
    #[default]
    SelfApproverBypass,
    /// Any HOD decision locks the task unconditionally.
    LockOnHodDecision,
}

impl RevertPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelfApproverBypass => "self_approver_bypass",
            Self::LockOnHodDecision => "lock_on_hod_decision",
        }
    }
}

impl fmt::Display for RevertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevertPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "self_approver_bypass" | "bypass" => Ok(Self::SelfApproverBypass),
            "lock_on_hod_decision" | "lock" => Ok(Self::LockOnHodDecision),
            other => Err(format!("'{}' is not a valid revert policy", other)),
        }
    }
}

/// Upper bound accepted for `WorkflowSettings::default_deadline_days`.
pub const MAX_DEFAULT_DEADLINE_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Deadline offset for tasks created without an explicit deadline.
    pub default_deadline_days: i64,
    pub revert_policy: RevertPolicy,
    /// Maximum number of rows a compliance-alert query returns.
    pub alert_limit: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_deadline_days: 15,
            revert_policy: RevertPolicy::default(),
            alert_limit: 500,
        }
    }
}
