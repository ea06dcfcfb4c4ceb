//! Pure transition rules of the task state machine.
//!
//! ```text
//! (PENDING, PENDING, PENDING) --complete--> (COMPLETED, PENDING, PENDING)
//!                                            --cc review--> (COMPLETED, YES|NO, PENDING)
//!                                            --hod review--> (COMPLETED, YES|NO, YES|NO)
//! any COMPLETED state --revert--> (PENDING, PENDING, PENDING)   [guarded by RevertPolicy]
//! ```
//!
//! Identity checks (is this actor the assignee, the coordinator, the head) live in
//! the engine; these functions only see the task and the already-authorised
//! capacity in which the actor is acting.

use chrono::{DateTime, Utc};

use crate::domain::{Decision, ReviewStatus, Task, TaskState, TaskStatus};
use crate::ports::{PortError, PortResult};
use crate::settings::RevertPolicy;

pub const AUTO_APPROVAL_NOTE: &str = "Auto-approved: submitted by the reviewer of this subject";
pub const BATCH_APPROVAL_NOTE: &str = "Batch Approved";

/// Which review stage the assignee also owns for this task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfApproval {
    /// Plain instructor.
    None,
    /// The assignee coordinates the task's class.
    Cc,
    /// The assignee heads the task's department.
    Hod,
}

/// Completes (or resubmits) the task. A resubmission over an HOD decision is
/// held to the same lock as `revert`.
pub fn complete(
    task: &Task,
    approval: SelfApproval,
    policy: RevertPolicy,
    at: DateTime<Utc>,
) -> PortResult<Task> {
    ensure_unlocked(task, approval, policy)?;

    let mut next = task.clone();
    next.status = TaskStatus::Completed;
    next.completed_at = Some(at);
    // A resubmission clears any earlier decision before the shortcuts apply.
    clear_cc(&mut next);
    clear_hod(&mut next);

    match approval {
        SelfApproval::None => {}
        SelfApproval::Cc => {
            next.cc_status = ReviewStatus::Yes;
            next.cc_remarks = Some(AUTO_APPROVAL_NOTE.to_string());
            next.cc_review_date = Some(at);
        }
        SelfApproval::Hod => {
            next.cc_status = ReviewStatus::Yes;
            next.cc_remarks = Some(AUTO_APPROVAL_NOTE.to_string());
            next.cc_review_date = Some(at);
            next.hod_status = ReviewStatus::Yes;
            next.hod_remarks = Some(AUTO_APPROVAL_NOTE.to_string());
            next.hod_review_date = Some(at);
        }
    }
    Ok(next)
}

pub fn revert(task: &Task, approval: SelfApproval, policy: RevertPolicy) -> PortResult<Task> {
    if task.status != TaskStatus::Completed {
        return Err(PortError::InvalidState(
            "Task is not completed, nothing to revert".to_string(),
        ));
    }

    ensure_unlocked(task, approval, policy)?;

    let mut next = task.clone();
    next.status = TaskStatus::Pending;
    next.completed_at = None;
    clear_cc(&mut next);
    clear_hod(&mut next);
    Ok(next)
}

pub fn review_cc(
    task: &Task,
    decision: Decision,
    remarks: Option<String>,
    at: DateTime<Utc>,
) -> PortResult<Task> {
    if task.status != TaskStatus::Completed {
        return Err(PortError::InvalidState(
            "Task not completed by faculty yet".to_string(),
        ));
    }

    let mut next = task.clone();
    next.cc_status = decision.into();
    next.cc_remarks = remarks;
    next.cc_review_date = Some(at);
    Ok(next)
}

pub fn review_hod(
    task: &Task,
    decision: Decision,
    remarks: Option<String>,
    at: DateTime<Utc>,
) -> PortResult<Task> {
    if task.status != TaskStatus::Completed {
        return Err(PortError::InvalidState(
            "Task not completed by faculty yet".to_string(),
        ));
    }
    if !task.cc_status.is_decided() {
        return Err(PortError::InvalidState("CC must review first".to_string()));
    }

    let mut next = task.clone();
    next.hod_status = decision.into();
    next.hod_remarks = remarks;
    next.hod_review_date = Some(at);
    Ok(next)
}

/// The predicate a batch HOD review applies per row.
pub fn is_batch_eligible(state: TaskState) -> bool {
    state.status == TaskStatus::Completed
        && state.cc_status == ReviewStatus::Yes
        && state.hod_status == ReviewStatus::Pending
}

/// Once the HOD has decided, the assignee may only undo or resubmit the task
/// when the policy lets self-approvers through.
fn ensure_unlocked(task: &Task, approval: SelfApproval, policy: RevertPolicy) -> PortResult<()> {
    if !task.hod_status.is_decided() {
        return Ok(());
    }
    let locked = match (policy, approval) {
        (RevertPolicy::LockOnHodDecision, _) => true,
        (RevertPolicy::SelfApproverBypass, SelfApproval::None) => true,
        (RevertPolicy::SelfApproverBypass, SelfApproval::Cc | SelfApproval::Hod) => false,
    };
    if locked {
        Err(PortError::InvalidState(
            "Task already reviewed by HOD".to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn apply_batch_review(task: &mut Task, decision: ReviewStatus, remarks: &str, at: DateTime<Utc>) {
    task.hod_status = decision;
    task.hod_remarks = Some(remarks.to_string());
    task.hod_review_date = Some(at);
}

fn clear_cc(task: &mut Task) {
    task.cc_status = ReviewStatus::Pending;
    task.cc_remarks = None;
    task.cc_review_date = None;
}

fn clear_hod(task: &mut Task) {
    task.hod_status = ReviewStatus::Pending;
    task.hod_remarks = None;
    task.hod_review_date = None;
}
