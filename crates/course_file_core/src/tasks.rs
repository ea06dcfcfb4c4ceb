//! Per-task lifecycle operations: completion, revert, CC and HOD review, and
//! deadline edits. Each state change is a compare-and-set write through
//! `WorkflowEngine::mutate_task`.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Actor, AuditAction, AuditContext, Decision, Role, Task, TaskContext};
use crate::engine::{
    ensure_assignee, ensure_class_manager, is_coordinator, is_head, self_approval, WorkflowEngine,
};
use crate::ports::{PortError, PortResult};
use crate::transitions;

fn describe(ctx: &TaskContext) -> String {
    format!(
        "\"{}\" for {} ({})",
        ctx.template.title, ctx.subject.name, ctx.class.name
    )
}

impl WorkflowEngine {
    /// Marks the task done on behalf of its assignee, applying the self-approval
    /// shortcut when the assignee is also the CC or HOD for it.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn complete_task(&self, task_id: Uuid, actor: &Actor) -> PortResult<Task> {
        let now = Utc::now();
        let policy = self.settings.revert_policy;
        let (ctx, task) = self
            .mutate_task(task_id, |ctx| {
                ensure_assignee(actor, ctx)?;
                let approval = self_approval(actor, ctx)?;
                transitions::complete(&ctx.task, approval, policy, now)
            })
            .await?;

        info!(%task_id, cc = %task.cc_status, hod = %task.hod_status, "Task completed");
        self.record(
            AuditAction::TaskCompleted,
            format!("{} completed {}", actor.name, describe(&ctx)),
            actor,
            AuditContext::for_task(&ctx).with_metadata(json!({
                "cc_status": task.cc_status,
                "hod_status": task.hod_status,
            })),
        )
        .await;

        Ok(task)
    }

    /// Returns a completed task to `PENDING`, clearing both reviews.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn revert_task(&self, task_id: Uuid, actor: &Actor) -> PortResult<Task> {
        let policy = self.settings.revert_policy;
        let (ctx, task) = self
            .mutate_task(task_id, |ctx| {
                ensure_assignee(actor, ctx)?;
                let approval = self_approval(actor, ctx)?;
                transitions::revert(&ctx.task, approval, policy)
            })
            .await?;

        info!(%task_id, "Task reverted");
        self.record(
            AuditAction::TaskReverted,
            format!("{} reverted {}", actor.name, describe(&ctx)),
            actor,
            AuditContext::for_task(&ctx).with_metadata(json!({
                "previous_cc_status": ctx.task.cc_status,
                "previous_hod_status": ctx.task.hod_status,
            })),
        )
        .await;

        Ok(task)
    }

    /// Routes a review to the CC or HOD rule according to the actor's role.
    pub async fn review_task(
        &self,
        task_id: Uuid,
        actor: &Actor,
        decision: Decision,
        remarks: Option<String>,
    ) -> PortResult<Task> {
        match actor.role {
            Role::Cc => self.review_as_cc(task_id, actor, decision, remarks).await,
            Role::Hod => self.review_as_hod(task_id, actor, decision, remarks).await,
            Role::Faculty | Role::Student => Err(PortError::Unauthorized(format!(
                "Role {} cannot review tasks",
                actor.role
            ))),
        }
    }

    #[instrument(skip(self, actor, remarks), fields(actor = %actor.id))]
    pub async fn review_as_cc(
        &self,
        task_id: Uuid,
        actor: &Actor,
        decision: Decision,
        remarks: Option<String>,
    ) -> PortResult<Task> {
        let now = Utc::now();
        let (ctx, task) = self
            .mutate_task(task_id, |ctx| {
                if !is_coordinator(actor, &ctx.class) {
                    return Err(PortError::Unauthorized(format!(
                        "{} is not the coordinator of class {}",
                        actor.name, ctx.class.name
                    )));
                }
                transitions::review_cc(&ctx.task, decision, remarks.clone(), now)
            })
            .await?;

        info!(%task_id, %decision, "CC review recorded");
        self.record(
            AuditAction::CcReviewed,
            format!("{} marked {} as {}", actor.name, describe(&ctx), decision),
            actor,
            AuditContext::for_task(&ctx).with_metadata(json!({
                "decision": decision,
                "remarks": task.cc_remarks,
            })),
        )
        .await;

        Ok(task)
    }

    #[instrument(skip(self, actor, remarks), fields(actor = %actor.id))]
    pub async fn review_as_hod(
        &self,
        task_id: Uuid,
        actor: &Actor,
        decision: Decision,
        remarks: Option<String>,
    ) -> PortResult<Task> {
        let now = Utc::now();
        let (ctx, task) = self
            .mutate_task(task_id, |ctx| {
                if !is_head(actor, &ctx.department) {
                    return Err(PortError::Unauthorized(format!(
                        "{} is not the head of department {}",
                        actor.name, ctx.department.name
                    )));
                }
                transitions::review_hod(&ctx.task, decision, remarks.clone(), now)
            })
            .await?;

        info!(%task_id, %decision, "HOD review recorded");
        self.record(
            AuditAction::HodReviewed,
            format!("{} marked {} as {}", actor.name, describe(&ctx), decision),
            actor,
            AuditContext::for_task(&ctx).with_metadata(json!({
                "decision": decision,
                "remarks": task.hod_remarks,
            })),
        )
        .await;

        Ok(task)
    }

    /// Moves a task's deadline. Only the class coordinator or department head may
    /// do so; the review state is untouched.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_task_deadline(
        &self,
        task_id: Uuid,
        actor: &Actor,
        deadline: DateTime<Utc>,
    ) -> PortResult<Task> {
        let ctx = self.load_task_context(task_id).await?;
        ensure_class_manager(actor, &ctx.class, &ctx.department)?;

        let task = self.store.update_task_deadline(task_id, deadline).await?;
        self.record(
            AuditAction::DeadlineUpdated,
            format!("{} moved the deadline of {}", actor.name, describe(&ctx)),
            actor,
            AuditContext::for_task(&ctx).with_metadata(json!({
                "previous_deadline": ctx.task.deadline,
                "deadline": task.deadline,
            })),
        )
        .await;

        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        self.store.get_task(task_id).await
    }
}
