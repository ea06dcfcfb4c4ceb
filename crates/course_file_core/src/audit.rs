//! Audit log: best-effort append on every mutation, plus filtered reads.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Actor, AuditAction, AuditContext, AuditFilter, AuditLogEntry, Role};
use crate::engine::WorkflowEngine;
use crate::ports::PortResult;

const DEFAULT_AUDIT_LIMIT: u32 = 100;
const MAX_AUDIT_LIMIT: u32 = 1000;

impl WorkflowEngine {
    /// Appends an audit entry. A failed append is logged and swallowed so it can
    /// never undo or fail the mutation that triggered it.
    ///
    /// Callers await this after their write has landed rather than spawning it,
    /// so a slow audit sink delays the response but never changes its outcome.
    pub async fn record(
        &self,
        action: AuditAction,
        message: impl Into<String>,
        actor: &Actor,
        context: AuditContext,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            action,
            message: message.into(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            assignment_id: context.assignment_id,
            class_name: context.class_name,
            subject_name: context.subject_name,
            task_title: context.task_title,
            metadata: context.metadata,
            created_at: Utc::now(),
        };

        debug!(action = %entry.action, actor = %entry.actor_id, "Recording audit entry");
        if let Err(e) = self.audit.append(entry).await {
            warn!(%action, error = %e, "Failed to write audit log entry");
        }
    }

    /// Reads the audit log, newest first. Department heads see every entry;
    /// everyone else only sees the entries they authored.
    pub async fn list_audit_log(
        &self,
        actor: &Actor,
        mut filter: AuditFilter,
    ) -> PortResult<Vec<AuditLogEntry>> {
        match actor.role {
            Role::Hod => {}
            Role::Cc | Role::Faculty | Role::Student => filter.actor_id = Some(actor.id),
        }
        filter.limit = Some(
            filter
                .limit
                .unwrap_or(DEFAULT_AUDIT_LIMIT)
                .clamp(1, MAX_AUDIT_LIMIT),
        );
        self.audit.list(&filter).await
    }
}
