//! Batch HOD review of every CC-cleared task in one assignment.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Actor, AuditAction, AuditContext, Decision, Role};
use crate::engine::{is_head, WorkflowEngine};
use crate::ports::{PortError, PortResult};
use crate::transitions::BATCH_APPROVAL_NOTE;

impl WorkflowEngine {
    /// Applies `decision` to every task of the assignment with
    /// `cc_status = YES AND hod_status = PENDING`. Other tasks are left alone.
    ///
    /// Returns the number of tasks changed; zero is a normal outcome.
    #[instrument(skip(self, actor, remarks), fields(actor = %actor.id))]
    pub async fn batch_review_as_hod(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        decision: Decision,
        remarks: Option<String>,
    ) -> PortResult<u64> {
        match actor.role {
            Role::Hod => {}
            Role::Cc | Role::Faculty | Role::Student => {
                return Err(PortError::Unauthorized(
                    "Only a department head can batch review".to_string(),
                ))
            }
        }

        let assignment = self.store.get_assignment(assignment_id).await?;
        let (class, department) = self.load_class_lineage(assignment.class_id).await?;
        if !is_head(actor, &department) {
            return Err(PortError::Unauthorized(format!(
                "{} is not the head of department {}",
                actor.name, department.name
            )));
        }

        let remarks = remarks
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| BATCH_APPROVAL_NOTE.to_string());
        let count = self
            .store
            .batch_review_hod(assignment_id, decision.into(), &remarks, Utc::now())
            .await?;

        info!(%assignment_id, %decision, count, "Batch HOD review applied");
        let subject = self.store.get_subject(assignment.subject_id).await?;
        self.record(
            AuditAction::HodBatchReview,
            format!(
                "{} marked {} task(s) of {} ({}) as {}",
                actor.name, count, subject.name, class.name, decision
            ),
            actor,
            AuditContext {
                assignment_id: Some(assignment_id),
                class_name: Some(class.name),
                subject_name: Some(subject.name),
                task_title: None,
                metadata: Some(json!({
                    "count": count,
                    "decision": decision,
                    "remarks": remarks,
                })),
            },
        )
        .await;

        Ok(count)
    }
}
