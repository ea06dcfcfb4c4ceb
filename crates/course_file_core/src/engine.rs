//! crates/course_file_core/src/engine.rs
//!
//! The `WorkflowEngine` service object. Operations are split by concern into
//! `catalog`, `registry`, `tasks`, `batch`, `compliance` and `audit`, each adding
//! an `impl WorkflowEngine` block; this module holds the shared plumbing.

use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::{Actor, Class, Department, Role, Task, TaskContext};
use crate::ports::{AuditLogService, PortError, PortResult, WorkflowStore};
use crate::settings::WorkflowSettings;
use crate::transitions::SelfApproval;

/// Number of read-evaluate-write rounds a single-task mutation gets before it
/// gives up on a task that keeps changing underneath it.
const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct WorkflowEngine {
    pub(crate) store: Arc<dyn WorkflowStore>,
    pub(crate) audit: Arc<dyn AuditLogService>,
    pub(crate) settings: WorkflowSettings,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        audit: Arc<dyn AuditLogService>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            store,
            audit,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Builds the explicit actor value for a user from the organisational tree.
    pub async fn resolve_actor(&self, user_id: Uuid) -> PortResult<Actor> {
        let user = self.store.get_user(user_id).await?;
        let class_coordinated = self
            .store
            .class_coordinated_by(user_id)
            .await?
            .map(|class| class.id);
        let departments_headed = self
            .store
            .departments_headed_by(user_id)
            .await?
            .into_iter()
            .map(|department| department.id)
            .collect();

        Ok(Actor {
            id: user.id,
            name: user.name,
            role: user.role,
            class_coordinated,
            departments_headed,
        })
    }

    /// Loads a task together with every node above it in the organisational tree.
    pub(crate) async fn load_task_context(&self, task_id: Uuid) -> PortResult<TaskContext> {
        let task = self.store.get_task(task_id).await?;
        let assignment = self.store.get_assignment(task.assignment_id).await?;
        let template = self.store.get_template(task.template_id).await?;
        let subject = self.store.get_subject(assignment.subject_id).await?;
        let class = self.store.get_class(assignment.class_id).await?;
        let semester = self.store.get_semester(class.semester_id).await?;
        let department = self.store.get_department(semester.department_id).await?;

        Ok(TaskContext {
            task,
            template,
            assignment,
            subject,
            class,
            semester,
            department,
        })
    }

    /// Loads a class and the department that owns it.
    pub(crate) async fn load_class_lineage(&self, class_id: Uuid) -> PortResult<(Class, Department)> {
        let class = self.store.get_class(class_id).await?;
        let semester = self.store.get_semester(class.semester_id).await?;
        let department = self.store.get_department(semester.department_id).await?;
        Ok((class, department))
    }

    /// Applies `transition` to the task with compare-and-set semantics.
    ///
    /// The closure sees a fresh snapshot on every attempt, so its guards are always
    /// evaluated against the state that the conditional write is keyed on.
    pub(crate) async fn mutate_task<F>(
        &self,
        task_id: Uuid,
        transition: F,
    ) -> PortResult<(TaskContext, Task)>
    where
        F: Fn(&TaskContext) -> PortResult<Task> + Send + Sync,
    {
        let mut ctx = self.load_task_context(task_id).await?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let next = transition(&ctx)?;
            if !next.state().is_ordered() {
                error!(%task_id, state = ?next.state(), "Transition broke the review ordering");
                return Err(PortError::InvalidState(
                    "Reviews must follow completion, CC before HOD".to_string(),
                ));
            }
            if let Some(written) = self.store.update_task_if(&next, ctx.task.state()).await? {
                return Ok((ctx, written));
            }

            warn!(%task_id, attempt, "Task changed concurrently, re-evaluating");
            ctx.task = self.store.get_task(task_id).await?;
        }

        Err(PortError::InvalidState(
            "Task changed concurrently, please retry".to_string(),
        ))
    }
}

//=========================================================================================
// Authorisation Helpers
//=========================================================================================

pub(crate) fn is_coordinator(actor: &Actor, class: &Class) -> bool {
    class.coordinator_user_id == Some(actor.id)
}

pub(crate) fn is_head(actor: &Actor, department: &Department) -> bool {
    department.head_user_id == Some(actor.id)
}

/// The class's coordinator or the owning department's head.
pub(crate) fn ensure_class_manager(
    actor: &Actor,
    class: &Class,
    department: &Department,
) -> PortResult<()> {
    if is_coordinator(actor, class) || is_head(actor, department) {
        Ok(())
    } else {
        Err(PortError::Unauthorized(format!(
            "{} is neither the coordinator of class {} nor the head of department {}",
            actor.name, class.name, department.name
        )))
    }
}

pub(crate) fn ensure_assignee(actor: &Actor, ctx: &TaskContext) -> PortResult<()> {
    if actor.id == ctx.assignment.faculty_id {
        Ok(())
    } else {
        Err(PortError::Unauthorized(
            "Only the assigned faculty member can change this task".to_string(),
        ))
    }
}

/// Decides which review stage, if any, the assignee also owns for this task.
///
/// The shortcut needs both the role and the matching position in the tree; an
/// HOD teaching in another department's class is a plain instructor there.
pub(crate) fn self_approval(actor: &Actor, ctx: &TaskContext) -> PortResult<SelfApproval> {
    match actor.role {
        Role::Hod if is_head(actor, &ctx.department) => Ok(SelfApproval::Hod),
        Role::Hod | Role::Cc if is_coordinator(actor, &ctx.class) => Ok(SelfApproval::Cc),
        Role::Hod | Role::Cc | Role::Faculty => Ok(SelfApproval::None),
        Role::Student => Err(PortError::Unauthorized(
            "Students cannot act on course-file tasks".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, ReviewStatus, TaskStatus};
    use crate::test_support::Fixture;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_revert_and_hod_review_never_both_succeed() {
        let fx = Fixture::new().await;
        let faculty = fx.actor(fx.faculty).await;
        let cc = fx.actor(fx.cc).await;
        let hod = fx.actor(fx.hod).await;

        for _ in 0..25 {
            let assignment = fx.assign_default().await;
            let task = fx.first_task(assignment.id).await;
            fx.engine.complete_task(task.id, &faculty).await.unwrap();
            fx.engine
                .review_as_cc(task.id, &cc, Decision::Yes, None)
                .await
                .unwrap();

            let (engine_a, engine_b) = (fx.engine.clone(), fx.engine.clone());
            let (faculty_a, hod_b) = (faculty.clone(), hod.clone());
            let revert = tokio::spawn(async move { engine_a.revert_task(task.id, &faculty_a).await });
            let review = tokio::spawn(async move {
                engine_b
                    .review_as_hod(task.id, &hod_b, Decision::No, None)
                    .await
            });
            let (revert, review) = (revert.await.unwrap(), review.await.unwrap());

            assert!(
                revert.is_ok() != review.is_ok(),
                "exactly one of revert/review must win: {revert:?} / {review:?}"
            );
            for err in [revert.err(), review.err()].into_iter().flatten() {
                assert!(matches!(err, PortError::InvalidState(_)));
            }

            let stored = fx.engine.get_task(task.id).await.unwrap();
            assert!(stored.state().is_ordered());

            fx.engine
                .delete_assignment(&hod, assignment.id)
                .await
                .unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn batch_review_skips_tasks_reverted_concurrently() {
        let fx = Fixture::with_template_count(12).await;
        let faculty = fx.actor(fx.faculty).await;
        let cc = fx.actor(fx.cc).await;
        let hod = fx.actor(fx.hod).await;
        let assignment = fx.assign_default().await;
        let tasks = fx.engine.list_assignment_tasks(assignment.id).await.unwrap();

        for view in &tasks {
            fx.engine.complete_task(view.task.id, &faculty).await.unwrap();
            fx.engine
                .review_as_cc(view.task.id, &cc, Decision::Yes, None)
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for view in tasks.iter().step_by(2) {
            let engine = fx.engine.clone();
            let faculty = faculty.clone();
            let task_id = view.task.id;
            handles.push(tokio::spawn(async move {
                let _ = engine.revert_task(task_id, &faculty).await;
            }));
        }
        let engine = fx.engine.clone();
        let batch_hod = hod.clone();
        let batch = tokio::spawn(async move {
            engine
                .batch_review_as_hod(assignment.id, &batch_hod, Decision::Yes, None)
                .await
        });
        for handle in handles {
            handle.await.unwrap();
        }
        let count = batch.await.unwrap().unwrap();

        let after = fx.engine.list_assignment_tasks(assignment.id).await.unwrap();
        let approved = after
            .iter()
            .filter(|v| v.task.hod_status == ReviewStatus::Yes)
            .count() as u64;
        assert_eq!(count, approved);
        for view in &after {
            let state = view.task.state();
            assert!(state.is_ordered());
            if view.task.status == TaskStatus::Pending {
                assert_eq!(view.task.hod_status, ReviewStatus::Pending);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ordering_invariant_survives_concurrent_actors() {
        let fx = Fixture::with_template_count(8).await;
        let faculty = fx.actor(fx.faculty).await;
        let cc = fx.actor(fx.cc).await;
        let hod = fx.actor(fx.hod).await;
        let assignment = fx.assign_default().await;
        let tasks = fx.engine.list_assignment_tasks(assignment.id).await.unwrap();

        let mut handles = Vec::new();
        for round in 0..6 {
            for view in &tasks {
                let engine = fx.engine.clone();
                let (faculty, cc, hod) = (faculty.clone(), cc.clone(), hod.clone());
                let task_id = view.task.id;
                handles.push(tokio::spawn(async move {
                    let decision = if round % 2 == 0 { Decision::Yes } else { Decision::No };
                    let _ = engine.complete_task(task_id, &faculty).await;
                    let _ = engine.review_task(task_id, &cc, decision, None).await;
                    let _ = engine.review_task(task_id, &hod, decision, None).await;
                    let _ = engine.revert_task(task_id, &faculty).await;
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for view in fx.engine.list_assignment_tasks(assignment.id).await.unwrap() {
            assert!(view.task.state().is_ordered(), "{:?}", view.task.state());
        }
    }

    #[tokio::test]
    async fn unordered_transition_is_never_written() {
        let fx = Fixture::new().await;
        let assignment = fx.assign_default().await;
        let task = fx.first_task(assignment.id).await;

        let err = fx
            .engine
            .mutate_task(task.id, |ctx| {
                let mut next = ctx.task.clone();
                next.hod_status = ReviewStatus::Yes;
                Ok(next)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidState(_)));

        let stored = fx.engine.get_task(task.id).await.unwrap();
        assert_eq!(stored.state(), task.state());
    }

    #[tokio::test]
    async fn resolve_actor_reports_positions() {
        let fx = Fixture::new().await;

        let hod = fx.actor(fx.hod).await;
        assert_eq!(hod.role, Role::Hod);
        assert_eq!(hod.departments_headed.len(), 1);
        assert!(hod.class_coordinated.is_none());

        let cc = fx.actor(fx.cc).await;
        assert_eq!(cc.class_coordinated, Some(fx.class));
        assert!(cc.departments_headed.is_empty());

        let err = fx.engine.resolve_actor(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
