pub mod assignments;
pub mod middleware;
pub mod reports;
pub mod rest;
pub mod state;
pub mod tasks;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};

pub use middleware::require_actor;
use state::AppState;

/// Builds the workflow routes. Everything except `/health` requires an
/// `x-user-id` that resolves to a known user.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/health", get(rest::health_handler));

    let protected_routes = Router::new()
        .route("/me", get(rest::whoami_handler))
        .route(
            "/templates",
            get(templates::list_templates_handler).post(templates::create_template_handler),
        )
        .route(
            "/templates/{template_id}",
            patch(templates::update_template_handler),
        )
        .route(
            "/templates/{template_id}/active",
            put(templates::set_template_active_handler),
        )
        .route("/assignments", post(assignments::create_assignment_handler))
        .route(
            "/assignments/{assignment_id}",
            get(assignments::get_assignment_handler).delete(assignments::delete_assignment_handler),
        )
        .route(
            "/assignments/{assignment_id}/tasks",
            get(assignments::list_assignment_tasks_handler),
        )
        .route(
            "/assignments/{assignment_id}/progress",
            get(assignments::assignment_progress_handler),
        )
        .route(
            "/assignments/{assignment_id}/batch-review",
            post(assignments::batch_review_handler),
        )
        .route("/tasks/{task_id}", get(tasks::get_task_handler))
        .route("/tasks/{task_id}/complete", post(tasks::complete_task_handler))
        .route("/tasks/{task_id}/revert", post(tasks::revert_task_handler))
        .route("/tasks/{task_id}/review", post(tasks::review_task_handler))
        .route("/tasks/{task_id}/deadline", put(tasks::set_deadline_handler))
        .route("/compliance/alerts", get(reports::compliance_alerts_handler))
        .route("/compliance/summary", get(reports::compliance_summary_handler))
        .route("/audit-logs", get(reports::list_audit_log_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_actor,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
