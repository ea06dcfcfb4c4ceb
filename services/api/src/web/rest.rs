//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, and the response
//! payloads shared by several endpoint groups.

use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use course_file_core::{Actor, Task};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::{assignments, reports, tasks, templates};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        whoami_handler,
        templates::list_templates_handler,
        templates::create_template_handler,
        templates::update_template_handler,
        templates::set_template_active_handler,
        assignments::create_assignment_handler,
        assignments::get_assignment_handler,
        assignments::delete_assignment_handler,
        assignments::list_assignment_tasks_handler,
        assignments::assignment_progress_handler,
        assignments::batch_review_handler,
        tasks::get_task_handler,
        tasks::complete_task_handler,
        tasks::revert_task_handler,
        tasks::review_task_handler,
        tasks::set_deadline_handler,
        reports::compliance_alerts_handler,
        reports::compliance_summary_handler,
        reports::list_audit_log_handler,
    ),
    components(
        schemas(
            ActorResponse,
            TaskResponse,
            templates::TemplateResponse,
            templates::CreateTemplateRequest,
            templates::UpdateTemplateRequest,
            templates::SetTemplateActiveRequest,
            assignments::CreateAssignmentRequest,
            assignments::AssignmentResponse,
            assignments::TaskViewResponse,
            assignments::ProgressResponse,
            assignments::BatchReviewRequest,
            assignments::BatchReviewResponse,
            tasks::ReviewRequest,
            tasks::DeadlineRequest,
            reports::OverdueTaskResponse,
            reports::AuditLogResponse,
        )
    ),
    tags(
        (name = "Course File API", description = "Course-file compliance workflow: assignments, checklist tasks, reviews and reports.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Structs
//=========================================================================================

/// The caller as the workflow sees them.
#[derive(Serialize, ToSchema)]
pub struct ActorResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "FACULTY")]
    pub role: String,
    pub class_coordinated: Option<Uuid>,
    pub departments_headed: Vec<Uuid>,
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name,
            role: actor.role.to_string(),
            class_coordinated: actor.class_coordinated,
            departments_headed: actor.departments_headed,
        }
    }
}

/// One checklist item of an assignment.
#[derive(Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub template_id: Uuid,
    pub deadline: DateTime<Utc>,
    #[schema(example = "COMPLETED")]
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(example = "YES")]
    pub cc_status: String,
    pub cc_remarks: Option<String>,
    pub cc_review_date: Option<DateTime<Utc>>,
    #[schema(example = "PENDING")]
    pub hod_status: String,
    pub hod_remarks: Option<String>,
    pub hod_review_date: Option<DateTime<Utc>>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            assignment_id: task.assignment_id,
            template_id: task.template_id,
            deadline: task.deadline,
            status: task.status.to_string(),
            completed_at: task.completed_at,
            cc_status: task.cc_status.to_string(),
            cc_remarks: task.cc_remarks,
            cc_review_date: task.cc_review_date,
            hod_status: task.hod_status.to_string(),
            hod_remarks: task.hod_remarks,
            hod_review_date: task.hod_review_date,
        }
    }
}

//=========================================================================================
// Service Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Returns the caller resolved from the `x-user-id` header.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The resolved caller", body = ActorResponse),
        (status = 401, description = "Missing or unknown x-user-id")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn whoami_handler(Extension(actor): Extension<Actor>) -> Json<ActorResponse> {
    Json(actor.into())
}
