//! services/api/src/web/assignments.rs
//!
//! Endpoints for faculty-subject-class assignments and their checklists.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use course_file_core::{Actor, Assignment, AssignmentProgress, Decision, TaskView};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::into_http;
use crate::web::rest::TaskResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub subject_id: Uuid,
    pub faculty_id: Uuid,
    pub class_id: Uuid,
    /// Per-template deadline overrides, keyed by template id.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub deadlines: HashMap<Uuid, DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub faculty_id: Uuid,
    pub class_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            subject_id: assignment.subject_id,
            faculty_id: assignment.faculty_id,
            class_id: assignment.class_id,
            created_at: assignment.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TaskViewResponse {
    pub task: TaskResponse,
    pub template_title: String,
    pub template_order: i32,
}

impl From<TaskView> for TaskViewResponse {
    fn from(view: TaskView) -> Self {
        Self {
            task: view.task.into(),
            template_title: view.template_title,
            template_order: view.template_order,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub completed: u64,
    pub total: u64,
}

impl From<AssignmentProgress> for ProgressResponse {
    fn from(progress: AssignmentProgress) -> Self {
        Self {
            completed: progress.completed,
            total: progress.total,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BatchReviewRequest {
    #[schema(value_type = String, example = "YES")]
    pub decision: Decision,
    /// Defaults to "Batch Approved".
    pub remarks: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BatchReviewResponse {
    /// Number of tasks the HOD decision was applied to.
    pub count: u64,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /assignments - Assign a subject in a class to a faculty member
///
/// Creates one pending task per active template. Allowed for the class
/// coordinator and the head of the owning department.
#[utoipa::path(
    post,
    path = "/assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignment and checklist created", body = AssignmentResponse),
        (status = 403, description = "Caller does not manage the class"),
        (status = 404, description = "Class, subject or faculty not found"),
        (status = 409, description = "The faculty already has this subject in this class"),
        (status = 422, description = "Subject not taught in the class's semester, or faculty is a student")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let assignment = state
        .engine
        .create_assignment(
            &actor,
            req.subject_id,
            req.faculty_id,
            req.class_id,
            &req.deadlines,
        )
        .await
        .map_err(into_http)?;
    Ok((StatusCode::CREATED, Json(AssignmentResponse::from(assignment))))
}

#[utoipa::path(
    get,
    path = "/assignments/{assignment_id}",
    responses(
        (status = 200, description = "The assignment", body = AssignmentResponse),
        (status = 404, description = "Assignment not found")
    ),
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment to read."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_assignment_handler(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let assignment = state
        .engine
        .get_assignment(assignment_id)
        .await
        .map_err(into_http)?;
    Ok(Json(AssignmentResponse::from(assignment)))
}

/// DELETE /assignments/{assignment_id} - Remove an assignment and its checklist
#[utoipa::path(
    delete,
    path = "/assignments/{assignment_id}",
    responses(
        (status = 204, description = "Assignment and its tasks deleted"),
        (status = 403, description = "Caller does not manage the class"),
        (status = 404, description = "Assignment not found")
    ),
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment to delete."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .delete_assignment(&actor, assignment_id)
        .await
        .map_err(into_http)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /assignments/{assignment_id}/tasks - The checklist in template order
#[utoipa::path(
    get,
    path = "/assignments/{assignment_id}/tasks",
    responses(
        (status = 200, description = "Tasks with their template titles", body = [TaskViewResponse]),
        (status = 404, description = "Assignment not found")
    ),
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment whose checklist to list."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_assignment_tasks_handler(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let views = state
        .engine
        .list_assignment_tasks(assignment_id)
        .await
        .map_err(into_http)?;
    Ok(Json(
        views
            .into_iter()
            .map(TaskViewResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/assignments/{assignment_id}/progress",
    responses(
        (status = 200, description = "Completed versus total tasks", body = ProgressResponse),
        (status = 404, description = "Assignment not found")
    ),
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment to measure."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn assignment_progress_handler(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let progress = state
        .engine
        .assignment_progress(assignment_id)
        .await
        .map_err(into_http)?;
    Ok(Json(ProgressResponse::from(progress)))
}

/// POST /assignments/{assignment_id}/batch-review - HOD decision on every CC-approved task
///
/// Only tasks the CC approved and the HOD has not decided are touched.
#[utoipa::path(
    post,
    path = "/assignments/{assignment_id}/batch-review",
    request_body = BatchReviewRequest,
    responses(
        (status = 200, description = "Number of tasks decided", body = BatchReviewResponse),
        (status = 403, description = "Caller does not head the assignment's department"),
        (status = 404, description = "Assignment not found")
    ),
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment to review."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn batch_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(assignment_id): Path<Uuid>,
    Json(req): Json<BatchReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let count = state
        .engine
        .batch_review_as_hod(assignment_id, &actor, req.decision, req.remarks)
        .await
        .map_err(into_http)?;
    Ok(Json(BatchReviewResponse { count }))
}
