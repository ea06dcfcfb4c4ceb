//! services/api/src/web/tasks.rs
//!
//! Endpoints that move a single checklist task through its review cycle.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use course_file_core::{Actor, Decision};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::into_http;
use crate::web::rest::TaskResponse;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(value_type = String, example = "YES")]
    pub decision: Decision,
    pub remarks: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeadlineRequest {
    pub deadline: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 404, description = "Task not found")
    ),
    params(
        ("task_id" = Uuid, Path, description = "Task to read."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = state.engine.get_task(task_id).await.map_err(into_http)?;
    Ok(Json(TaskResponse::from(task)))
}

/// POST /tasks/{task_id}/complete - The assignee marks the artifact as submitted
///
/// Clears earlier review decisions. A coordinator or head completing a task
/// in a class or department they review gets those stages approved at once.
#[utoipa::path(
    post,
    path = "/tasks/{task_id}/complete",
    responses(
        (status = 200, description = "Task completed", body = TaskResponse),
        (status = 403, description = "Caller is not the assignee"),
        (status = 404, description = "Task not found")
    ),
    params(
        ("task_id" = Uuid, Path, description = "Task to complete."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = state
        .engine
        .complete_task(task_id, &actor)
        .await
        .map_err(into_http)?;
    Ok(Json(TaskResponse::from(task)))
}

/// POST /tasks/{task_id}/revert - The assignee withdraws a submission
#[utoipa::path(
    post,
    path = "/tasks/{task_id}/revert",
    responses(
        (status = 200, description = "Task back to pending", body = TaskResponse),
        (status = 403, description = "Caller is not the assignee"),
        (status = 404, description = "Task not found"),
        (status = 422, description = "Task not completed, or already decided by the HOD")
    ),
    params(
        ("task_id" = Uuid, Path, description = "Task to revert."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn revert_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = state
        .engine
        .revert_task(task_id, &actor)
        .await
        .map_err(into_http)?;
    Ok(Json(TaskResponse::from(task)))
}

/// POST /tasks/{task_id}/review - Record the caller's review decision
///
/// Coordinators review as CC, department heads as HOD.
#[utoipa::path(
    post,
    path = "/tasks/{task_id}/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision recorded", body = TaskResponse),
        (status = 403, description = "Caller may not review this task"),
        (status = 404, description = "Task not found"),
        (status = 422, description = "Task not completed, or CC has not reviewed yet")
    ),
    params(
        ("task_id" = Uuid, Path, description = "Task to review."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn review_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = state
        .engine
        .review_task(task_id, &actor, req.decision, req.remarks)
        .await
        .map_err(into_http)?;
    Ok(Json(TaskResponse::from(task)))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}/deadline",
    request_body = DeadlineRequest,
    responses(
        (status = 200, description = "Deadline moved", body = TaskResponse),
        (status = 403, description = "Caller does not manage the class"),
        (status = 404, description = "Task not found")
    ),
    params(
        ("task_id" = Uuid, Path, description = "Task whose deadline to move."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn set_deadline_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<DeadlineRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = state
        .engine
        .set_task_deadline(task_id, &actor, req.deadline)
        .await
        .map_err(into_http)?;
    Ok(Json(TaskResponse::from(task)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{read_json, TestOrg};
    use std::collections::HashMap;

    async fn first_task(org: &TestOrg) -> Uuid {
        let cc = org.actor(org.cc).await;
        let assignment = org
            .state
            .engine
            .create_assignment(&cc, org.subject, org.faculty, org.class, &HashMap::new())
            .await
            .unwrap();
        org.state
            .engine
            .list_assignment_tasks(assignment.id)
            .await
            .unwrap()
            .remove(0)
            .task
            .id
    }

    fn review(decision: Decision) -> Json<ReviewRequest> {
        Json(ReviewRequest {
            decision,
            remarks: None,
        })
    }

    #[tokio::test]
    async fn review_cycle_over_http() {
        let org = TestOrg::new();
        let task_id = first_task(&org).await;
        let faculty = org.actor(org.faculty).await;
        let cc = org.actor(org.cc).await;
        let hod = org.actor(org.hod).await;

        // HOD before CC is rejected.
        let response = review_task_handler(
            State(org.state.clone()),
            Extension(hod.clone()),
            Path(task_id),
            review(Decision::Yes),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response =
            complete_task_handler(State(org.state.clone()), Extension(faculty.clone()), Path(task_id))
                .await
                .into_response();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "COMPLETED");

        let response = review_task_handler(
            State(org.state.clone()),
            Extension(cc),
            Path(task_id),
            review(Decision::Yes),
        )
        .await
        .into_response();
        let (_, body) = read_json(response).await;
        assert_eq!(body["cc_status"], "YES");

        let response = review_task_handler(
            State(org.state.clone()),
            Extension(hod),
            Path(task_id),
            review(Decision::No),
        )
        .await
        .into_response();
        let (_, body) = read_json(response).await;
        assert_eq!(body["hod_status"], "NO");

        let response =
            revert_task_handler(State(org.state.clone()), Extension(faculty), Path(task_id))
                .await
                .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn only_the_assignee_completes_and_students_cannot_review() {
        let org = TestOrg::new();
        let task_id = first_task(&org).await;
        let cc = org.actor(org.cc).await;
        let student = org.actor(org.student).await;

        let response = complete_task_handler(State(org.state.clone()), Extension(cc), Path(task_id))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = review_task_handler(
            State(org.state.clone()),
            Extension(student),
            Path(task_id),
            review(Decision::Yes),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn coordinator_moves_a_deadline() {
        let org = TestOrg::new();
        let task_id = first_task(&org).await;
        let cc = org.actor(org.cc).await;
        let deadline = Utc::now() + chrono::Duration::days(30);

        let response = set_deadline_handler(
            State(org.state.clone()),
            Extension(cc),
            Path(task_id),
            Json(DeadlineRequest { deadline }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = org.state.engine.get_task(task_id).await.unwrap();
        assert_eq!(stored.deadline, deadline);
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let org = TestOrg::new();
        let response = get_task_handler(State(org.state.clone()), Path(Uuid::new_v4()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
