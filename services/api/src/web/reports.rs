//! services/api/src/web/reports.rs
//!
//! Read-only reporting endpoints: overdue alerts, the department compliance
//! summary, and the audit trail.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use course_file_core::{Actor, AuditAction, AuditFilter, AuditLogEntry, OverdueTask};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::into_http;
use crate::web::rest::TaskResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct AlertsQuery {
    /// Evaluate overdue status at this instant instead of now.
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct OverdueTaskResponse {
    pub task: TaskResponse,
    pub template_title: String,
    pub assignment_id: Uuid,
    pub faculty_id: Uuid,
    pub class_name: String,
    pub subject_name: String,
    pub days_overdue: i64,
}

impl From<OverdueTask> for OverdueTaskResponse {
    fn from(overdue: OverdueTask) -> Self {
        Self {
            task: overdue.task.into(),
            template_title: overdue.template_title,
            assignment_id: overdue.assignment_id,
            faculty_id: overdue.faculty_id,
            class_name: overdue.class_name,
            subject_name: overdue.subject_name,
            days_overdue: overdue.days_overdue,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct AuditLogQuery {
    pub assignment_id: Option<Uuid>,
    /// Only honoured for department heads; everyone else sees their own entries.
    pub actor_id: Option<Uuid>,
    /// e.g. `TASK_COMPLETED`
    pub action: Option<String>,
    /// Defaults to 100, at most 1000.
    pub limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub id: Uuid,
    #[schema(example = "HOD_BATCH_REVIEW")]
    pub action: String,
    pub message: String,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub assignment_id: Option<Uuid>,
    pub class_name: Option<String>,
    pub subject_name: Option<String>,
    pub task_title: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogEntry> for AuditLogResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action.to_string(),
            message: entry.message,
            actor_id: entry.actor_id,
            actor_name: entry.actor_name,
            assignment_id: entry.assignment_id,
            class_name: entry.class_name,
            subject_name: entry.subject_name,
            task_title: entry.task_title,
            metadata: entry.metadata,
            created_at: entry.created_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /compliance/alerts - Overdue, never-completed tasks visible to the caller
///
/// Heads see their departments, coordinators their class, faculty their own
/// assignments. Oldest deadline first.
#[utoipa::path(
    get,
    path = "/compliance/alerts",
    responses(
        (status = 200, description = "Overdue tasks", body = [OverdueTaskResponse]),
        (status = 403, description = "Students have no alert view")
    ),
    params(
        AlertsQuery,
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn compliance_alerts_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = query.as_of.unwrap_or_else(Utc::now);
    let alerts = state
        .engine
        .compliance_alerts(&actor, now)
        .await
        .map_err(into_http)?;
    Ok(Json(
        alerts
            .into_iter()
            .map(OverdueTaskResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /compliance/summary - Completion and review percentages per semester
///
/// Covers every department the caller heads, broken down by semester and class.
#[utoipa::path(
    get,
    path = "/compliance/summary",
    responses(
        (status = 200, description = "Per-department, per-semester and per-class compliance"),
        (status = 403, description = "Caller is not a department head")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn compliance_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summary = state
        .engine
        .department_compliance_summary(&actor)
        .await
        .map_err(into_http)?;
    Ok(Json(summary))
}

/// GET /audit-logs - The audit trail, newest first
#[utoipa::path(
    get,
    path = "/audit-logs",
    responses(
        (status = 200, description = "Audit entries", body = [AuditLogResponse]),
        (status = 400, description = "Unknown action filter")
    ),
    params(
        AuditLogQuery,
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_audit_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let action = query
        .action
        .as_deref()
        .map(str::parse::<AuditAction>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let filter = AuditFilter {
        assignment_id: query.assignment_id,
        actor_id: query.actor_id,
        action,
        limit: query.limit,
    };
    let entries = state
        .engine
        .list_audit_log(&actor, filter)
        .await
        .map_err(into_http)?;
    Ok(Json(
        entries
            .into_iter()
            .map(AuditLogResponse::from)
            .collect::<Vec<_>>(),
    ))
}
