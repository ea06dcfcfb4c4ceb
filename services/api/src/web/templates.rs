//! services/api/src/web/templates.rs
//!
//! Endpoints for the template catalog.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use course_file_core::{Actor, NewTemplate, TaskTemplate, TemplateUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::into_http;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct ListTemplatesQuery {
    /// Only return templates used for new assignments. Defaults to true.
    pub active_only: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTemplateRequest {
    pub title: String,
    pub description: Option<String>,
    /// Position in the checklist. Appended to the end when omitted.
    pub order: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetTemplateActiveRequest {
    pub is_active: bool,
}

#[derive(Serialize, ToSchema)]
pub struct TemplateResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub is_active: bool,
}

impl From<TaskTemplate> for TemplateResponse {
    fn from(template: TaskTemplate) -> Self {
        Self {
            id: template.id,
            title: template.title,
            description: template.description,
            order: template.order,
            is_active: template.is_active,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /templates - List the checklist catalog in display order
#[utoipa::path(
    get,
    path = "/templates",
    responses(
        (status = 200, description = "Templates ordered by position", body = [TemplateResponse])
    ),
    params(
        ListTemplatesQuery,
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_templates_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let templates = state
        .engine
        .list_templates(query.active_only.unwrap_or(true))
        .await
        .map_err(into_http)?;
    Ok(Json(
        templates
            .into_iter()
            .map(TemplateResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /templates - Add an artifact type to the catalog (HOD only)
#[utoipa::path(
    post,
    path = "/templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 403, description = "Caller is not a department head"),
        (status = 422, description = "Blank title")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_template_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let new = NewTemplate {
        title: req.title,
        description: req.description.unwrap_or_default(),
        order: req.order,
    };
    let template = state
        .engine
        .create_template(&actor, new)
        .await
        .map_err(into_http)?;
    Ok((StatusCode::CREATED, Json(TemplateResponse::from(template))))
}

/// PATCH /templates/{template_id} - Edit a template's title, description or position
#[utoipa::path(
    patch,
    path = "/templates/{template_id}",
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 403, description = "Caller is not a department head"),
        (status = 404, description = "Template not found")
    ),
    params(
        ("template_id" = Uuid, Path, description = "Template to edit."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn update_template_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = TemplateUpdate {
        title: req.title,
        description: req.description,
        order: req.order,
    };
    let template = state
        .engine
        .update_template(&actor, template_id, update)
        .await
        .map_err(into_http)?;
    Ok(Json(TemplateResponse::from(template)))
}

/// PUT /templates/{template_id}/active - Retire or restore a template
#[utoipa::path(
    put,
    path = "/templates/{template_id}/active",
    request_body = SetTemplateActiveRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 403, description = "Caller is not a department head"),
        (status = 404, description = "Template not found")
    ),
    params(
        ("template_id" = Uuid, Path, description = "Template to toggle."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn set_template_active_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<SetTemplateActiveRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let template = state
        .engine
        .set_template_active(&actor, template_id, req.is_active)
        .await
        .map_err(into_http)?;
    Ok(Json(TemplateResponse::from(template)))
}
