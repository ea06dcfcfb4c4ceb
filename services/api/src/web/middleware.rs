//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use course_file_core::{Actor, PortError};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that resolves the calling user from the `x-user-id` header.
///
/// If the user exists, the resolved `Actor` is inserted into the request
/// extensions for handlers to use. A missing, malformed, or unknown id
/// returns 401 Unauthorized.
pub async fn require_actor(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor = actor_from_headers(&state, req.headers()).await?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

pub async fn actor_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Actor, StatusCode> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    state.engine.resolve_actor(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => {
            debug!(%user_id, "Rejected request from unknown user");
            StatusCode::UNAUTHORIZED
        }
        other => {
            error!("Failed to resolve actor {}: {:?}", user_id, other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::TestOrg;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn known_user_resolves_with_positions() {
        let org = TestOrg::new();
        let actor = actor_from_headers(&org.state, &headers(&org.cc.to_string()))
            .await
            .unwrap();
        assert_eq!(actor.id, org.cc);
        assert_eq!(actor.class_coordinated, Some(org.class));
    }

    #[tokio::test]
    async fn missing_malformed_or_unknown_ids_are_unauthorized() {
        let org = TestOrg::new();

        let missing = actor_from_headers(&org.state, &HeaderMap::new()).await;
        assert_eq!(missing.unwrap_err(), StatusCode::UNAUTHORIZED);

        let malformed = actor_from_headers(&org.state, &headers("not-a-uuid")).await;
        assert_eq!(malformed.unwrap_err(), StatusCode::UNAUTHORIZED);

        let unknown = actor_from_headers(&org.state, &headers(&Uuid::new_v4().to_string())).await;
        assert_eq!(unknown.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
