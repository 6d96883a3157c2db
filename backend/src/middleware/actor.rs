//! Actor identity middleware
//!
//! Identity resolution and role enforcement live in an upstream gateway;
//! this subsystem only needs to know which actor drove a transition for
//! the audit trail. The gateway forwards the resolved identity in the
//! `x-actor-id` header (with an optional `x-actor-name`).

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::ErrorResponse;

/// Resolved actor identity forwarded by the gateway
#[derive(Clone, Debug)]
pub struct Actor {
    pub actor_id: Uuid,
    pub name: Option<String>,
}

/// Middleware that requires a resolved actor identity on every request
pub async fn actor_middleware(mut request: Request, next: Next) -> Response {
    let actor_id = request
        .headers()
        .get("x-actor-id")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());

    let actor_id = match actor_id {
        Some(id) => id,
        None => return unauthorized_response("Missing or invalid x-actor-id header"),
    };

    let name = request
        .headers()
        .get("x-actor-name")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    request.extensions_mut().insert(Actor { actor_id, name });

    next.run(request).await
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: crate::error::ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the current actor
/// Use this in handlers to attribute transitions in the activity log
#[derive(Clone, Debug)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message: "Actor identity required".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
