//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;
use audiopintar_core::ports::DocumentStore;

/// Middleware that validates the auth session cookie and extracts the user_id.
///
/// The session rows themselves are written by the OAuth provider integration;
/// we only look tokens up. If valid, inserts the user_id into request
/// extensions for handlers to use. If invalid or missing, returns 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = authenticate(state.store.as_ref(), req.headers()).await?;

    // Insert user_id into request extensions for the handler.
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

/// Resolves the `session` cookie to a user id. Fails closed: a missing
/// cookie, an unknown token and an expired token all come back 401.
async fn authenticate(
    store: &dyn DocumentStore,
    headers: &HeaderMap,
) -> Result<Uuid, StatusCode> {
    // 1. Extract cookie header
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Parse session token from cookie
    let session_token = cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Validate the token against the provider's bookkeeping table
    store.validate_session(session_token).await.map_err(|e| {
        warn!("rejected session token: {e}");
        StatusCode::UNAUTHORIZED
    })
}
