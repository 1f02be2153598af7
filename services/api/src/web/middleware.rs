//! services/api/src/web/middleware.rs
//!
//! Authentication and role-gating middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sat_prep_core::domain::Role;
use sat_prep_core::ports::PortError;
use sat_prep_core::session::{AccessError, AuthContext};
use std::sync::Arc;

use crate::error::HttpError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Pulls the auth session id out of the `Cookie` header, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}

/// Resolves the caller's session to an [`AuthContext`].
///
/// A missing, unknown or expired session is `Ok(None)`; only store failures error.
pub async fn resolve_context(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, HttpError> {
    let Some(session_id) = session_cookie(headers) else {
        return Ok(None);
    };
    match state.db.resolve_auth_session(&session_id).await {
        Ok(user) => Ok(Some(AuthContext { session_id, user })),
        Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => Err(HttpError::port(e, "validate session")),
    }
}

/// Middleware that validates the auth session cookie.
///
/// If valid, inserts the [`AuthContext`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let context = resolve_context(&state, req.headers())
        .await?
        .ok_or(HttpError::Unauthorized)?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Lets through callers who have selected any role. Must run after `require_auth`.
pub async fn require_role(req: Request, next: Next) -> Result<Response, HttpError> {
    authorize(&req, None)?;
    Ok(next.run(req).await)
}

/// Lets through instructors only. Must run after `require_auth`.
pub async fn require_instructor(req: Request, next: Next) -> Result<Response, HttpError> {
    authorize(&req, Some(Role::Instructor))?;
    Ok(next.run(req).await)
}

fn authorize(req: &Request, required: Option<Role>) -> Result<Role, HttpError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(AccessError::Unauthenticated)?;
    Ok(context.authorize(required)?)
}
