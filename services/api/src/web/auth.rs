//! services/api/src/web/auth.rs
//!
//! The identity bridge: sign-in from the identity provider's callback, the
//! session view used for role gating, role selection, and logout.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use sat_prep_core::domain::{AuthSession, Role};
use sat_prep_core::session::{AuthContext, SessionPhase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::SignInFailurePolicy;
use crate::error::{ErrorBody, HttpError};
use crate::web::middleware::{resolve_context, SESSION_COOKIE};
use crate::web::rest::{required, required_text};
use crate::web::state::AppState;

pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// An identity assertion relayed by the identity provider's callback.
#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectRoleRequest {
    /// `instructor` or `student`.
    #[serde(rename = "type")]
    pub role: Option<String>,
}

/// What the presentation layer knows about the caller.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<String>,
    /// `unauthenticated`, `authenticated-no-role` or `authenticated-with-role`.
    pub phase: String,
    /// Landing path for this phase.
    pub redirect: String,
}

impl SessionResponse {
    fn new(context: Option<&AuthContext>) -> Self {
        let phase = SessionPhase::of(context);
        let user = context.map(|c| &c.user);
        Self {
            email: user.map(|u| u.email.clone()),
            name: user.and_then(|u| u.name.clone()),
            role: user.and_then(|u| u.role).map(|r| r.as_str().to_string()),
            phase: phase.as_str().to_string(),
            redirect: phase.landing_path().to_string(),
        }
    }
}

/// Compares in time that depends only on the lengths, not on where the
/// first differing byte is.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/sign-in - Record a federated sign-in and open a session
#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SessionResponse),
        (status = 400, description = "Missing email", body = ErrorBody),
        (status = 401, description = "Missing or wrong identity bridge secret", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    params(
        ("x-identity-secret" = String, Header, description = "Secret shared with the identity provider.")
    )
)]
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    // 1. Only the identity provider's callback may assert identities
    let secret = headers
        .get(IDENTITY_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !secrets_match(secret, state.config.identity_bridge_secret.as_bytes()) {
        warn!("Rejected sign-in without a valid identity bridge secret");
        return Err(HttpError::Unauthorized);
    }

    let Json(req) = payload?;
    let email = required_text(req.email, "email")?;
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    // 2. Upsert the user row, keyed by email
    let user = match state.db.upsert_user(&email, name.as_deref()).await {
        Ok(user) => user,
        Err(e) => match state.config.signin_failure_policy {
            SignInFailurePolicy::Reject => {
                error!("Failed to upsert user on sign-in: {}", e);
                return Err(HttpError::Store("Failed to sign in".to_string()));
            }
            SignInFailurePolicy::Ignore => {
                warn!("Ignoring failed user upsert on sign-in: {}", e);
                state.db.get_user_by_email(&email).await.map_err(|e| {
                    error!("No user row to fall back to on sign-in: {}", e);
                    HttpError::Store("Failed to sign in".to_string())
                })?
            }
        },
    };

    // 3. Open the auth session
    let ttl = Duration::days(state.config.session_ttl_days);
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        expires_at: Utc::now() + ttl,
    };
    state
        .db
        .create_auth_session(&session)
        .await
        .map_err(|e| HttpError::port(e, "create session"))?;
    info!(user_id = %user.id, "User signed in");

    // 4. Return the session view with the cookie
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        ttl.num_seconds()
    );
    let context = AuthContext {
        session_id: session.id,
        user,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::new(Some(&context))),
    ))
}

/// GET /api/auth/session - Describe the caller's session and where to send them
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session view, possibly unauthenticated", body = SessionResponse),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, HttpError> {
    let context = resolve_context(&state, &headers).await?;
    Ok(Json(SessionResponse::new(context.as_ref())))
}

/// POST /api/auth/role - Choose the role for the signed-in user
#[utoipa::path(
    post,
    path = "/api/auth/role",
    request_body = SelectRoleRequest,
    responses(
        (status = 200, description = "Role stored", body = SessionResponse),
        (status = 400, description = "Missing or unknown role", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn select_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    payload: Result<Json<SelectRoleRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, HttpError> {
    let Json(req) = payload?;
    let role = required(req.role, "type")?
        .parse::<Role>()
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;

    let user = state
        .db
        .set_user_role(context.user.id, role)
        .await
        .map_err(|e| HttpError::port(e, "update role"))?;
    info!(user_id = %user.id, %role, "Role selected");

    let context = AuthContext { user, ..context };
    Ok(Json(SessionResponse::new(Some(&context))))
}

/// POST /api/auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<impl IntoResponse, HttpError> {
    state
        .db
        .delete_auth_session(&context.session_id)
        .await
        .map_err(|e| HttpError::port(e, "logout"))?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
