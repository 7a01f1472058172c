//! services/api/src/web/auth.rs
//!
//! Guest sign-in, sign-out, and the current-user endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use countdown_core::domain::User;
use countdown_core::error::TrackerError;
use countdown_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::web::middleware::{CurrentUser, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GuestLoginRequest {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_guest: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            is_guest: user.is_guest,
        }
    }
}

fn session_cookie_header(session: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session,
        Duration::days(30).num_seconds()
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/guest - Continue as a guest
#[utoipa::path(
    post,
    path = "/auth/guest",
    request_body = GuestLoginRequest,
    responses(
        (status = 201, description = "Guest identity created", body = UserResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn guest_login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuestLoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (session, user) = state.identity.sign_in_guest(&req.display_name).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie_header(&session))],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/logout - Sign out and clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let session = current.session.ok_or(TrackerError::AuthRequired)?;

    match state.identity.sign_out(&session).await {
        Ok(()) => info!("Session signed out."),
        Err(PortError::NotFound(_)) => warn!("Logout for an unknown session."),
        Err(e) => return Err(e.into()),
    }

    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(Extension(current): Extension<CurrentUser>) -> AppResult<Json<UserResponse>> {
    let user = current.user.ok_or(TrackerError::AuthRequired)?;
    Ok(Json(user.into()))
}
