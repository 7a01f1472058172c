//! services/api/src/web/middleware.rs
//!
//! Resolves the caller's identity from the session cookie.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use countdown_core::domain::User;
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The identity attached to every request. Both fields are `None` for anonymous visitors.
#[derive(Clone, Debug, Default)]
pub struct CurrentUser {
    pub session: Option<String>,
    pub user: Option<User>,
}

/// Middleware that looks up the session cookie and inserts a [`CurrentUser`]
/// into request extensions. It never rejects; handlers that need a user
/// answer `AUTH_REQUIRED` themselves.
pub async fn resolve_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = session_cookie(req.headers());

    let user = match &session {
        Some(session) => match state.identity.current_user(session).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Failed to resolve session: {}", e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(CurrentUser { session, user });
    next.run(req).await
}

/// Extracts the session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}
