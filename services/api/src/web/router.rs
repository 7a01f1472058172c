//! services/api/src/web/router.rs
//!
//! Assembles the HTTP and WebSocket routes around the shared state.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::web::{
    auth::{guest_login_handler, logout_handler, me_handler},
    middleware::resolve_user,
    rest::{
        countdown_handler, delete_messages_handler, export_messages_handler, history_handler,
        leaderboard_handler, list_messages_handler, post_message_handler, recent_logs_handler,
        wish_handler,
    },
    state::AppState,
    vocabulary::{progress_handler, save_progress_handler, topics_handler, words_handler},
    ws_handler,
};

/// Every API route. The caller's identity is resolved once per request;
/// handlers that need a user reject anonymous callers themselves.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/guest", post(guest_login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/study-logs/recent", get(recent_logs_handler))
        .route("/me/history", get(history_handler))
        .route("/countdown", get(countdown_handler))
        .route("/messages", get(list_messages_handler).post(post_message_handler))
        .route("/wish", get(wish_handler))
        .route("/admin/messages/delete", post(delete_messages_handler))
        .route("/admin/messages/export", get(export_messages_handler))
        .route("/vocabulary/topics", get(topics_handler))
        .route("/vocabulary/topics/{topic_id}/words", get(words_handler))
        .route("/me/progress", get(progress_handler))
        .route("/me/progress/{topic_id}", post(save_progress_handler))
        .route("/ws/study", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_user,
        ))
        .with_state(app_state)
}
