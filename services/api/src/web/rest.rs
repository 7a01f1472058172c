//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::AppResult;
use crate::web::{
    auth::{self, GuestLoginRequest, UserResponse},
    middleware::CurrentUser,
    state::AppState,
    vocabulary::{self, ProgressResponse, TopicProgressResponse, TopicsResponse, WordsResponse},
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use countdown_core::board::{self, MessageDraft};
use countdown_core::countdown::time_left;
use countdown_core::domain::{LeaderboardEntry, Message, StudyLogRecord, TimeLeft};
use countdown_core::error::TrackerError;
use countdown_core::history::{load_history, HistorySummary};
use countdown_core::leaderboard::RECORD_WINDOW;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Number of records `/study-logs/recent` returns when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::guest_login_handler,
        auth::logout_handler,
        auth::me_handler,
        leaderboard_handler,
        recent_logs_handler,
        history_handler,
        countdown_handler,
        list_messages_handler,
        post_message_handler,
        wish_handler,
        delete_messages_handler,
        export_messages_handler,
        vocabulary::topics_handler,
        vocabulary::words_handler,
        vocabulary::progress_handler,
        vocabulary::save_progress_handler,
    ),
    components(
        schemas(
            GuestLoginRequest,
            UserResponse,
            LeaderboardResponse,
            RecentLogsResponse,
            HistoryResponse,
            CountdownResponse,
            MessagesResponse,
            PostMessageRequest,
            MessageResponse,
            WishResponse,
            DeleteMessagesRequest,
            DeleteMessagesResponse,
            TopicsResponse,
            WordsResponse,
            ProgressResponse,
            TopicProgressResponse,
        )
    ),
    tags(
        (name = "Exam Countdown API", description = "Study tracker, leaderboard, message board and vocabulary endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Number of most recent records the ranking is computed over.
    pub window: usize,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct RecentLogsResponse {
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<StudyLogRecord>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentLogsParams {
    /// How many records to return (at most the record window).
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = Object)]
    pub history: HistorySummary,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountdownResponse {
    pub exam_date: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub time_left: TimeLeft,
    pub is_over: bool,
}

#[derive(Serialize, ToSchema)]
pub struct MessagesResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<PostMessageRequest> for MessageDraft {
    fn from(req: PostMessageRequest) -> Self {
        Self {
            name: req.name,
            content: req.content,
            is_anonymous: req.is_anonymous,
            image_url: req.image_url,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(value_type = Object)]
    pub message: Message,
}

#[derive(Serialize, ToSchema)]
pub struct WishResponse {
    pub wish: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteMessagesRequest {
    pub ids: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteMessagesResponse {
    /// How many of the requested messages existed and were removed.
    pub deleted: usize,
}

/// Offers the board backup as a `wishes_backup.json` download.
const BACKUP_DISPOSITION: &str = "attachment; filename=\"wishes_backup.json\"";

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Ranked totals over the most recent study logs.
#[utoipa::path(
    get,
    path = "/leaderboard",
    responses((status = 200, description = "Current ranking", body = LeaderboardResponse))
)]
pub async fn leaderboard_handler(State(state): State<Arc<AppState>>) -> Json<LeaderboardResponse> {
    let entries = state.feed.borrow().leaderboard.clone();
    Json(LeaderboardResponse {
        window: RECORD_WINDOW,
        entries,
    })
}

/// The newest study logs across all users.
#[utoipa::path(
    get,
    path = "/study-logs/recent",
    params(RecentLogsParams),
    responses((status = 200, description = "Newest records first", body = RecentLogsResponse))
)]
pub async fn recent_logs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentLogsParams>,
) -> Json<RecentLogsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(RECORD_WINDOW);
    let records = state.feed.borrow().latest(limit).to_vec();
    Json(RecentLogsResponse { records })
}

/// The caller's own study history.
///
/// Falls back to the records held in the recent feed when the scoped query
/// fails; `history.source` says which one answered.
#[utoipa::path(
    get,
    path = "/me/history",
    responses(
        (status = 200, description = "History summary", body = HistoryResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<HistoryResponse>> {
    let user = current.user.ok_or(TrackerError::AuthRequired)?;
    let snapshot = state.feed.borrow().recent.clone();
    let history = load_history(state.store.as_ref(), &user.id, &snapshot).await;
    Ok(Json(HistoryResponse { history }))
}

/// Time left until the exam.
#[utoipa::path(
    get,
    path = "/countdown",
    responses((status = 200, description = "Time left", body = CountdownResponse))
)]
pub async fn countdown_handler(State(state): State<Arc<AppState>>) -> Json<CountdownResponse> {
    let exam_date = state.config.exam_date;
    let now = Utc::now();
    Json(CountdownResponse {
        exam_date,
        time_left: time_left(exam_date, now),
        is_over: now >= exam_date,
    })
}

#[utoipa::path(
    get,
    path = "/messages",
    responses((status = 200, description = "Board messages, newest first", body = MessagesResponse))
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<MessagesResponse>> {
    let documents = state.store.query_once(board::messages_query()).await?;
    Ok(Json(MessagesResponse {
        messages: board::decode_messages(&documents),
    }))
}

#[utoipa::path(
    post,
    path = "/messages",
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = MessageResponse),
        (status = 400, description = "Empty or oversized message"),
        (status = 502, description = "The store rejected the write")
    )
)]
pub async fn post_message_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let message = board::post_message(state.store.as_ref(), req.into()).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// A suggested wish for the board. Never fails; falls back to a fixed wish.
#[utoipa::path(
    get,
    path = "/wish",
    responses((status = 200, description = "Suggested wish", body = WishResponse))
)]
pub async fn wish_handler(State(state): State<Arc<AppState>>) -> Json<WishResponse> {
    let wish = board::suggest_wish(state.wish_adapter.as_deref()).await;
    Json(WishResponse { wish })
}

/// Removes a selection of board messages in one batch.
#[utoipa::path(
    post,
    path = "/admin/messages/delete",
    request_body = DeleteMessagesRequest,
    responses(
        (status = 200, description = "Messages removed", body = DeleteMessagesResponse),
        (status = 400, description = "No message selected"),
        (status = 502, description = "The store rejected the delete")
    )
)]
pub async fn delete_messages_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteMessagesRequest>,
) -> AppResult<Json<DeleteMessagesResponse>> {
    let deleted = board::delete_messages(state.store.as_ref(), &req.ids).await?;
    Ok(Json(DeleteMessagesResponse { deleted }))
}

/// Downloads every board message as a JSON backup file.
#[utoipa::path(
    get,
    path = "/admin/messages/export",
    responses((status = 200, description = "JSON array of messages, newest first", body = String, content_type = "application/json"))
)]
pub async fn export_messages_handler(
    State(state): State<Arc<AppState>>,
) -> AppResult<impl IntoResponse> {
    let backup = board::export_messages(state.store.as_ref()).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, BACKUP_DISPOSITION),
        ],
        backup,
    ))
}
