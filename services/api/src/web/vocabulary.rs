//! services/api/src/web/vocabulary.rs
//!
//! Handlers for the English vocabulary hub: topics, words and the caller's
//! learning progress.

use crate::error::{AppError, AppResult};
use crate::web::{middleware::CurrentUser, state::AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use countdown_core::error::TrackerError;
use countdown_core::vocabulary::{
    default_topics, load_progress, load_vocabulary, save_progress, LearningStats, ProgressUpdate,
    Topic, TopicProgress, VocabItem,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct TopicsResponse {
    #[schema(value_type = Vec<Object>)]
    pub topics: Vec<Topic>,
}

#[derive(Serialize, ToSchema)]
pub struct WordsResponse {
    #[schema(value_type = Vec<Object>)]
    pub words: Vec<VocabItem>,
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    #[schema(value_type = Vec<Object>)]
    pub progress: Vec<TopicProgress>,
    #[schema(value_type = Object)]
    pub stats: LearningStats,
}

#[derive(Serialize, ToSchema)]
pub struct TopicProgressResponse {
    #[schema(value_type = Object)]
    pub progress: TopicProgress,
}

#[utoipa::path(
    get,
    path = "/vocabulary/topics",
    responses((status = 200, description = "Built-in topics", body = TopicsResponse))
)]
pub async fn topics_handler() -> Json<TopicsResponse> {
    Json(TopicsResponse {
        topics: default_topics(),
    })
}

/// Words of one topic, alphabetical. Empty topics answer with sample cards.
#[utoipa::path(
    get,
    path = "/vocabulary/topics/{topic_id}/words",
    params(("topic_id" = String, Path, description = "Topic id, e.g. `topic_1`")),
    responses((status = 200, description = "Topic words", body = WordsResponse))
)]
pub async fn words_handler(
    State(state): State<Arc<AppState>>,
    Path(topic_id): Path<String>,
) -> AppResult<Json<WordsResponse>> {
    let words = load_vocabulary(state.store.as_ref(), &topic_id).await?;
    Ok(Json(WordsResponse { words }))
}

#[utoipa::path(
    get,
    path = "/me/progress",
    responses(
        (status = 200, description = "Per-topic progress and dashboard totals", body = ProgressResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ProgressResponse>> {
    let user = current.user.ok_or(TrackerError::AuthRequired)?;
    let progress = load_progress(state.store.as_ref(), &user.id).await?;
    let stats = LearningStats::from_progress(&progress, Utc::now());
    Ok(Json(ProgressResponse { progress, stats }))
}

/// Records one flashcard answer, quiz score or chunk of study time.
#[utoipa::path(
    post,
    path = "/me/progress/{topic_id}",
    params(("topic_id" = String, Path, description = "Topic id, e.g. `topic_1`")),
    request_body(
        content_type = "application/json",
        description = "`{\"type\":\"flashcard\",\"wordId\",\"status\"}`, `{\"type\":\"quiz\",\"score\"}` or `{\"type\":\"time\",\"seconds\"}`."
    ),
    responses(
        (status = 200, description = "Updated topic progress", body = TopicProgressResponse),
        (status = 400, description = "Malformed update"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The store rejected the write")
    )
)]
pub async fn save_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(topic_id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<TopicProgressResponse>> {
    let user = current.user.ok_or(TrackerError::AuthRequired)?;
    let update: ProgressUpdate = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("unrecognized progress update: {}", e)))?;
    let progress = save_progress(state.store.as_ref(), &user.id, &topic_id, &update, Utc::now()).await?;
    Ok(Json(TopicProgressResponse { progress }))
}
