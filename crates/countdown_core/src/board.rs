//! crates/countdown_core/src/board.rs
//!
//! The public message board (`wishes` collection) and wish suggestions.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{Message, NewMessage, DEFAULT_LEARNER_NAME};
use crate::error::{TrackerError, TrackerResult};
use crate::identity::{avatar_url, AvatarStyle};
use crate::ports::{Document, DocumentStore, PortError, PortResult, Query, WishGenerationService};

pub const WISHES: &str = "wishes";

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";
const ANONYMOUS_AVATAR_SEED: &str = "anon";

/// Returned whenever the generator is missing, fails or answers blank.
pub const FALLBACK_WISH: &str = "Good luck to every candidate of 2026, you've got this! 🐟🐉";

pub const MAX_CONTENT_CHARS: usize = 1000;

/// What a visitor submits from the board form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl MessageDraft {
    pub fn into_new_message(self, now: DateTime<Utc>) -> TrackerResult<NewMessage> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(TrackerError::InvalidMessage("message must not be empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(TrackerError::InvalidMessage(format!(
                "message must be at most {} characters",
                MAX_CONTENT_CHARS
            )));
        }

        let (author, seed) = if self.is_anonymous {
            (ANONYMOUS_AUTHOR.to_string(), ANONYMOUS_AVATAR_SEED.to_string())
        } else {
            let name = self.name.trim();
            let author = if name.is_empty() { DEFAULT_LEARNER_NAME } else { name };
            (author.to_string(), author.to_string())
        };

        Ok(NewMessage {
            author,
            content: content.to_string(),
            image_url: self.image_url.filter(|url| !url.trim().is_empty()),
            timestamp: now.timestamp_millis(),
            is_anonymous: self.is_anonymous,
            avatar_url: avatar_url(AvatarStyle::Notionists, &seed),
        })
    }
}

pub fn messages_query() -> Query {
    Query::collection(WISHES).order_by_desc("timestamp")
}

pub fn decode_messages(documents: &[Document]) -> Vec<Message> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode::<Message>() {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Skipping malformed message {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

/// Validates and appends a board message.
pub async fn post_message(store: &dyn DocumentStore, draft: MessageDraft) -> TrackerResult<Message> {
    let message = draft.into_new_message(Utc::now())?;
    let data = serde_json::to_value(&message)
        .map_err(|e| TrackerError::InvalidMessage(e.to_string()))?;
    let id = store
        .append(WISHES, data)
        .await
        .map_err(TrackerError::WriteFailure)?;
    info!("Posted message {} by {}", id, message.author);

    Ok(Message {
        id,
        author: message.author,
        content: message.content,
        image_url: message.image_url,
        timestamp: message.timestamp,
        is_anonymous: message.is_anonymous,
        avatar_url: Some(message.avatar_url),
    })
}

/// Removes a batch of board messages. Returns how many were present.
pub async fn delete_messages(store: &dyn DocumentStore, ids: &[String]) -> TrackerResult<usize> {
    if ids.is_empty() {
        return Err(TrackerError::InvalidMessage("select at least one message".to_string()));
    }
    let removed = store
        .delete(WISHES, ids)
        .await
        .map_err(TrackerError::WriteFailure)?;
    info!("Deleted {} of {} requested messages", removed, ids.len());
    Ok(removed)
}

/// Every board message, newest first, as an indented JSON backup.
pub async fn export_messages(store: &dyn DocumentStore) -> PortResult<String> {
    let documents = store.query_once(messages_query()).await?;
    let messages = decode_messages(&documents);
    serde_json::to_string_pretty(&messages).map_err(|e| PortError::Unexpected(e.to_string()))
}

/// Asks the generator for a wish, never failing.
pub async fn suggest_wish(generator: Option<&dyn WishGenerationService>) -> String {
    let Some(generator) = generator else {
        return FALLBACK_WISH.to_string();
    };
    match generator.generate_wish().await {
        Ok(wish) if !wish.trim().is_empty() => wish.trim().to_string(),
        Ok(_) => FALLBACK_WISH.to_string(),
        Err(e) => {
            warn!("Wish generation failed, using fallback: {}", e);
            FALLBACK_WISH.to_string()
        }
    }
}
