//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use axum::extract::ws::{Message, WebSocket};
use countdown_core::domain::User;
use countdown_core::feed::{subscribe_study_feed, FeedState};
use countdown_core::ports::{
    DocumentStore, IdentityProvider, PortResult, SubscriptionHandle, WishGenerationService,
};
use countdown_core::session::StudySession;
use futures::stream::{SplitSink, StreamExt};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The write half of a WebSocket, shared between the connection loop and its ticker.
pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when no API key is configured; wishes then come from the fallback.
    pub wish_adapter: Option<Arc<dyn WishGenerationService>>,
    pub config: Arc<Config>,
    /// Latest leaderboard and recent records, republished on every snapshot.
    pub feed: watch::Receiver<FeedState>,
    feed_handle: SubscriptionHandle,
}

impl AppState {
    /// Builds the state and starts the process-wide study feed.
    pub async fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        wish_adapter: Option<Arc<dyn WishGenerationService>>,
        config: Arc<Config>,
    ) -> PortResult<Self> {
        let (feed, feed_handle) = spawn_study_feed(store.as_ref()).await?;
        Ok(Self {
            store,
            identity,
            wish_adapter,
            config,
            feed,
            feed_handle,
        })
    }

    /// Stops the study feed task.
    pub fn shutdown(&self) {
        self.feed_handle.unsubscribe();
    }
}

/// Subscribes to the recent study logs and publishes each derived state
/// through a `watch` channel. Readers always see the newest state only.
async fn spawn_study_feed(
    store: &dyn DocumentStore,
) -> PortResult<(watch::Receiver<FeedState>, SubscriptionHandle)> {
    let mut states = subscribe_study_feed(store).await?;
    let handle = states.handle();
    let (tx, rx) = watch::channel(FeedState::default());

    tokio::spawn(async move {
        while let Some(state) = states.next().await {
            tx.send_replace(state);
        }
        info!("Study feed closed.");
    });

    Ok((rx, handle))
}

//=========================================================================================
// StudyConnection (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single WebSocket connection: one user, one timer.
pub struct StudyConnection {
    pub user: Option<User>,
    pub session: StudySession,
    /// Cancels the running ticker. Replaced each time the timer (re)starts.
    pub ticker_token: CancellationToken,
}

impl StudyConnection {
    pub fn new(store: Arc<dyn DocumentStore>, user: Option<User>) -> Self {
        Self {
            user,
            session: StudySession::new(store),
            ticker_token: CancellationToken::new(),
        }
    }

    /// Cancels the current ticker and arms a fresh token for the next one.
    pub fn rearm_ticker(&mut self) -> CancellationToken {
        self.ticker_token.cancel();
        self.ticker_token = CancellationToken::new();
        self.ticker_token.clone()
    }

    pub fn stop_ticker(&self) {
        self.ticker_token.cancel();
    }
}
