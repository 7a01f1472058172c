//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a study WebSocket connection.
//! Each connection owns one timer; the ticker runs as a separate task.

use crate::web::{
    middleware::CurrentUser,
    protocol::{ClientMessage, ServerMessage},
    rest::DEFAULT_RECENT_LIMIT,
    state::{AppState, StudyConnection, WsSender},
    ticker_task::ticker_process,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use countdown_core::domain::User;
use countdown_core::error::TrackerError;
use countdown_core::feed::FeedState;
use countdown_core::ports::Subscription;
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, current))
}

/// Serializes and sends one frame. Returns `false` once the client is gone.
pub async fn send_message(ws_sender: &WsSender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    ws_sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

fn leaderboard_frame(feed: &FeedState) -> ServerMessage {
    ServerMessage::Leaderboard {
        entries: feed.leaderboard.clone(),
        recent: feed.latest(DEFAULT_RECENT_LIMIT).to_vec(),
    }
}

async fn next_auth_change(changes: &mut Option<Subscription<Option<User>>>) -> Option<Option<User>> {
    match changes {
        Some(changes) => changes.next().await,
        None => std::future::pending().await,
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, current: CurrentUser) {
    info!(
        "New study WebSocket connection for {}",
        current.user.as_ref().map(|u| u.id.as_str()).unwrap_or("anonymous visitor")
    );

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let connection = Arc::new(Mutex::new(StudyConnection::new(
        app_state.store.clone(),
        current.user,
    )));

    // --- 1. Subscriptions ---
    let mut feed = app_state.feed.clone();
    let initial = leaderboard_frame(&feed.borrow_and_update());
    if !send_message(&ws_sender, &initial).await {
        return;
    }
    let mut feed_open = true;

    let mut auth_changes = match &current.session {
        Some(session) => match app_state.identity.on_auth_change(session).await {
            Ok(changes) => Some(changes),
            Err(e) => {
                warn!("Could not follow auth changes: {}", e);
                None
            }
        },
        None => None,
    };

    // --- 2. Main Message Loop ---
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text_message(text.as_str(), &connection, &ws_sender).await;
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            changed = feed.changed(), if feed_open => match changed {
                Ok(()) => {
                    let frame = leaderboard_frame(&feed.borrow_and_update());
                    if !send_message(&ws_sender, &frame).await {
                        break;
                    }
                }
                Err(_) => {
                    warn!("Study feed closed; leaderboard updates stop.");
                    feed_open = false;
                }
            },
            change = next_auth_change(&mut auth_changes) => match change {
                Some(user) => {
                    info!("Auth state changed on connection: signed in = {}", user.is_some());
                    connection.lock().await.user = user;
                }
                None => auth_changes = None,
            },
        }
    }

    // --- 3. Cleanup ---
    // An unfinished session is discarded; nothing is written mid-flight.
    connection.lock().await.stop_ticker();
    if let Some(changes) = auth_changes {
        changes.unsubscribe();
    }
    info!("Study WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    connection: &Arc<Mutex<StudyConnection>>,
    ws_sender: &WsSender,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            send_message(
                ws_sender,
                &ServerMessage::Error {
                    message: format!("Unrecognized message: {}", e),
                },
            )
            .await;
            return;
        }
    };

    let reply = match client_msg {
        ClientMessage::Configure { config } => {
            let mut conn = connection.lock().await;
            match conn.session.configure(config.clone()) {
                Ok(()) => ServerMessage::Configured { config },
                Err(e) => error_frame(e),
            }
        }
        ClientMessage::Start { config } => {
            let mut conn = connection.lock().await;
            let config = config.or_else(|| conn.session.timer().pending_config().cloned());
            let config = match config {
                Some(config) => config,
                None => {
                    drop(conn);
                    send_message(
                        ws_sender,
                        &ServerMessage::InvalidConfig {
                            message: "Configure the session before starting".to_string(),
                        },
                    )
                    .await;
                    return;
                }
            };

            let conn = &mut *conn;
            let user = conn.user.clone();
            match conn.session.start(user.as_ref(), config) {
                Ok(run) => {
                    let frame = ServerMessage::SessionStarted {
                        subject: run.config.subject,
                        target_minutes: run.config.target_minutes,
                        started_at: run.started_at.timestamp_millis(),
                        planned_end: run.planned_end().timestamp_millis(),
                        motivational_quote: run.motivational_quote.to_string(),
                    };
                    spawn_ticker(conn, connection, ws_sender);
                    frame
                }
                Err(e) => error_frame(e),
            }
        }
        ClientMessage::Pause => {
            let mut conn = connection.lock().await;
            match conn.session.pause() {
                Ok(()) => {
                    conn.stop_ticker();
                    ServerMessage::SessionPaused {
                        elapsed_seconds: elapsed(&conn),
                    }
                }
                Err(e) => error_frame(e),
            }
        }
        ClientMessage::Resume => {
            let mut conn = connection.lock().await;
            match conn.session.resume() {
                Ok(()) => {
                    spawn_ticker(&mut conn, connection, ws_sender);
                    ServerMessage::SessionResumed {
                        elapsed_seconds: elapsed(&conn),
                    }
                }
                Err(e) => error_frame(e),
            }
        }
        ClientMessage::Finish => {
            let mut conn = connection.lock().await;
            finish_session(&mut conn).await
        }
    };

    send_message(ws_sender, &reply).await;
}

/// Finishes the connection's session. The ticker only stops once the timer
/// has actually left the active states; a rejected finish keeps it counting.
async fn finish_session(conn: &mut StudyConnection) -> ServerMessage {
    let user = conn.user.clone();
    let reply = match conn.session.finish(user.as_ref()).await {
        Ok(record) => ServerMessage::SessionSaved { record },
        Err(e) => error_frame(e),
    };
    if !conn.session.timer().is_active() {
        conn.stop_ticker();
    }
    reply
}

fn elapsed(conn: &StudyConnection) -> u64 {
    conn.session
        .timer()
        .run()
        .map(|run| run.elapsed_seconds)
        .unwrap_or_default()
}

fn spawn_ticker(conn: &mut StudyConnection, connection: &Arc<Mutex<StudyConnection>>, ws_sender: &WsSender) {
    let token = conn.rearm_ticker();
    let connection = connection.clone();
    let ws_sender = ws_sender.clone();
    tokio::spawn(async move {
        ticker_process(connection, ws_sender, token).await;
    });
}

/// Maps a tracker error to the frame the client understands.
fn error_frame(e: TrackerError) -> ServerMessage {
    match e {
        TrackerError::AuthRequired => ServerMessage::AuthRequired {
            message: e.to_string(),
        },
        TrackerError::InvalidConfig(_) => ServerMessage::InvalidConfig {
            message: e.to_string(),
        },
        TrackerError::WriteFailure(_) => ServerMessage::SaveFailed {
            message: "Could not save, check your connection".to_string(),
        },
        TrackerError::InvalidTransition { .. }
        | TrackerError::InvalidMessage(_)
        | TrackerError::InvalidProgress(_) => {
            ServerMessage::Error {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDocumentStore;
    use countdown_core::domain::{SessionConfig, Subject};
    use countdown_core::ports::PortError;
    use countdown_core::timer::TimerState;

    fn learner() -> User {
        User {
            id: "guest-1".into(),
            display_name: "Linh".into(),
            avatar_url: None,
            is_guest: true,
        }
    }

    #[test]
    fn tracker_errors_map_to_client_frames() {
        assert!(matches!(
            error_frame(TrackerError::AuthRequired),
            ServerMessage::AuthRequired { .. }
        ));
        assert!(matches!(
            error_frame(TrackerError::InvalidConfig("target".into())),
            ServerMessage::InvalidConfig { .. }
        ));
        assert!(matches!(
            error_frame(TrackerError::WriteFailure(PortError::Unexpected("offline".into()))),
            ServerMessage::SaveFailed { .. }
        ));
        match error_frame(TrackerError::InvalidTransition {
            from: TimerState::Idle,
            action: "pause",
        }) {
            ServerMessage::Error { message } => assert!(message.contains("pause")),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn finish_after_sign_out_keeps_the_ticker_running() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut conn = StudyConnection::new(store.clone(), Some(learner()));
        conn.session
            .start(Some(&learner()), SessionConfig::new(Subject::Math, 30))
            .unwrap();
        let token = conn.rearm_ticker();
        conn.session.tick();

        conn.user = None;
        let reply = finish_session(&mut conn).await;

        assert!(matches!(reply, ServerMessage::AuthRequired { .. }));
        assert!(!token.is_cancelled());
        assert_eq!(conn.session.state(), TimerState::Running);
        assert!(store.is_empty("study_logs"));

        conn.user = Some(learner());
        let reply = finish_session(&mut conn).await;

        assert!(matches!(reply, ServerMessage::SessionSaved { .. }));
        assert!(token.is_cancelled());
        assert_eq!(conn.session.state(), TimerState::Idle);
        assert_eq!(store.len("study_logs"), 1);
    }

    #[tokio::test]
    async fn finish_without_a_session_stops_any_ticker() {
        let mut conn = StudyConnection::new(Arc::new(InMemoryDocumentStore::new()), Some(learner()));
        let token = conn.rearm_ticker();

        let reply = finish_session(&mut conn).await;

        assert!(matches!(reply, ServerMessage::Error { .. }));
        assert!(token.is_cancelled());
    }
}
