//! services/api/src/web/ticker_task.rs
//!
//! The once-per-second worker that advances a running timer and streams
//! `tick` frames to the client.

use crate::web::{
    protocol::ServerMessage,
    state::{StudyConnection, WsSender},
    ws_handler::send_message,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Advances the timer every [`TICK_INTERVAL`] until cancelled.
///
/// Exits on its own when the timer leaves `Running` or the client stops
/// accepting frames. Pause, finish and disconnect cancel the token.
pub async fn ticker_process(
    connection: Arc<Mutex<StudyConnection>>,
    ws_sender: WsSender,
    cancellation_token: CancellationToken,
) {
    info!("Ticker started.");
    let mut ticks = interval(TICK_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    ticks.tick().await;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Ticker cancelled.");
                return;
            }
            _ = ticks.tick() => {}
        }

        // Sent under the connection lock: no tick may follow a pause or finish reply.
        let mut conn = connection.lock().await;
        if cancellation_token.is_cancelled() || !conn.session.tick() {
            debug!("Timer no longer running, ticker exiting.");
            return;
        }
        let timer = conn.session.timer();
        let frame = match timer.run() {
            Some(run) => ServerMessage::Tick {
                elapsed_seconds: run.elapsed_seconds,
                remaining_seconds: run.remaining_seconds(),
                is_overdue: timer.is_overdue(),
            },
            None => return,
        };

        if !send_message(&ws_sender, &frame).await {
            info!("Client stopped accepting frames, ticker exiting.");
            return;
        }
        drop(conn);
    }
}
