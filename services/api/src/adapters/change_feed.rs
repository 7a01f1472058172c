//! services/api/src/adapters/change_feed.rs
//!
//! Turns collection change notifications into a stream of full snapshots,
//! shared by the document store adapters.

use async_stream::stream;
use countdown_core::ports::{Document, PortResult, Query};
use futures::Stream;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Capacity of the per-store change notification channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Yields the current result of `query`, then re-runs it after every change
/// to its collection. A lagging receiver re-runs once and carries on.
pub fn snapshot_stream<F, Fut>(
    mut changes: broadcast::Receiver<String>,
    query: Query,
    fetch: F,
) -> impl Stream<Item = PortResult<Vec<Document>>> + Send + 'static
where
    F: Fn(Query) -> Fut + Send + 'static,
    Fut: Future<Output = PortResult<Vec<Document>>> + Send + 'static,
{
    stream! {
        yield fetch(query.clone()).await;
        loop {
            match changes.recv().await {
                Ok(collection) if collection != query.collection => continue,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Snapshot feed for {} lagged by {} changes", query.collection, skipped);
                }
                Err(RecvError::Closed) => break,
            }
            yield fetch(query.clone()).await;
        }
    }
}
