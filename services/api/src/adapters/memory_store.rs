//! services/api/src/adapters/memory_store.rs
//!
//! An in-process implementation of the `DocumentStore` port. Used when no
//! database is configured and by the tests.

use crate::adapters::change_feed::{snapshot_stream, CHANGE_CHANNEL_CAPACITY};
use async_trait::async_trait;
use countdown_core::ports::{
    Document, DocumentStore, PortError, PortResult, Query, SnapshotSubscription, Subscription,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    changes: broadcast::Sender<String>,
    /// Simulates a backend that cannot serve filtered queries (missing index).
    filtered_queries_unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
                filtered_queries_unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Makes `query_once` reject filtered queries, as a backend without the
    /// needed index would.
    pub fn set_filtered_queries_unavailable(&self, unavailable: bool) {
        self.inner
            .filtered_queries_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn write(&self) -> PortResult<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .write()
            .map_err(|_| PortError::Unexpected("document store lock poisoned".to_string()))
    }

    fn notify(&self, collection: &str) {
        // No subscribers is not an error.
        let _ = self.changes.send(collection.to_string());
    }

    fn evaluate(&self, query: &Query) -> PortResult<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| PortError::Unexpected("document store lock poisoned".to_string()))?;
        Ok(collections
            .get(&query.collection)
            .map(|docs| query.apply(docs))
            .unwrap_or_default())
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn append(&self, collection: &str, data: Value) -> PortResult<String> {
        if !data.is_object() {
            return Err(PortError::Unexpected("documents must be JSON objects".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        self.inner
            .write()?
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), data });
        self.inner.notify(collection);
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> PortResult<SnapshotSubscription> {
        let changes = self.inner.changes.subscribe();
        let inner = self.inner.clone();
        let stream = snapshot_stream(changes, query, move |query| {
            let result = inner.evaluate(&query);
            async move { result }
        });
        Ok(Subscription::new(stream))
    }

    async fn query_once(&self, query: Query) -> PortResult<Vec<Document>> {
        if query.filter.is_some() && self.inner.filtered_queries_unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected(
                "filtered query requires an index that does not exist".to_string(),
            ));
        }
        self.inner.evaluate(&query)
    }

    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>> {
        let collections = self
            .inner
            .collections
            .read()
            .map_err(|_| PortError::Unexpected("document store lock poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> PortResult<()> {
        if !data.is_object() {
            return Err(PortError::Unexpected("documents must be JSON objects".to_string()));
        }
        {
            let mut collections = self.inner.write()?;
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|doc| doc.id == id) {
                Some(existing) => existing.data = data,
                None => docs.push(Document {
                    id: id.to_string(),
                    data,
                }),
            }
        }
        self.inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> PortResult<usize> {
        let removed = {
            let mut collections = self.inner.write()?;
            match collections.get_mut(collection) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|doc| !ids.contains(&doc.id));
                    before - docs.len()
                }
                None => 0,
            }
        };
        if removed > 0 {
            self.inner.notify(collection);
        }
        Ok(removed)
    }
}
