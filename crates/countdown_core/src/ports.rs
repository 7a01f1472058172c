//! crates/countdown_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the external collaborators.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store, identity provider and
//! text generation service.

use std::cmp::Ordering;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{AbortHandle, Abortable};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::User;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Documents and Queries
//=========================================================================================

/// A stored document: the store-assigned id plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserializes the body into `T`, exposing the document id as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> PortResult<T> {
        let mut data = self.data.clone();
        match data.as_object_mut() {
            Some(object) => {
                object.insert("id".to_string(), Value::String(self.id.clone()));
            }
            None => {
                return Err(PortError::Unexpected(format!(
                    "document {} is not a JSON object",
                    self.id
                )))
            }
        }
        serde_json::from_value(data)
            .map_err(|e| PortError::Unexpected(format!("document {}: {}", self.id, e)))
    }
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// A query against one collection, built fluently:
/// `Query::collection("study_logs").order_by_desc("timestamp").limit(200)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filter: Option<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document body passes the filter.
    pub fn matches(&self, data: &Value) -> bool {
        match &self.filter {
            Some(filter) => data.get(&filter.field) == Some(&filter.value),
            None => true,
        }
    }

    /// Evaluates the query in memory over an unordered set of documents.
    /// Adapters without a native query engine use this.
    pub fn apply<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut result: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(&doc.data))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            // Stable sort: documents with equal keys keep insertion order.
            result.sort_by(|a, b| {
                let ordering = compare_fields(a.data.get(&order.field), b.data.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = self.limit {
            result.truncate(limit);
        }
        result
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

//=========================================================================================
// Subscriptions
//=========================================================================================

/// The boxed stream type adapters hand back for realtime feeds.
pub type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Cancels a subscription. Cloneable so a view can keep one while the
/// stream itself is moved into a task.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle(AbortHandle);

impl SubscriptionHandle {
    /// Stops the feed. The stream yields `None` on its next poll.
    pub fn unsubscribe(&self) {
        self.0.abort();
    }
}

/// A long-lived feed of full snapshots paired with its cancellation handle.
pub struct Subscription<T> {
    stream: Abortable<BoxedStream<T>>,
    handle: SubscriptionHandle,
}

impl<T> Subscription<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let boxed: BoxedStream<T> = Box::pin(stream);
        let (stream, handle) = futures::stream::abortable(boxed);
        Self {
            stream,
            handle: SubscriptionHandle(handle),
        }
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().stream.poll_next_unpin(cx)
    }
}

/// Snapshot feed returned by [`DocumentStore::subscribe`].
pub type SnapshotSubscription = Subscription<PortResult<Vec<Document>>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Appends a new document and returns its store-assigned id.
    async fn append(&self, collection: &str, data: Value) -> PortResult<String>;

    /// Subscribes to the full result set of `query`. The first item is the
    /// current result set; each later item replaces it entirely.
    async fn subscribe(&self, query: Query) -> PortResult<SnapshotSubscription>;

    /// Runs `query` once.
    async fn query_once(&self, query: Query) -> PortResult<Vec<Document>>;

    /// Reads one document by id.
    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>>;

    /// Creates or replaces the document stored under a caller-chosen id.
    async fn put(&self, collection: &str, id: &str, data: Value) -> PortResult<()>;

    /// Removes the given ids in one batch and returns how many existed.
    async fn delete(&self, collection: &str, ids: &[String]) -> PortResult<usize>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user bound to a session, if any.
    async fn current_user(&self, session: &str) -> PortResult<Option<User>>;

    /// Feed of identity changes for a session, starting with the current value.
    async fn on_auth_change(&self, session: &str) -> PortResult<Subscription<Option<User>>>;

    /// Synthesizes a guest identity and binds it to a fresh session key.
    async fn sign_in_guest(&self, display_name: &str) -> PortResult<(String, User)>;

    async fn sign_out(&self, session: &str) -> PortResult<()>;
}

#[async_trait]
pub trait WishGenerationService: Send + Sync {
    /// Generates a short encouraging wish for exam candidates.
    async fn generate_wish(&self) -> PortResult<String>;
}
