//! services/api/src/adapters/pg_store.rs
//!
//! This module contains the PostgreSQL adapter, a concrete implementation of the
//! `DocumentStore` port from the `core` crate. Every collection lives in one
//! `documents` table with a `jsonb` body. Change notifications are in-process,
//! so realtime snapshots only reflect writes made through this instance.

use crate::adapters::change_feed::{snapshot_stream, CHANGE_CHANNEL_CAPACITY};
use async_trait::async_trait;
use countdown_core::ports::{
    Document, DocumentStore, PortError, PortResult, Query, SnapshotSubscription, Subscription,
};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tokio::sync::broadcast;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<String>,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    body: Json<Value>,
}
impl DocumentRow {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            data: self.body.0,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Translates a `Query` into SQL over the `documents` table.
fn build_select(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
    builder.push_bind(query.collection.clone());

    if let Some(filter) = &query.filter {
        builder
            .push(" AND body -> ")
            .push_bind(filter.field.clone())
            .push(" = ")
            .push_bind(Json(filter.value.clone()));
    }

    match &query.order_by {
        Some(order) => {
            builder
                .push(" ORDER BY body -> ")
                .push_bind(order.field.clone())
                .push(if order.descending { " DESC" } else { " ASC" })
                .push(", created_at ASC");
        }
        None => {
            builder.push(" ORDER BY created_at ASC");
        }
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit as i64);
    }
    builder
}

async fn fetch(pool: &PgPool, query: &Query) -> PortResult<Vec<Document>> {
    let rows = build_select(query)
        .build_query_as::<DocumentRow>()
        .fetch_all(pool)
        .await
        .map_err(unexpected)?;
    Ok(rows.into_iter().map(DocumentRow::to_domain).collect())
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn append(&self, collection: &str, data: Value) -> PortResult<String> {
        if !data.is_object() {
            return Err(PortError::Unexpected("documents must be JSON objects".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(collection)
            .bind(Json(data))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        // No subscribers is not an error.
        let _ = self.changes.send(collection.to_string());
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> PortResult<SnapshotSubscription> {
        let changes = self.changes.subscribe();
        let pool = self.pool.clone();
        let stream = snapshot_stream(changes, query, move |query| {
            let pool = pool.clone();
            async move { fetch(&pool, &query).await }
        });
        Ok(Subscription::new(stream))
    }

    async fn query_once(&self, query: Query) -> PortResult<Vec<Document>> {
        fetch(&self.pool, &query).await
    }

    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(DocumentRow::to_domain))
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> PortResult<()> {
        if !data.is_object() {
            return Err(PortError::Unexpected("documents must be JSON objects".to_string()));
        }
        sqlx::query(
            "INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body",
        )
        .bind(id)
        .bind(collection)
        .bind(Json(data))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let _ = self.changes.send(collection.to_string());
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> PortResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = ANY($2)")
            .bind(collection)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        let removed = result.rows_affected() as usize;
        if removed > 0 {
            let _ = self.changes.send(collection.to_string());
        }
        Ok(removed)
    }
}
