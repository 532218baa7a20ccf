//! # Snapshot Store
//!
//! Key → document persistence for the engine state.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Snapshot After Each Operation                      │
//! │                                                                         │
//! │  Engine::execute(cmd) ── Ok ──► save_json(store, "erp_state", state)    │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                          serde_json::to_string                          │
//! │                                     │                                   │
//! │                   ┌─────────────────┴──────────────────┐                │
//! │                   ▼                                    ▼                │
//! │             SqliteStore                          MemoryStore            │
//! │   INSERT ... ON CONFLICT(key)                  HashMap<String,String>   │
//! │   DO UPDATE (upsert)                           (tests, dry runs)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A snapshot is a single JSON document, so every save replaces the previous
//! one wholesale. Readers never see half of an operation.

use std::collections::HashMap;
use std::future::Future;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Trait
// =============================================================================

/// Persistence sink for serialized snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Returns the value stored under `key`, if any.
    fn load(&self, key: &str) -> impl Future<Output = DbResult<Option<String>>> + Send;
}

// =============================================================================
// SQLite
// =============================================================================

/// Snapshot store on the `snapshots` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a store over an already-migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    /// Number of stored snapshots.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl SnapshotStore for SqliteStore {
    async fn save(&self, key: &str, value: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = value.len(), "Snapshot saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM snapshots WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        debug!(key = %key, found = value.is_some(), "Snapshot loaded");
        Ok(value)
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    async fn save(&self, key: &str, value: &str) -> DbResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn load(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

// =============================================================================
// JSON Helpers
// =============================================================================

/// Serializes `value` and stores it under `key`.
pub async fn save_json<S, T>(store: &S, key: &str, value: &T) -> DbResult<()>
where
    S: SnapshotStore,
    T: Serialize + Sync,
{
    let json = serde_json::to_string(value)?;
    store.save(key, &json).await
}

/// Loads and deserializes the value under `key`.
///
/// A missing key yields `T::default()`. A present but undecodable document
/// is an error: silently starting over would overwrite it on the next save.
pub async fn load_json_or_default<S, T>(store: &S, key: &str) -> DbResult<T>
where
    S: SnapshotStore,
    T: DeserializeOwned + Default,
{
    match store.load(key).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(T::default()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
