//! # tally-db: Snapshot Persistence for Tally
//!
//! The engine is an in-memory value; this crate makes it survive restarts.
//! After every successful operation the shell serializes the whole
//! `EngineState` and upserts it under one key.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  tally-shell (command applied, lock held)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     tally-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │ SnapshotStore │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │◄───│  (store.rs)   │    │  (embedded)  │    │    │
//! │  │   │  SqlitePool   │    │  SqliteStore  │    │ 001_snap.sql │    │    │
//! │  │   │  WAL, FKs     │    │  MemoryStore  │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir, or TALLY_DB_PATH)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`store`] - The [`SnapshotStore`] trait and its implementations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{load_json_or_default, save_json, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let store = db.snapshots();
//!
//! let state: EngineState = load_json_or_default(&store, "erp_state").await?;
//! save_json(&store, "erp_state", &state).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{load_json_or_default, save_json, MemoryStore, SnapshotStore, SqliteStore};
