//! # Tally Shell Library
//!
//! Host process for the engine: configuration, logging, persistence and a
//! newline-delimited JSON command loop on stdin/stdout.
//!
//! ## Module Organization
//! ```text
//! tally_shell/
//! ├── lib.rs       ◄─── You are here (startup & run loop)
//! ├── config.rs    ◄─── ShellConfig from TALLY_* variables
//! ├── state.rs     ◄─── SharedEngine (Arc<Mutex<Engine>>)
//! ├── shell.rs     ◄─── Request parsing, execute + snapshot, queries
//! ├── sink.rs      ◄─── Notification sink writing to the log
//! ├── advisory.rs  ◄─── Optional daily summary with plain fallback
//! └── error.rs     ◄─── ApiError { code, message } and ShellError
//! ```

pub mod advisory;
pub mod config;
pub mod error;
pub mod shell;
pub mod sink;
pub mod state;

use tally_core::{Engine, EngineState};
use tally_db::{load_json_or_default, Database, DbConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use advisory::NoAdvisor;
use config::ShellConfig;
use error::{ApiError, ShellError};
use shell::{Response, Shell};
use sink::TracingSink;
use state::SharedEngine;

/// Runs the shell until stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                          Shell Startup                                  │
/// │                                                                         │
/// │  1. Initialize Logging ─── stderr, EnvFilter (RUST_LOG overrides)       │
/// │  2. Load ShellConfig ───── TALLY_* variables, defaults otherwise        │
/// │  3. Open Database ──────── SQLite WAL, pending migrations applied       │
/// │  4. Restore Engine ─────── snapshot under the key, or an empty state    │
/// │  5. Serve ──────────────── one JSON request per stdin line              │
/// │  6. Close ──────────────── pool closed on EOF                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), ShellError> {
    init_tracing();

    info!("Starting Tally shell");

    let config = ShellConfig::from_env();
    let db_path = config.database_path()?;
    info!(?db_path, snapshot_key = %config.snapshot_key, "Configuration loaded");

    let db = Database::new(DbConfig::new(db_path)).await?;
    let store = db.snapshots();

    let state: EngineState = load_json_or_default(&store, &config.snapshot_key).await?;
    info!(
        products = state.inventory.len(),
        transactions = state.cash_book.transactions().len(),
        "Engine state restored"
    );

    let engine = SharedEngine::new(Engine::from_state(state, config.engine.clone()));
    let shell = Shell::new(
        engine,
        store,
        Box::new(TracingSink),
        NoAdvisor,
        config.snapshot_key.clone(),
    );

    serve(&shell).await?;

    db.close().await;
    info!("Tally shell stopped");
    Ok(())
}

/// Reads requests from stdin and writes one response line each to stdout.
async fn serve<S, A>(shell: &Shell<S, A>) -> Result<(), ShellError>
where
    S: tally_db::SnapshotStore,
    A: advisory::Advisor,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = shell.handle_line(line).await;
        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "Response could not be encoded");
                let fallback = Response::failure(ApiError::internal("Response could not be encoded"));
                serde_json::to_string(&fallback).unwrap_or_default()
            }
        };

        stdout.write_all(encoded.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr; stdout carries responses only.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: `info,tally=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
