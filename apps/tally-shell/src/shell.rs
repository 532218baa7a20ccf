//! # Command Session
//!
//! One request per line in, one response per line out.
//!
//! ## Request Lines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {"type":"record_sale","lines":[...],"paymentMethod":"cash"}  → Command │
//! │  {"type":"balance"}                                           → Query   │
//! │  {"type":"unread_notifications"}                              → Query   │
//! │  {"type":"daily_summary","date":"2026-10-18"}                 → Query   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Command Flow
//! ```text
//! lock engine ──► Engine::execute ──► Err ──► warn!, ApiError (nothing saved)
//!                       │
//!                       └─► Ok(changed) ──► save snapshot ──► publish alerts
//!                                                 │
//!                                          unlock ◄┘
//! ```
//!
//! A failed save does not undo the command. The response is still `ok`
//! with the outcome, plus a `PERSISTENCE_LAGGING` warning.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally_core::{Command, Effect, NotificationSink, Outcome};
use tally_db::{save_json, SnapshotStore};
use tracing::{debug, info, warn};

use crate::advisory::{daily_summary, Advisor, DailyFigures};
use crate::error::ApiError;
use crate::state::SharedEngine;

/// Read-only requests answered by the shell itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Balance,
    UnreadNotifications,
    DailySummary {
        #[serde(default)]
        date: Option<NaiveDate>,
    },
}

/// One line of output.
///
/// `ok` means the request took effect. `warning` is only set on an `ok`
/// response whose state change is not yet on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ApiError>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Response {
            ok: true,
            result: Some(result),
            error: None,
            warning: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Response {
            ok: false,
            result: None,
            error: Some(error),
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<ApiError>) -> Self {
        self.warning = warning;
        self
    }
}

/// A command the engine accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub outcome: Outcome<Effect>,
    /// Set when the snapshot write failed after the engine applied the
    /// command.
    pub unsaved: Option<ApiError>,
}

/// Wires the engine to its store, sink and advisor.
pub struct Shell<S, A> {
    engine: SharedEngine,
    store: S,
    sink: Box<dyn NotificationSink>,
    advisor: A,
    snapshot_key: String,
}

impl<S: SnapshotStore, A: Advisor> Shell<S, A> {
    pub fn new(
        engine: SharedEngine,
        store: S,
        sink: Box<dyn NotificationSink>,
        advisor: A,
        snapshot_key: impl Into<String>,
    ) -> Self {
        Shell {
            engine,
            store,
            sink,
            advisor,
            snapshot_key: snapshot_key.into(),
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Parses and answers one request line.
    pub async fn handle_line(&self, line: &str) -> Response {
        match self.dispatch(line).await {
            Ok((value, warning)) => Response::success(value).with_warning(warning),
            Err(err) => Response::failure(err),
        }
    }

    async fn dispatch(&self, line: &str) -> Result<(Value, Option<ApiError>), ApiError> {
        match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                let executed = self.execute(command).await?;
                Ok((serde_json::to_value(&executed.outcome)?, executed.unsaved))
            }
            Err(command_err) => match serde_json::from_str::<Query>(line) {
                Ok(query) => Ok((self.answer(query).await?, None)),
                Err(_) => Err(command_err.into()),
            },
        }
    }

    /// Runs a command and persists the resulting state.
    ///
    /// Unchanged outcomes (documented no-ops) skip the snapshot write. A
    /// failed write is reported in [`Executed::unsaved`]; the command
    /// stays applied and its alerts are still published.
    pub async fn execute(&self, command: Command) -> Result<Executed, ApiError> {
        let name = command.name();
        debug!(command = name, "Executing command");

        let mut engine = self.engine.lock().await;
        let outcome = match engine.execute(command) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(command = name, error = %err, "Command rejected");
                return Err(err.into());
            }
        };

        let mut unsaved = None;
        if outcome.changed {
            if let Err(err) = save_json(&self.store, &self.snapshot_key, engine.state()).await {
                unsaved = Some(ApiError::persistence_lagging(&err));
            }
        }
        drop(engine);

        if !outcome.notifications.is_empty() {
            self.sink.publish(&outcome.notifications);
        }

        info!(
            command = name,
            changed = outcome.changed,
            saved = unsaved.is_none(),
            alerts = outcome.notifications.len(),
            "Command applied"
        );
        Ok(Executed { outcome, unsaved })
    }

    async fn answer(&self, query: Query) -> Result<Value, ApiError> {
        match query {
            Query::Balance => {
                let balance = self.engine.with_engine(|e| e.cash_book().balance()).await;
                Ok(serde_json::to_value(balance)?)
            }
            Query::UnreadNotifications => {
                let unread = self
                    .engine
                    .with_engine(|e| e.notifications().unread().cloned().collect::<Vec<_>>())
                    .await;
                Ok(serde_json::to_value(unread)?)
            }
            Query::DailySummary { date } => {
                let date = date.unwrap_or_else(|| Utc::now().date_naive());
                let figures = self
                    .engine
                    .with_engine(|e| DailyFigures::collect(e.state(), date))
                    .await;
                let summary = daily_summary(&self.advisor, &figures).await;
                Ok(json!({ "figures": figures, "summary": summary }))
            }
        }
    }
}
