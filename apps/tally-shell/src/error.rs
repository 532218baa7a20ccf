//! # API Error Type
//!
//! Unified error type for shell responses.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in tally-shell                            │
//! │                                                                         │
//! │  stdin line                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Malformed JSON? ──── serde_json::Error ──────────┐                     │
//! │      │                                            │                     │
//! │      ▼                                            ▼                     │
//! │  Engine rejects? ──── CoreError ───────────────► ApiError ──► stdout    │
//! │      │                                            ▲                     │
//! │      ▼                                            │                     │
//! │  Snapshot fails? ──── DbError ────────────────────┘                     │
//! │                                                                         │
//! │  { "ok": false, "error": { "code": "INSUFFICIENT_STOCK", ... } }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;
use thiserror::Error;

/// API error written back to the caller.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Unknown product: SKU-123"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced record does not exist
    NotFound,

    /// Input validation failed, including malformed requests
    ValidationError,

    /// Not enough stock for a deduction or transfer
    InsufficientStock,

    /// Status change not allowed from the current status
    InvalidTransition,

    /// Snapshot could not be persisted or loaded
    DatabaseError,

    /// The command was applied in memory but its snapshot was not written.
    /// The next successful save persists it; do not resend the command.
    PersistenceLagging,

    /// Request is well-formed but breaks a business rule
    BusinessLogic,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Reported alongside the result of an applied command whose snapshot
    /// write failed.
    pub fn persistence_lagging(err: &DbError) -> Self {
        tracing::error!(error = %err, "Applied command not persisted");
        ApiError::new(
            ErrorCode::PersistenceLagging,
            "Applied, but the snapshot could not be saved yet",
        )
    }
}

/// Converts database errors to API errors.
///
/// Details are logged; the caller gets a generic message.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Persistence failed");
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::Serialization(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Snapshot could not be encoded")
            }
            DbError::QueryFailed(_) | DbError::Internal(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts engine errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            CoreError::MissingReference { .. } => ErrorCode::NotFound,
            CoreError::AllocationExceedsStock { .. } => ErrorCode::BusinessLogic,
            CoreError::Duplicate { .. } | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::validation(format!("Malformed request: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Errors that stop the shell from starting.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
