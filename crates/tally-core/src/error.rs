//! # Error Types
//!
//! Domain error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                          │
//! │  ├── CoreError        - Rejections of an orchestrated operation         │
//! │  └── ValidationError  - Malformed command payloads                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                       │
//! │  └── DbError          - Snapshot persistence failures                   │
//! │                                                                         │
//! │  Shell errors (in app)                                                  │
//! │  └── ApiError         - What the dashboard sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Dashboard               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `CoreError` is always returned BEFORE any store is mutated. Operations
//! validate every precondition first and only then apply effects, so a
//! rejection never leaves a half-applied business event behind.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Reasons an orchestrated operation is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Not enough stock to cover the requested minor-unit quantity.
    ///
    /// ## When This Occurs
    /// - A sale, production start or online-order processing needs more
    ///   than the product's global stock
    /// - A transfer needs more than the source branch's allocation
    ///
    /// For multi-line commands `requested` is the aggregated quantity of all
    /// lines referencing the product.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// A status change that the entity's state machine does not allow.
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// A command referenced an id that does not exist.
    #[error("Unknown {kind}: {id}")]
    MissingReference { kind: String, id: String },

    /// A transfer would push a branch allocation above global stock.
    #[error(
        "Branch {branch_id} allocation for {product_id} would be {allocated}, above stock {stock}"
    )]
    AllocationExceedsStock {
        product_id: String,
        branch_id: String,
        allocated: i64,
        stock: i64,
    },

    /// Catalog entry with this id already exists.
    #[error("{kind} '{id}' already exists")]
    Duplicate { kind: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a MissingReference error.
    pub fn missing(kind: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::MissingReference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidTransition error.
    pub fn transition(
        entity: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        CoreError::InvalidTransition {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised while checking a command payload, before any business rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. invalid SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// A computed value (line total, converted quantity, stock level) that
    /// would exceed `max`.
    pub fn too_large(field: impl Into<String>, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min: 0,
            max,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
