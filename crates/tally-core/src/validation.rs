//! # Validation Module
//!
//! Input validation for commands before the orchestrator touches any store.
//!
//! ## Where It Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command (JSON from the dashboard)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  serde: shape & types                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE: field rules (empty ids, negative costs, line counts)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Engine phase one: cross-store checks (stock, references)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Engine phase two: apply                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("RICE-5KG").unwrap();
//! validate_quantity(12).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT, MAX_LINES_PER_DOCUMENT, MAX_LINE_QUANTITY, MAX_STOCK, MAX_UNIT_CONTENT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a caller-supplied identifier (product, customer, branch, ...).
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 64 characters
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("SOAP-200G").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, customer, supplier, BOM).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (in whatever unit the line names).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost. Zero is allowed (free items, donated stock).
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_price;
/// use tally_core::MAX_AMOUNT;
///
/// assert!(validate_price("cost", Money::zero()).is_ok());
/// assert!(validate_price("cost", Money::from_cents(-1)).is_err());
/// assert!(validate_price("cost", MAX_AMOUNT + Money::from_cents(1)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if price > MAX_AMOUNT {
        return Err(ValidationError::too_large(field, MAX_AMOUNT.cents()));
    }

    Ok(())
}

/// Validates an amount that must actually move money (> 0, at most
/// [`MAX_AMOUNT`]).
pub fn validate_payment_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_AMOUNT.cents(),
        });
    }

    Ok(())
}

/// Validates a computed line or document total.
///
/// `None` means the arithmetic already overflowed.
pub fn validate_total(field: &str, total: Option<Money>) -> ValidationResult<Money> {
    match total {
        Some(total) if !total.is_negative() && total <= MAX_AMOUNT => Ok(total),
        _ => Err(ValidationError::too_large(field, MAX_AMOUNT.cents())),
    }
}

/// Validates a stock figure (global stock, a branch allocation, a
/// minimum-stock threshold).
pub fn validate_stock(field: &str, stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if stock > MAX_STOCK {
        return Err(ValidationError::too_large(field, MAX_STOCK));
    }

    Ok(())
}

/// Validates a minimum-stock threshold.
pub fn validate_min_stock(min_stock: i64) -> ValidationResult<()> {
    validate_stock("minStock", min_stock)
}

/// Validates a product's `unitContent`.
pub fn validate_unit_content(content: i64) -> ValidationResult<()> {
    if !(1..=MAX_UNIT_CONTENT).contains(&content) {
        return Err(ValidationError::OutOfRange {
            field: "unitContent".to_string(),
            min: 1,
            max: MAX_UNIT_CONTENT,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a sale, purchase or order.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_LINES_PER_DOCUMENT`]
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if count > MAX_LINES_PER_DOCUMENT {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINES_PER_DOCUMENT as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
