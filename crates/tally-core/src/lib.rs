//! # tally-core: Transaction & Consistency Engine
//!
//! Every business event of the dashboard (a sale, a purchase, a stock
//! transfer, a production run, an installment payment, ...) touches several
//! aggregates at once. This crate owns those aggregates and applies each
//! event atomically: either every effect lands or none does.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │              Dashboard (React) / tally-shell (NDJSON)           │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │ Command                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ tally-core (THIS CRATE) ★                       │    │
//! │  │                                                                 │    │
//! │  │   engine ──► inventory ──► safe ──► relations ──► installments  │    │
//! │  │      │                                                          │    │
//! │  │      └────► production, orders ─────────► notifications         │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │ EngineState snapshot                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                 tally-db (SnapshotStore on SQLite)              │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The orchestrator and its [`Outcome`]
//! - [`command`] - Request payloads, [`Command`] and [`Effect`]
//! - [`inventory`] - Global and per-branch stock
//! - [`safe`] - Cash/card balances and the transaction ledger
//! - [`relations`] - Customer receivables, supplier payables
//! - [`installments`] - Installment plans for credit sales
//! - [`production`] - BOMs and production orders
//! - [`orders`] - Wholesale and online orders
//! - [`notifications`] - Derived alerts and the sink trait
//! - [`units`] - Minor/major unit conversion
//! - [`money`] - Integer money
//! - [`validation`] - Field rules for command payloads
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::command::{LineInput, SaleRequest};
//! use tally_core::{Engine, EngineConfig, Money, PaymentMethod, Product};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine
//!     .add_product(Product::new("soap", "SOAP-1", "Soap", Money::from_major(2)).with_stock(10))
//!     .unwrap();
//!
//! let outcome = engine
//!     .record_sale(SaleRequest::new(vec![LineInput::new("soap", 3)], PaymentMethod::Cash))
//!     .unwrap();
//!
//! assert_eq!(outcome.value.total, Money::from_major(6));
//! assert_eq!(engine.inventory().get("soap").unwrap().stock, 7);
//! assert_eq!(engine.cash_book().balance().cash, Money::from_major(6));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod installments;
pub mod inventory;
pub mod money;
pub mod notifications;
pub mod orders;
pub mod production;
pub mod relations;
pub mod safe;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use command::{Command, Effect};
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, Outcome};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use notifications::{Notification, NotificationLevel, NotificationSink, NoOpSink};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single line.
///
/// Stock is counted in minor units, so this is deliberately generous
/// (a pallet of screws is easily tens of thousands).
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Most lines a sale, purchase or order may carry.
pub const MAX_LINES_PER_DOCUMENT: usize = 200;

/// Largest `unitContent` a product may declare (minor units per major unit).
pub const MAX_UNIT_CONTENT: i64 = 100_000;

/// Ceiling for a product's global stock, in minor units.
pub const MAX_STOCK: i64 = 1_000_000_000_000;

/// Ceiling for any single amount: a price, a payment, or a document total.
/// Ten billion in major units.
pub const MAX_AMOUNT: Money = Money::from_major(10_000_000_000);
