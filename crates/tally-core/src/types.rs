//! # Domain Types
//!
//! Catalog entities and the records produced by orchestrated operations.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │    Customer     │   │    Supplier     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  stock          │   │  balance (+ =   │   │  balance (- =   │        │
//! │  │  branch_stocks  │   │   owes us)      │   │   we owe)       │        │
//! │  │  unit model     │   │  points         │   │                 │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │      Sale       │   │    Purchase     │   │   CreditNote    │        │
//! │  │  lines, total   │   │  lines, total   │   │  refund amount  │        │
//! │  │  payment_method │   │  paid_amount    │   │  invoice link   │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog ids are chosen by catalog management; records created by the
//! engine get UUID v4 ids.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a business event is settled.
///
/// Only `Cash` and `Card` move a safe balance. `Credit` and `Transfer` still
/// produce a ledger entry for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Recognized in relational balances, not yet collected.
    Credit,
    /// Bank transfer; audited but not part of the safe.
    Transfer,
}

impl PaymentMethod {
    #[inline]
    pub fn is_credit(self) -> bool {
        self == PaymentMethod::Credit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked item.
///
/// ## Unit Model
/// Stock is counted in minor units (e.g. pieces). A product may also be sold
/// or bought by a major unit (e.g. a carton) holding `unit_content` minor
/// units.
///
/// ## Branch Allocation
/// `branch_stocks` is a sub-allocation view of `stock`. Entries never go
/// negative and never exceed `stock`; they do not have to sum to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,

    /// Sell price per minor unit.
    pub price: Money,

    /// Purchase cost per minor unit, refreshed by every purchase.
    #[serde(default)]
    pub cost: Money,

    /// Price per minor unit for wholesale orders.
    #[serde(default)]
    pub wholesale_price: Money,

    #[serde(default = "default_minor_unit")]
    pub minor_unit: String,
    pub major_unit: Option<String>,

    /// Minor units per major unit. Treated as 1 when unset.
    pub unit_content: Option<i64>,

    /// Explicit price of one major unit, if it differs from
    /// `price × unit_content`.
    pub major_unit_price: Option<Money>,

    /// Global stock in minor units.
    #[serde(default)]
    pub stock: i64,

    #[serde(default)]
    pub branch_stocks: BTreeMap<String, i64>,

    #[serde(default)]
    pub min_stock: i64,
}

fn default_minor_unit() -> String {
    "piece".to_string()
}

impl Product {
    /// Creates a product sold by the piece with zero stock.
    pub fn new(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
    ) -> Self {
        Product {
            id: id.into(),
            sku: sku.into(),
            name: name.into(),
            price,
            cost: Money::zero(),
            wholesale_price: price,
            minor_unit: default_minor_unit(),
            major_unit: None,
            unit_content: None,
            major_unit_price: None,
            stock: 0,
            branch_stocks: BTreeMap::new(),
            min_stock: 0,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }

    pub fn with_cost(mut self, cost: Money) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_wholesale_price(mut self, price: Money) -> Self {
        self.wholesale_price = price;
        self
    }

    /// Adds a major unit holding `content` minor units.
    pub fn with_major_unit(mut self, unit: impl Into<String>, content: i64) -> Self {
        self.major_unit = Some(unit.into());
        self.unit_content = Some(content);
        self
    }

    /// Minor units per major unit (1 when unset or non-positive).
    #[inline]
    pub fn unit_content(&self) -> i64 {
        self.unit_content.filter(|c| *c > 0).unwrap_or(1)
    }
}

// =============================================================================
// Customer & Supplier
// =============================================================================

/// A customer with a receivable balance and loyalty account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,

    /// Receivable. Positive means the customer owes the store.
    #[serde(default)]
    pub balance: Money,

    /// Loyalty points; only ever increased by sales.
    #[serde(default)]
    pub points: i64,

    /// Advisory; not enforced by the engine.
    #[serde(default)]
    pub credit_limit: Money,

    /// Advisory; not enforced by the engine.
    pub credit_score: Option<u8>,

    #[serde(default)]
    pub total_spent: Money,

    #[ts(as = "Option<String>")]
    pub last_purchase: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Customer {
            id: id.into(),
            name: name.into(),
            phone: None,
            balance: Money::zero(),
            points: 0,
            credit_limit: Money::zero(),
            credit_score: None,
            total_spent: Money::zero(),
            last_purchase: None,
        }
    }
}

/// A supplier with a payable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,

    /// Payable. Negative means the store owes the supplier.
    #[serde(default)]
    pub balance: Money,
}

impl Supplier {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Supplier {
            id: id.into(),
            name: name.into(),
            phone: None,
            balance: Money::zero(),
        }
    }

    /// What the store currently owes this supplier.
    pub fn amount_owed(&self) -> Money {
        if self.balance.is_negative() {
            self.balance.abs()
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line of a recorded sale.
///
/// `quantity` and `unit` are as entered; `minor_quantity` is what left stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub minor_quantity: i64,
    /// Price of one entered unit, frozen at time of sale.
    pub unit_price: Money,
    pub line_total: Money,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub lines: Vec<SaleLine>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<String>,
    pub branch_id: Option<String>,
    /// Id of the ledger entry posted for this sale.
    pub transaction_id: String,
    /// Installment plan created for a credit sale, if any.
    pub installment_plan_id: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A line of a recorded purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub minor_quantity: i64,
    /// Cost of one entered unit.
    pub unit_cost: Money,
    pub line_total: Money,
}

/// A recorded purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub supplier_id: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub total: Money,
    /// Paid up front. Defaults to zero for credit purchases and to the
    /// total otherwise.
    pub paid_amount: Money,
    pub payment_method: PaymentMethod,
    /// Ledger entry for the up-front payment, if anything was paid.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Purchase {
    /// The part of the total that becomes a supplier payable.
    pub fn unpaid_amount(&self) -> Money {
        self.total - self.paid_amount
    }
}

// =============================================================================
// Credit Note & Supplier Settlement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditNoteStatus {
    Issued,
}

/// A cash refund issued against an invoice.
///
/// The customer link is recorded for reporting; issuing a credit note does
/// not change the customer's receivable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditNote {
    pub id: String,
    pub invoice_id: String,
    pub customer_id: Option<String>,
    pub amount: Money,
    pub reason: String,
    pub status: CreditNoteStatus,
    pub transaction_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

/// A payment that reduces what the store owes a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSettlement {
    pub id: String,
    pub supplier_id: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub transaction_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}
