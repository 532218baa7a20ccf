//! # Orders
//!
//! Wholesale orders (approved into credit sales) and online orders with
//! their fulfillment state machine.
//!
//! ## Online Order Lifecycle
//! ```text
//!   pending ──► processing ──► shipped ──► delivered
//!      │   (stock out)  │    (shipment)    (card payment in)
//!      │                │
//!      ├──► shipped / delivered directly   (stock out on the way)
//!      │                │
//!      └────────────────┴──► cancelled     (restock if it was processing)
//! ```
//!
//! Steps may be skipped going forward; a skipped `processing` still takes
//! the stock. Moving backward, repeating the current state, or leaving
//! `delivered`/`cancelled` is an `InvalidTransition`. Wholesale orders go
//! `pending_approval → approved | rejected` and never leave those.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// One requested product on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    /// Price of one `unit`.
    pub unit_price: Money,
}

// =============================================================================
// Wholesale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WholesaleStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl WholesaleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WholesaleStatus::PendingApproval => "pending_approval",
            WholesaleStatus::Approved => "approved",
            WholesaleStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleOrder {
    pub id: String,
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: WholesaleStatus,
    /// The credit sale created on approval.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl WholesaleOrder {
    pub fn is_pending(&self) -> bool {
        self.status == WholesaleStatus::PendingApproval
    }
}

// =============================================================================
// Online
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OnlineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OnlineStatus::Pending => "pending",
            OnlineStatus::Processing => "processing",
            OnlineStatus::Shipped => "shipped",
            OnlineStatus::Delivered => "delivered",
            OnlineStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `self → next` is an edge of the fulfillment graph.
    pub fn can_advance_to(self, next: OnlineStatus) -> bool {
        use OnlineStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Shipped | Delivered | Cancelled)
                | (Processing, Shipped | Delivered | Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Stock has left the shelves for this order.
    pub fn holds_stock(self) -> bool {
        matches!(
            self,
            OnlineStatus::Processing | OnlineStatus::Shipped | OnlineStatus::Delivered
        )
    }
}

/// Rejects any move outside the fulfillment graph.
pub fn check_transition(from: OnlineStatus, to: OnlineStatus) -> CoreResult<()> {
    if from.can_advance_to(to) {
        Ok(())
    } else {
        Err(CoreError::transition("online order", from.as_str(), to.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OnlineOrder {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: OnlineStatus,
    pub shipment_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    InTransit,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub order_id: String,
    pub tracking_number: String,
    pub carrier: String,
    pub status: ShipmentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Book
// =============================================================================

/// Wholesale orders, online orders and shipments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    wholesale: BTreeMap<String, WholesaleOrder>,
    online: BTreeMap<String, OnlineOrder>,
    shipments: BTreeMap<String, Shipment>,
}

impl OrderBook {
    pub fn insert_wholesale(&mut self, order: WholesaleOrder) {
        self.wholesale.insert(order.id.clone(), order);
    }

    pub fn wholesale(&self, order_id: &str) -> Option<&WholesaleOrder> {
        self.wholesale.get(order_id)
    }

    pub fn require_wholesale(&self, order_id: &str) -> CoreResult<&WholesaleOrder> {
        self.wholesale
            .get(order_id)
            .ok_or_else(|| CoreError::missing("wholesale order", order_id))
    }

    pub fn require_wholesale_mut(&mut self, order_id: &str) -> CoreResult<&mut WholesaleOrder> {
        self.wholesale
            .get_mut(order_id)
            .ok_or_else(|| CoreError::missing("wholesale order", order_id))
    }

    pub fn wholesale_orders(&self) -> impl Iterator<Item = &WholesaleOrder> {
        self.wholesale.values()
    }

    pub fn insert_online(&mut self, order: OnlineOrder) {
        self.online.insert(order.id.clone(), order);
    }

    pub fn online(&self, order_id: &str) -> Option<&OnlineOrder> {
        self.online.get(order_id)
    }

    pub fn require_online(&self, order_id: &str) -> CoreResult<&OnlineOrder> {
        self.online
            .get(order_id)
            .ok_or_else(|| CoreError::missing("online order", order_id))
    }

    pub fn require_online_mut(&mut self, order_id: &str) -> CoreResult<&mut OnlineOrder> {
        self.online
            .get_mut(order_id)
            .ok_or_else(|| CoreError::missing("online order", order_id))
    }

    pub fn online_orders(&self) -> impl Iterator<Item = &OnlineOrder> {
        self.online.values()
    }

    pub fn insert_shipment(&mut self, shipment: Shipment) {
        self.shipments.insert(shipment.id.clone(), shipment);
    }

    pub fn shipment(&self, shipment_id: &str) -> Option<&Shipment> {
        self.shipments.get(shipment_id)
    }

    pub fn shipment_mut(&mut self, shipment_id: &str) -> Option<&mut Shipment> {
        self.shipments.get_mut(shipment_id)
    }

    pub fn shipments(&self) -> impl Iterator<Item = &Shipment> {
        self.shipments.values()
    }
}
