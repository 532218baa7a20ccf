//! # Production
//!
//! Bills of materials and the production orders that consume them.
//!
//! ```text
//! Bom "Paint 4L"  = 3 × pigment + 4 × base        (per unit of final product)
//!
//! start(qty 10)   → pigment -30, base -40         (all or nothing)
//!                   order in_progress
//! complete()      → paint +10
//!                   order completed
//! complete() again → no-op
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::Deduction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BomComponent {
    pub product_id: String,
    /// Minor units consumed per unit of final product.
    pub quantity: i64,
}

/// Recipe for one unit of a finished product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bom {
    pub id: String,
    pub name: String,
    pub final_product_id: String,
    pub components: Vec<BomComponent>,
}

impl Bom {
    /// Stock to consume for `quantity` units of the final product.
    pub fn requirements(&self, quantity: i64) -> CoreResult<Vec<Deduction>> {
        self.components
            .iter()
            .map(|c| {
                let needed = c
                    .quantity
                    .checked_mul(quantity)
                    .ok_or_else(|| ValidationError::too_large("quantity", i64::MAX))?;
                Ok(Deduction::new(c.product_id.clone(), needed))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    InProgress,
    Completed,
}

impl ProductionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductionStatus::InProgress => "in_progress",
            ProductionStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductionOrder {
    pub id: String,
    pub bom_id: String,
    pub quantity: i64,
    pub status: ProductionStatus,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProductionOrder {
    /// Marks the order completed. Returns `false` if it already was.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == ProductionStatus::Completed {
            return false;
        }
        self.status = ProductionStatus::Completed;
        self.completed_at = Some(at);
        true
    }
}

/// BOM catalog and production orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBook {
    boms: BTreeMap<String, Bom>,
    orders: BTreeMap<String, ProductionOrder>,
}

impl ProductionBook {
    pub fn insert_bom(&mut self, bom: Bom) -> CoreResult<()> {
        if self.boms.contains_key(&bom.id) {
            return Err(CoreError::Duplicate {
                kind: "bom".to_string(),
                id: bom.id,
            });
        }
        self.boms.insert(bom.id.clone(), bom);
        Ok(())
    }

    pub fn bom(&self, bom_id: &str) -> Option<&Bom> {
        self.boms.get(bom_id)
    }

    pub fn require_bom(&self, bom_id: &str) -> CoreResult<&Bom> {
        self.boms
            .get(bom_id)
            .ok_or_else(|| CoreError::missing("bom", bom_id))
    }

    pub fn boms(&self) -> impl Iterator<Item = &Bom> {
        self.boms.values()
    }

    pub fn insert_order(&mut self, order: ProductionOrder) {
        self.orders.insert(order.id.clone(), order);
    }

    pub fn order(&self, order_id: &str) -> Option<&ProductionOrder> {
        self.orders.get(order_id)
    }

    pub fn require_order(&self, order_id: &str) -> CoreResult<&ProductionOrder> {
        self.orders
            .get(order_id)
            .ok_or_else(|| CoreError::missing("production order", order_id))
    }

    pub fn require_order_mut(&mut self, order_id: &str) -> CoreResult<&mut ProductionOrder> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::missing("production order", order_id))
    }

    pub fn orders(&self) -> impl Iterator<Item = &ProductionOrder> {
        self.orders.values()
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &ProductionOrder> {
        self.orders
            .values()
            .filter(|o| o.status == ProductionStatus::InProgress)
    }
}
