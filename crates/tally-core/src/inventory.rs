//! # Inventory Ledger
//!
//! Owns every product's global and per-branch stock.
//!
//! ## Two-Phase Deductions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale: 3 × soap @ branch-2, 5 × soap @ branch-2, 1 × rice               │
//! │                                                                         │
//! │  Phase 1: plan_deductions()                                             │
//! │     soap → 8 requested (aggregated), stock 6  ✗ InsufficientStock       │
//! │     (nothing has been touched)                                          │
//! │                                                                         │
//! │  Phase 2: only reached when EVERY product is covered                    │
//! │     deduct(soap, 3) → deduct(soap, 5) → deduct(rice, 1)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Branch Allocation
//! The main branch with no explicit entry implicitly holds the full global
//! stock. `initialize_main_allocation` turns that implicit figure into an
//! explicit entry; transfers call it before moving anything out of main.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::MAX_STOCK;

/// Global stock per product id, captured before an operation mutates the
/// inventory.
pub type StockLevels = BTreeMap<String, i64>;

/// A minor-unit quantity to take out of one product's stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub product_id: String,
    pub quantity: i64,
}

impl Deduction {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Deduction {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// `stock ≤ min_stock`.
#[inline]
pub fn below_min_stock(product: &Product) -> bool {
    product.stock <= product.min_stock
}

/// The product catalog with its stock figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    products: BTreeMap<String, Product>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory::default()
    }

    /// Adds a product to the catalog.
    pub fn insert(&mut self, product: Product) -> CoreResult<()> {
        if self.products.contains_key(&product.id) {
            return Err(CoreError::Duplicate {
                kind: "product".to_string(),
                id: product.id,
            });
        }
        self.products.insert(product.id.clone(), product);
        Ok(())
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    /// Looks a product up, failing with `MissingReference`.
    pub fn require(&self, product_id: &str) -> CoreResult<&Product> {
        self.products
            .get(product_id)
            .ok_or_else(|| CoreError::missing("product", product_id))
    }

    fn require_mut(&mut self, product_id: &str) -> CoreResult<&mut Product> {
        self.products
            .get_mut(product_id)
            .ok_or_else(|| CoreError::missing("product", product_id))
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products at or below their minimum stock.
    pub fn low_stock(&self) -> Vec<&Product> {
        self.products.values().filter(|p| below_min_stock(p)).collect()
    }

    /// Snapshot of global stock for every product.
    pub fn stock_levels(&self) -> StockLevels {
        self.products
            .values()
            .map(|p| (p.id.clone(), p.stock))
            .collect()
    }

    // =========================================================================
    // Branch Allocation
    // =========================================================================

    /// The quantity `branch_id` may hand out or sell.
    ///
    /// Explicit entry if present; for the main branch without an entry the
    /// full global stock; otherwise 0.
    pub fn allocation(&self, product_id: &str, branch_id: &str, main_branch: &str) -> CoreResult<i64> {
        let product = self.require(product_id)?;
        Ok(allocation_of(product, branch_id, main_branch))
    }

    /// Makes the main branch's implicit allocation explicit.
    ///
    /// Returns the main branch's allocation. Calling it again is a no-op.
    pub fn initialize_main_allocation(&mut self, product_id: &str, main_branch: &str) -> CoreResult<i64> {
        let product = self.require_mut(product_id)?;
        let stock = product.stock;
        let entry = *product
            .branch_stocks
            .entry(main_branch.to_string())
            .or_insert(stock);
        Ok(entry)
    }

    /// Moves `quantity` of a product's allocation between branches.
    ///
    /// All checks run before anything changes; a rejected transfer leaves
    /// the product untouched (including the main-branch bootstrap).
    pub fn transfer(
        &mut self,
        product_id: &str,
        from: &str,
        to: &str,
        quantity: i64,
        main_branch: &str,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if from == to {
            return Err(ValidationError::InvalidFormat {
                field: "toBranch".to_string(),
                reason: "must differ from the source branch".to_string(),
            }
            .into());
        }

        let product = self.require(product_id)?;
        let available = allocation_of(product, from, main_branch);
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
                available,
            });
        }

        let target = allocation_of(product, to, main_branch) + quantity;
        if target > product.stock {
            return Err(CoreError::AllocationExceedsStock {
                product_id: product_id.to_string(),
                branch_id: to.to_string(),
                allocated: target,
                stock: product.stock,
            });
        }

        if from == main_branch {
            self.initialize_main_allocation(product_id, main_branch)?;
        }

        let product = self.require_mut(product_id)?;
        product.branch_stocks.insert(from.to_string(), available - quantity);
        product.branch_stocks.insert(to.to_string(), target);

        debug!(product_id, from, to, quantity, "Stock transferred");
        Ok(())
    }

    // =========================================================================
    // Deduct / Restock
    // =========================================================================

    /// Phase one: aggregates requests per product and checks that every
    /// product can cover the summed quantity.
    ///
    /// Returns one deduction per product, in product-id order. Nothing is
    /// mutated.
    pub fn plan_deductions(&self, requests: &[Deduction]) -> CoreResult<Vec<Deduction>> {
        let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
        for request in requests {
            if request.quantity <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                }
                .into());
            }
            let total = totals.entry(request.product_id.as_str()).or_insert(0);
            *total = total
                .checked_add(request.quantity)
                .ok_or_else(|| ValidationError::too_large("quantity", i64::MAX))?;
        }

        let mut plan = Vec::with_capacity(totals.len());
        for (product_id, requested) in totals {
            let product = self.require(product_id)?;
            if product.stock < requested {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested,
                    available: product.stock,
                });
            }
            plan.push(Deduction::new(product_id, requested));
        }
        Ok(plan)
    }

    /// Like [`Inventory::plan_deductions`] when only the verdict matters.
    pub fn check_deductions(&self, deductions: &[Deduction]) -> CoreResult<()> {
        self.plan_deductions(deductions).map(|_| ())
    }

    /// Takes `quantity` minor units out of a product's stock.
    ///
    /// The branch entry, when present, drops by the same amount but never
    /// below 0. Every branch entry is then capped at the new global stock.
    pub fn deduct(&mut self, product_id: &str, quantity: i64, branch_id: Option<&str>) -> CoreResult<()> {
        self.check_deductions(&[Deduction::new(product_id, quantity)])?;

        let product = self.require_mut(product_id)?;
        product.stock -= quantity;

        if let Some(entry) = branch_id.and_then(|b| product.branch_stocks.get_mut(b)) {
            *entry = (*entry - quantity).max(0);
        }
        let stock = product.stock;
        for entry in product.branch_stocks.values_mut() {
            *entry = (*entry).min(stock);
        }

        debug!(product_id, quantity, stock, "Stock deducted");
        Ok(())
    }

    /// Checks, then applies, a batch of deductions as one unit.
    pub fn deduct_all(&mut self, deductions: &[Deduction], branch_id: Option<&str>) -> CoreResult<()> {
        for deduction in self.plan_deductions(deductions)? {
            self.deduct(&deduction.product_id, deduction.quantity, branch_id)?;
        }
        Ok(())
    }

    /// Phase one of a batch restock: every product exists and none would
    /// end above [`MAX_STOCK`]. Lines for the same product are aggregated.
    pub fn check_restocks(&self, restocks: &[Deduction]) -> CoreResult<()> {
        let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
        for restock in restocks {
            if restock.quantity < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "quantity".to_string(),
                }
                .into());
            }
            let total = totals.entry(restock.product_id.as_str()).or_insert(0);
            *total = total
                .checked_add(restock.quantity)
                .ok_or_else(|| ValidationError::too_large("quantity", MAX_STOCK))?;
        }

        for (product_id, added) in totals {
            restocked_level(self.require(product_id)?, added)?;
        }
        Ok(())
    }

    /// Adds `quantity` minor units to global stock, and to the branch entry
    /// when a branch is given.
    ///
    /// Stock may not exceed [`MAX_STOCK`]; a rejected restock changes nothing.
    pub fn restock(&mut self, product_id: &str, quantity: i64, branch_id: Option<&str>) -> CoreResult<()> {
        if quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity".to_string(),
            }
            .into());
        }

        let product = self.require_mut(product_id)?;
        product.stock = restocked_level(product, quantity)?;
        if let Some(branch_id) = branch_id {
            let entry = product.branch_stocks.entry(branch_id.to_string()).or_insert(0);
            *entry = (*entry + quantity).min(product.stock);
        }

        debug!(product_id, quantity, stock = product.stock, "Stock restocked");
        Ok(())
    }

    /// Overwrites a product's per-minor-unit cost.
    pub fn set_cost(&mut self, product_id: &str, cost: Money) -> CoreResult<()> {
        self.require_mut(product_id)?.cost = cost;
        Ok(())
    }
}

fn restocked_level(product: &Product, added: i64) -> CoreResult<i64> {
    product
        .stock
        .checked_add(added)
        .filter(|stock| *stock <= MAX_STOCK)
        .ok_or_else(|| ValidationError::too_large("stock", MAX_STOCK).into())
}

fn allocation_of(product: &Product, branch_id: &str, main_branch: &str) -> i64 {
    match product.branch_stocks.get(branch_id) {
        Some(entry) => *entry,
        None if branch_id == main_branch => product.stock,
        None => 0,
    }
}
