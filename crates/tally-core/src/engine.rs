//! # Transaction Orchestrator
//!
//! [`Engine`] owns every aggregate and is the only writer. Each operation
//! runs in two phases:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Phase 1 (&self):  validate payload, resolve references, convert units, │
//! │                    plan aggregated deductions                           │
//! │                    any error → Err(CoreError), NOTHING has changed      │
//! │                                                                         │
//! │  Phase 2 (&mut):   stock → safe/ledger → customer/supplier → plan       │
//! │                    → notifications (derived from pre/post stock)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Documented no-ops (paying a paid installment, completing a completed
//! order, approving a non-pending wholesale order) return an [`Outcome`]
//! with `changed == false` instead of an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::{
    AdvanceRequest, Command, CreditNoteRequest, Effect, LineInput, OnlineOrderRequest,
    PurchaseRequest, SaleRequest, SettlementRequest, StockTransfer, TransferRequest,
};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::installments::{create_plan, InstallmentBook, InstallmentPlan};
use crate::inventory::{Deduction, Inventory, StockLevels};
use crate::money::Money;
use crate::notifications::{evaluate, Notification, NotificationFeed, Trigger};
use crate::orders::{
    check_transition, OnlineOrder, OnlineStatus, OrderBook, OrderLine, Shipment,
    ShipmentStatus, WholesaleOrder, WholesaleStatus,
};
use crate::production::{Bom, ProductionBook, ProductionOrder, ProductionStatus};
use crate::relations::{apply_credit_note, apply_installment_payment, Relations};
use crate::safe::{CashBook, TransactionKind};
use crate::types::{
    CreditNote, CreditNoteStatus, Customer, PaymentMethod, Product, Purchase, PurchaseLine, Sale,
    SaleLine, Supplier, SupplierSettlement,
};
use crate::units::{checked_minor_units, minor_unit_cost, unit_price, wholesale_unit_price};
use crate::validation::{
    validate_id, validate_line_count, validate_min_stock, validate_name, validate_payment_amount,
    validate_price, validate_quantity, validate_sku, validate_stock, validate_total,
    validate_unit_content,
};

use crate::MAX_LINE_QUANTITY;

const MAX_REASON_LEN: usize = 500;

// =============================================================================
// Outcome
// =============================================================================

/// Result of a successful (or no-op) operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    pub value: T,
    /// Alerts raised by this operation; already appended to the feed.
    pub notifications: Vec<Notification>,
    /// `false` for documented no-ops.
    pub changed: bool,
}

impl<T> Outcome<T> {
    pub fn changed(value: T, notifications: Vec<Notification>) -> Self {
        Outcome {
            value,
            notifications,
            changed: true,
        }
    }

    pub fn unchanged(value: T) -> Self {
        Outcome {
            value,
            notifications: Vec::new(),
            changed: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            notifications: self.notifications,
            changed: self.changed,
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Everything the engine owns. This is the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineState {
    pub inventory: Inventory,
    pub cash_book: CashBook,
    pub relations: Relations,
    pub installments: InstallmentBook,
    pub production: ProductionBook,
    pub orders: OrderBook,
    pub sales: Vec<Sale>,
    pub purchases: Vec<Purchase>,
    pub credit_notes: Vec<CreditNote>,
    pub settlements: Vec<SupplierSettlement>,
    pub notifications: NotificationFeed,
}

#[derive(Debug, Clone, Copy)]
enum Pricing {
    Retail,
    Wholesale,
}

/// Phase-one result for a sale.
struct PreparedSale {
    lines: Vec<SaleLine>,
    deductions: Vec<Deduction>,
    total: Money,
}

/// Phase-one result for a purchase.
struct PreparedPurchase {
    lines: Vec<PurchaseLine>,
    /// Per-minor-unit cost, one per line.
    costs: Vec<Money>,
    total: Money,
    paid: Money,
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Engine {
    state: EngineState,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            state: EngineState::default(),
            config,
        }
    }

    /// Resumes from a persisted snapshot.
    pub fn from_state(state: EngineState, config: EngineConfig) -> Self {
        Engine { state, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    pub fn inventory(&self) -> &Inventory {
        &self.state.inventory
    }

    pub fn cash_book(&self) -> &CashBook {
        &self.state.cash_book
    }

    pub fn relations(&self) -> &Relations {
        &self.state.relations
    }

    pub fn installments(&self) -> &InstallmentBook {
        &self.state.installments
    }

    pub fn production(&self) -> &ProductionBook {
        &self.state.production
    }

    pub fn orders(&self) -> &OrderBook {
        &self.state.orders
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.state.notifications
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Runs any command. This is the entry point used by hosts.
    pub fn execute(&mut self, command: Command) -> CoreResult<Outcome<Effect>> {
        debug!(command = command.name(), "Executing command");
        match command {
            Command::RecordSale(request) => Ok(self.record_sale(request)?.map(Effect::Sale)),
            Command::RecordPurchase(request) => {
                Ok(self.record_purchase(request)?.map(Effect::Purchase))
            }
            Command::TransferStock(request) => {
                Ok(self.transfer_stock(request)?.map(Effect::Transfer))
            }
            Command::StartProduction { bom_id, quantity } => Ok(self
                .start_production(&bom_id, quantity)?
                .map(Effect::ProductionOrder)),
            Command::CompleteProduction { order_id } => Ok(self
                .complete_production(&order_id)?
                .map(Effect::ProductionOrder)),
            Command::PayInstallment {
                plan_id,
                installment_id,
            } => Ok(self
                .pay_installment(&plan_id, &installment_id)?
                .map(Effect::InstallmentPlan)),
            Command::IssueCreditNote(request) => {
                Ok(self.issue_credit_note(request)?.map(Effect::CreditNote))
            }
            Command::SubmitWholesaleOrder { customer_id, lines } => Ok(self
                .submit_wholesale_order(&customer_id, &lines)?
                .map(Effect::WholesaleOrder)),
            Command::ApproveWholesaleOrder { order_id } => Ok(self
                .approve_wholesale_order(&order_id)?
                .map(Effect::WholesaleOrder)),
            Command::RejectWholesaleOrder { order_id } => Ok(self
                .reject_wholesale_order(&order_id)?
                .map(Effect::WholesaleOrder)),
            Command::PlaceOnlineOrder(request) => {
                Ok(self.place_online_order(request)?.map(Effect::OnlineOrder))
            }
            Command::AdvanceOnlineOrder(request) => {
                Ok(self.advance_online_order(request)?.map(Effect::OnlineOrder))
            }
            Command::SettleSupplier(request) => {
                Ok(self.settle_supplier(request)?.map(Effect::Settlement))
            }
            Command::AddProduct(product) => Ok(self.add_product(product)?.map(Effect::Product)),
            Command::AddCustomer(customer) => {
                Ok(self.add_customer(customer)?.map(Effect::Customer))
            }
            Command::AddSupplier(supplier) => {
                Ok(self.add_supplier(supplier)?.map(Effect::Supplier))
            }
            Command::DefineBom(bom) => Ok(self.define_bom(bom)?.map(Effect::Bom)),
            Command::MarkNotificationsRead => Ok(self
                .mark_notifications_read()
                .map(Effect::NotificationsRead)),
        }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale.
    ///
    /// Every line is checked (aggregated per product) before any stock
    /// moves. A credit sale to a known customer also creates an
    /// installment plan; a credit sale without a customer only hits the
    /// ledger.
    pub fn record_sale(&mut self, request: SaleRequest) -> CoreResult<Outcome<Sale>> {
        debug!(
            lines = request.lines.len(),
            method = request.payment_method.as_str(),
            customer_id = ?request.customer_id,
            branch_id = ?request.branch_id,
            "Recording sale"
        );
        let prepared = self.prepare_sale(&request, Pricing::Retail)?;
        self.commit_sale(request, prepared)
    }

    fn prepare_sale(&self, request: &SaleRequest, pricing: Pricing) -> CoreResult<PreparedSale> {
        if let Some(customer_id) = &request.customer_id {
            self.state.relations.require_customer(customer_id)?;
        }
        if let Some(branch_id) = &request.branch_id {
            validate_id("branchId", branch_id)?;
        }
        if let Some(note) = &request.note {
            if note.len() > MAX_REASON_LEN {
                return Err(ValidationError::TooLong {
                    field: "note".to_string(),
                    max: MAX_REASON_LEN,
                }
                .into());
            }
        }

        let (lines, deductions, total) = self.resolve_lines(&request.lines, pricing)?;
        let deductions = self.state.inventory.plan_deductions(&deductions)?;
        Ok(PreparedSale {
            lines,
            deductions,
            total,
        })
    }

    fn commit_sale(&mut self, request: SaleRequest, prepared: PreparedSale) -> CoreResult<Outcome<Sale>> {
        let now = Utc::now();
        let pre = self.state.inventory.stock_levels();

        self.state
            .inventory
            .deduct_all(&prepared.deductions, request.branch_id.as_deref())?;

        let total = prepared.total;
        let sale_id = Uuid::new_v4().to_string();
        let transaction = self.state.cash_book.post(
            TransactionKind::In,
            total,
            request.payment_method,
            format!("Sale {}", sale_id),
            now,
        );

        let mut sale = Sale {
            id: sale_id,
            lines: prepared.lines,
            total,
            payment_method: request.payment_method,
            customer_id: request.customer_id,
            branch_id: request.branch_id,
            transaction_id: transaction.id,
            installment_plan_id: None,
            note: request.note,
            date: now,
        };

        if let Some(customer_id) = sale.customer_id.clone() {
            self.state.relations.apply_sale_to_customer(&customer_id, &sale)?;
            if sale.payment_method.is_credit() {
                let plan = create_plan(&customer_id, &sale.id, total, now, self.config.installment_policy);
                sale.installment_plan_id = Some(plan.id.clone());
                self.state.installments.insert(plan);
            }
        }

        let notifications = self.emit(&pre, Trigger::Sale(&sale), now);
        self.state.sales.push(sale.clone());

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            method = sale.payment_method.as_str(),
            plan = ?sale.installment_plan_id,
            "Sale recorded"
        );
        Ok(Outcome::changed(sale, notifications))
    }

    /// Validates lines, resolves products and prices, converts to minor
    /// units and totals the document. Does not check stock.
    fn resolve_lines(
        &self,
        inputs: &[LineInput],
        pricing: Pricing,
    ) -> CoreResult<(Vec<SaleLine>, Vec<Deduction>, Money)> {
        validate_line_count(inputs.len())?;

        let mut lines = Vec::with_capacity(inputs.len());
        let mut deductions = Vec::with_capacity(inputs.len());
        for input in inputs {
            validate_id("productId", &input.product_id)?;
            validate_quantity(input.quantity)?;
            if let Some(price) = input.unit_price {
                validate_price("unitPrice", price)?;
            }

            let product = self.state.inventory.require(&input.product_id)?;
            let unit = input.unit.as_deref();
            let minor_quantity = checked_minor_units(product, input.quantity, unit)?;
            let price = input.unit_price.unwrap_or_else(|| match pricing {
                Pricing::Retail => unit_price(product, unit),
                Pricing::Wholesale => wholesale_unit_price(product, unit),
            });

            lines.push(SaleLine {
                product_id: input.product_id.clone(),
                quantity: input.quantity,
                unit: input.unit.clone(),
                minor_quantity,
                unit_price: price,
                line_total: validate_total(
                    "lineTotal",
                    price.checked_multiply_quantity(input.quantity),
                )?,
            });
            deductions.push(Deduction::new(input.product_id.clone(), minor_quantity));
        }

        let total = validate_total("total", Money::checked_sum(lines.iter().map(|l| l.line_total)))?;
        Ok((lines, deductions, total))
    }

    fn emit(&mut self, pre: &StockLevels, trigger: Trigger<'_>, now: DateTime<Utc>) -> Vec<Notification> {
        let notifications = evaluate(pre, &self.state.inventory, trigger, &self.config, now);
        if !notifications.is_empty() {
            debug!(count = notifications.len(), "Notifications raised");
            self.state.notifications.extend(&notifications);
        }
        notifications
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Records a purchase: restocks every line and refreshes product cost.
    ///
    /// Whatever is not paid up front becomes a supplier payable, so an
    /// unpaid remainder needs a supplier.
    pub fn record_purchase(&mut self, request: PurchaseRequest) -> CoreResult<Outcome<Purchase>> {
        debug!(
            lines = request.lines.len(),
            method = request.payment_method.as_str(),
            supplier_id = ?request.supplier_id,
            "Recording purchase"
        );
        let prepared = self.prepare_purchase(&request)?;
        let now = Utc::now();

        for (line, cost) in prepared.lines.iter().zip(&prepared.costs) {
            self.state
                .inventory
                .restock(&line.product_id, line.minor_quantity, request.branch_id.as_deref())?;
            self.state.inventory.set_cost(&line.product_id, *cost)?;
        }

        let purchase_id = Uuid::new_v4().to_string();
        let transaction_id = if prepared.paid.is_positive() {
            // purchases are always paid out of the cash drawer
            let transaction = self.state.cash_book.post(
                TransactionKind::Out,
                prepared.paid,
                PaymentMethod::Cash,
                format!("Purchase {}", purchase_id),
                now,
            );
            Some(transaction.id)
        } else {
            None
        };

        let purchase = Purchase {
            id: purchase_id,
            supplier_id: request.supplier_id,
            lines: prepared.lines,
            total: prepared.total,
            paid_amount: prepared.paid,
            payment_method: request.payment_method,
            transaction_id,
            date: now,
        };

        if let Some(supplier_id) = &purchase.supplier_id {
            self.state
                .relations
                .apply_purchase_to_supplier(supplier_id, &purchase)?;
        }
        self.state.purchases.push(purchase.clone());

        info!(
            purchase_id = %purchase.id,
            total = %purchase.total,
            paid = %purchase.paid_amount,
            "Purchase recorded"
        );
        Ok(Outcome::changed(purchase, Vec::new()))
    }

    fn prepare_purchase(&self, request: &PurchaseRequest) -> CoreResult<PreparedPurchase> {
        validate_line_count(request.lines.len())?;
        if let Some(supplier_id) = &request.supplier_id {
            self.state.relations.require_supplier(supplier_id)?;
        }
        if let Some(branch_id) = &request.branch_id {
            validate_id("branchId", branch_id)?;
        }

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut costs = Vec::with_capacity(request.lines.len());
        for input in &request.lines {
            validate_id("productId", &input.product_id)?;
            validate_quantity(input.quantity)?;
            validate_price("unitCost", input.unit_cost)?;

            let product = self.state.inventory.require(&input.product_id)?;
            let unit = input.unit.as_deref();
            lines.push(PurchaseLine {
                product_id: input.product_id.clone(),
                quantity: input.quantity,
                unit: input.unit.clone(),
                minor_quantity: checked_minor_units(product, input.quantity, unit)?,
                unit_cost: input.unit_cost,
                line_total: validate_total(
                    "lineTotal",
                    input.unit_cost.checked_multiply_quantity(input.quantity),
                )?,
            });
            costs.push(minor_unit_cost(product, input.unit_cost, unit));
        }

        let restocks: Vec<Deduction> = lines
            .iter()
            .map(|l| Deduction::new(l.product_id.clone(), l.minor_quantity))
            .collect();
        self.state.inventory.check_restocks(&restocks)?;

        let total = validate_total("total", Money::checked_sum(lines.iter().map(|l| l.line_total)))?;
        let paid = request.paid_amount.unwrap_or(if request.payment_method.is_credit() {
            Money::zero()
        } else {
            total
        });
        if paid.is_negative() || paid > total {
            return Err(ValidationError::OutOfRange {
                field: "paidAmount".to_string(),
                min: 0,
                max: total.cents(),
            }
            .into());
        }
        if paid < total && request.supplier_id.is_none() {
            return Err(ValidationError::Required {
                field: "supplierId".to_string(),
            }
            .into());
        }

        Ok(PreparedPurchase {
            lines,
            costs,
            total,
            paid,
        })
    }

    // =========================================================================
    // Stock Transfer
    // =========================================================================

    /// Moves allocation between branches. Global stock is unchanged.
    pub fn transfer_stock(&mut self, request: TransferRequest) -> CoreResult<Outcome<StockTransfer>> {
        debug!(
            product_id = %request.product_id,
            from = %request.from_branch,
            to = %request.to_branch,
            quantity = request.quantity,
            "Transferring stock"
        );
        validate_id("productId", &request.product_id)?;
        validate_id("fromBranch", &request.from_branch)?;
        validate_id("toBranch", &request.to_branch)?;

        let main = self.config.main_branch_id.as_str();
        self.state.inventory.transfer(
            &request.product_id,
            &request.from_branch,
            &request.to_branch,
            request.quantity,
            main,
        )?;

        let transfer = StockTransfer {
            from_allocation: self
                .state
                .inventory
                .allocation(&request.product_id, &request.from_branch, main)?,
            to_allocation: self
                .state
                .inventory
                .allocation(&request.product_id, &request.to_branch, main)?,
            product_id: request.product_id,
            from_branch: request.from_branch,
            to_branch: request.to_branch,
            quantity: request.quantity,
        };

        info!(
            product_id = %transfer.product_id,
            from_allocation = transfer.from_allocation,
            to_allocation = transfer.to_allocation,
            "Stock transferred"
        );
        Ok(Outcome::changed(transfer, Vec::new()))
    }

    // =========================================================================
    // Production
    // =========================================================================

    /// Consumes components for `quantity` units of a BOM's final product.
    pub fn start_production(&mut self, bom_id: &str, quantity: i64) -> CoreResult<Outcome<ProductionOrder>> {
        debug!(bom_id, quantity, "Starting production");
        validate_quantity(quantity)?;
        let bom = self.state.production.require_bom(bom_id)?;
        self.state.inventory.require(&bom.final_product_id)?;
        let plan = self.state.inventory.plan_deductions(&bom.requirements(quantity)?)?;

        let now = Utc::now();
        let pre = self.state.inventory.stock_levels();
        self.state.inventory.deduct_all(&plan, None)?;

        let order = ProductionOrder {
            id: Uuid::new_v4().to_string(),
            bom_id: bom_id.to_string(),
            quantity,
            status: ProductionStatus::InProgress,
            started_at: now,
            completed_at: None,
        };
        self.state.production.insert_order(order.clone());
        let notifications = self.emit(&pre, Trigger::StockMovement, now);

        info!(order_id = %order.id, bom_id, quantity, "Production started");
        Ok(Outcome::changed(order, notifications))
    }

    /// Adds the finished goods to stock. Completing twice is a no-op.
    pub fn complete_production(&mut self, order_id: &str) -> CoreResult<Outcome<ProductionOrder>> {
        debug!(order_id, "Completing production");
        let order = self.state.production.require_order(order_id)?.clone();
        if order.status == ProductionStatus::Completed {
            debug!(order_id, "Production already completed");
            return Ok(Outcome::unchanged(order));
        }

        let final_product_id = self
            .state
            .production
            .require_bom(&order.bom_id)?
            .final_product_id
            .clone();
        self.state.inventory.require(&final_product_id)?;

        let now = Utc::now();
        self.state
            .inventory
            .restock(&final_product_id, order.quantity, None)?;
        let order = self.state.production.require_order_mut(order_id)?;
        order.complete(now);

        info!(order_id, product_id = %final_product_id, quantity = order.quantity, "Production completed");
        Ok(Outcome::changed(order.clone(), Vec::new()))
    }

    // =========================================================================
    // Installments & Credit Notes
    // =========================================================================

    /// Collects one installment in cash. Paying it again is a no-op.
    pub fn pay_installment(&mut self, plan_id: &str, installment_id: &str) -> CoreResult<Outcome<InstallmentPlan>> {
        debug!(plan_id, installment_id, "Paying installment");
        let now = Utc::now();
        let plan = self.state.installments.require_mut(plan_id)?;
        let transaction = apply_installment_payment(
            plan,
            installment_id,
            &mut self.state.relations,
            &mut self.state.cash_book,
            now,
        )?;
        let plan = plan.clone();

        match transaction {
            Some(transaction) => {
                info!(
                    plan_id,
                    installment_id,
                    amount = %transaction.amount,
                    remaining = %plan.remaining_amount,
                    "Installment paid"
                );
                Ok(Outcome::changed(plan, Vec::new()))
            }
            None => {
                debug!(plan_id, installment_id, "Installment already paid");
                Ok(Outcome::unchanged(plan))
            }
        }
    }

    /// Refunds `amount` in cash against an invoice.
    pub fn issue_credit_note(&mut self, request: CreditNoteRequest) -> CoreResult<Outcome<CreditNote>> {
        debug!(invoice_id = %request.invoice_id, amount = %request.amount, "Issuing credit note");
        validate_id("invoiceId", &request.invoice_id)?;
        validate_payment_amount("amount", request.amount)?;
        if request.reason.len() > MAX_REASON_LEN {
            return Err(ValidationError::TooLong {
                field: "reason".to_string(),
                max: MAX_REASON_LEN,
            }
            .into());
        }
        if let Some(customer_id) = &request.customer_id {
            self.state.relations.require_customer(customer_id)?;
        }

        let now = Utc::now();
        let transaction = apply_credit_note(
            &mut self.state.cash_book,
            &request.invoice_id,
            request.amount,
            now,
        );
        let note = CreditNote {
            id: Uuid::new_v4().to_string(),
            invoice_id: request.invoice_id,
            customer_id: request.customer_id,
            amount: request.amount,
            reason: request.reason,
            status: CreditNoteStatus::Issued,
            transaction_id: transaction.id,
            date: now,
        };
        self.state.credit_notes.push(note.clone());

        info!(credit_note_id = %note.id, amount = %note.amount, "Credit note issued");
        Ok(Outcome::changed(note, Vec::new()))
    }

    /// Pays down a supplier payable.
    pub fn settle_supplier(&mut self, request: SettlementRequest) -> CoreResult<Outcome<SupplierSettlement>> {
        debug!(supplier_id = %request.supplier_id, amount = %request.amount, "Settling supplier");
        let supplier_name = self
            .state
            .relations
            .require_supplier(&request.supplier_id)?
            .name
            .clone();
        validate_payment_amount("amount", request.amount)?;
        if request.payment_method.is_credit() {
            return Err(ValidationError::InvalidFormat {
                field: "paymentMethod".to_string(),
                reason: "a settlement is paid in cash, card or transfer".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let transaction = self.state.cash_book.post(
            TransactionKind::Out,
            request.amount,
            request.payment_method,
            format!("Settlement to {}", supplier_name),
            now,
        );
        self.state
            .relations
            .settle_supplier(&request.supplier_id, request.amount)?;

        let settlement = SupplierSettlement {
            id: Uuid::new_v4().to_string(),
            supplier_id: request.supplier_id,
            amount: request.amount,
            payment_method: request.payment_method,
            transaction_id: transaction.id,
            date: now,
        };
        self.state.settlements.push(settlement.clone());

        info!(settlement_id = %settlement.id, amount = %settlement.amount, "Supplier settled");
        Ok(Outcome::changed(settlement, Vec::new()))
    }

    // =========================================================================
    // Wholesale Orders
    // =========================================================================

    /// Files a wholesale order for approval. No stock moves yet.
    pub fn submit_wholesale_order(
        &mut self,
        customer_id: &str,
        lines: &[LineInput],
    ) -> CoreResult<Outcome<WholesaleOrder>> {
        debug!(customer_id, lines = lines.len(), "Submitting wholesale order");
        self.state.relations.require_customer(customer_id)?;
        let (resolved, _, total) = self.resolve_lines(lines, Pricing::Wholesale)?;

        let order = WholesaleOrder {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            total,
            lines: to_order_lines(resolved),
            status: WholesaleStatus::PendingApproval,
            sale_id: None,
            created_at: Utc::now(),
        };
        self.state.orders.insert_wholesale(order.clone());

        info!(order_id = %order.id, total = %order.total, "Wholesale order submitted");
        Ok(Outcome::changed(order, Vec::new()))
    }

    /// Turns a pending wholesale order into a credit sale.
    ///
    /// Non-pending orders are left alone. If the sale is rejected the order
    /// stays pending.
    pub fn approve_wholesale_order(&mut self, order_id: &str) -> CoreResult<Outcome<WholesaleOrder>> {
        debug!(order_id, "Approving wholesale order");
        let order = self.state.orders.require_wholesale(order_id)?.clone();
        if !order.is_pending() {
            debug!(order_id, status = order.status.as_str(), "Wholesale order not pending");
            return Ok(Outcome::unchanged(order));
        }

        let request = SaleRequest {
            lines: order
                .lines
                .iter()
                .map(|line| LineInput {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit: line.unit.clone(),
                    unit_price: Some(line.unit_price),
                })
                .collect(),
            payment_method: PaymentMethod::Credit,
            customer_id: Some(order.customer_id.clone()),
            branch_id: None,
            note: Some(format!("Wholesale order {}", order.id)),
        };
        let prepared = self.prepare_sale(&request, Pricing::Wholesale)?;
        let sale = self.commit_sale(request, prepared)?;

        let order = self.state.orders.require_wholesale_mut(order_id)?;
        order.status = WholesaleStatus::Approved;
        order.sale_id = Some(sale.value.id.clone());

        info!(order_id, sale_id = %sale.value.id, "Wholesale order approved");
        Ok(Outcome::changed(order.clone(), sale.notifications))
    }

    /// Rejects a pending wholesale order. Non-pending orders are left alone.
    pub fn reject_wholesale_order(&mut self, order_id: &str) -> CoreResult<Outcome<WholesaleOrder>> {
        debug!(order_id, "Rejecting wholesale order");
        let order = self.state.orders.require_wholesale_mut(order_id)?;
        if !order.is_pending() {
            return Ok(Outcome::unchanged(order.clone()));
        }
        order.status = WholesaleStatus::Rejected;

        info!(order_id, "Wholesale order rejected");
        Ok(Outcome::changed(order.clone(), Vec::new()))
    }

    // =========================================================================
    // Online Orders
    // =========================================================================

    /// Accepts an online order in `pending`. No stock moves yet.
    pub fn place_online_order(&mut self, request: OnlineOrderRequest) -> CoreResult<Outcome<OnlineOrder>> {
        debug!(customer_name = %request.customer_name, lines = request.lines.len(), "Placing online order");
        validate_name("customerName", &request.customer_name)?;
        if let Some(customer_id) = &request.customer_id {
            self.state.relations.require_customer(customer_id)?;
        }
        let (resolved, _, total) = self.resolve_lines(&request.lines, Pricing::Retail)?;

        let now = Utc::now();
        let order = OnlineOrder {
            id: Uuid::new_v4().to_string(),
            customer_id: request.customer_id,
            customer_name: request.customer_name,
            total,
            lines: to_order_lines(resolved),
            status: OnlineStatus::Pending,
            shipment_id: None,
            created_at: now,
            updated_at: now,
        };
        self.state.orders.insert_online(order.clone());

        info!(order_id = %order.id, total = %order.total, "Online order placed");
        Ok(Outcome::changed(order, Vec::new()))
    }

    /// Moves an online order forward along its fulfillment graph.
    ///
    /// - into `processing`, `shipped` or `delivered` from `pending`: stock
    ///   for every line leaves (all or nothing)
    /// - `shipped`: a shipment is created
    /// - `delivered`: the order total is collected by card
    /// - `cancelled`: stock returns if the order was processing
    pub fn advance_online_order(&mut self, request: AdvanceRequest) -> CoreResult<Outcome<OnlineOrder>> {
        debug!(order_id = %request.order_id, to = request.status.as_str(), "Advancing online order");
        let order = self.state.orders.require_online(&request.order_id)?.clone();
        check_transition(order.status, request.status)?;

        let stock_out = if request.status.holds_stock() && !order.status.holds_stock() {
            let deductions = self.order_deductions(&order.lines)?;
            Some(self.state.inventory.plan_deductions(&deductions)?)
        } else {
            None
        };
        let stock_back = if request.status == OnlineStatus::Cancelled && order.status.holds_stock() {
            let restocks = self.order_deductions(&order.lines)?;
            self.state.inventory.check_restocks(&restocks)?;
            restocks
        } else {
            Vec::new()
        };
        let carrier = if request.status == OnlineStatus::Shipped {
            let carrier = request.carrier.unwrap_or_else(|| "Standard".to_string());
            validate_name("carrier", &carrier)?;
            Some(carrier)
        } else {
            None
        };

        let now = Utc::now();
        let mut updated = order.clone();
        let mut notifications = Vec::new();

        if let Some(plan) = stock_out {
            let pre = self.state.inventory.stock_levels();
            self.state.inventory.deduct_all(&plan, None)?;
            notifications = self.emit(&pre, Trigger::StockMovement, now);
        }
        for restock in &stock_back {
            self.state
                .inventory
                .restock(&restock.product_id, restock.quantity, None)?;
        }

        if let Some(carrier) = carrier {
            let shipment = Shipment {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                tracking_number: request
                    .tracking_number
                    .unwrap_or_else(generate_tracking_number),
                carrier,
                status: ShipmentStatus::InTransit,
                created_at: now,
            };
            updated.shipment_id = Some(shipment.id.clone());
            self.state.orders.insert_shipment(shipment);
        }

        if request.status == OnlineStatus::Delivered {
            self.state.cash_book.post(
                TransactionKind::In,
                order.total,
                PaymentMethod::Card,
                format!("Online order {}", order.id),
                now,
            );
            if let Some(shipment) = order
                .shipment_id
                .as_deref()
                .and_then(|id| self.state.orders.shipment_mut(id))
            {
                shipment.status = ShipmentStatus::Delivered;
            }
        }

        updated.status = request.status;
        updated.updated_at = now;
        self.state.orders.insert_online(updated.clone());

        info!(
            order_id = %updated.id,
            from = order.status.as_str(),
            to = updated.status.as_str(),
            "Online order advanced"
        );
        Ok(Outcome::changed(updated, notifications))
    }

    fn order_deductions(&self, lines: &[OrderLine]) -> CoreResult<Vec<Deduction>> {
        lines
            .iter()
            .map(|line| {
                let product = self.state.inventory.require(&line.product_id)?;
                Ok(Deduction::new(
                    line.product_id.clone(),
                    checked_minor_units(product, line.quantity, line.unit.as_deref())?,
                ))
            })
            .collect()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn add_product(&mut self, product: Product) -> CoreResult<Outcome<Product>> {
        debug!(product_id = %product.id, "Adding product");
        validate_id("id", &product.id)?;
        validate_sku(&product.sku)?;
        validate_name("name", &product.name)?;
        validate_price("price", product.price)?;
        validate_price("cost", product.cost)?;
        validate_price("wholesalePrice", product.wholesale_price)?;
        if let Some(price) = product.major_unit_price {
            validate_price("majorUnitPrice", price)?;
        }
        if let Some(content) = product.unit_content {
            validate_unit_content(content)?;
        }
        validate_stock("stock", product.stock)?;
        validate_min_stock(product.min_stock)?;
        for (branch_id, allocated) in &product.branch_stocks {
            validate_id("branchId", branch_id)?;
            validate_stock("branchStocks", *allocated)?;
            if *allocated > product.stock {
                return Err(CoreError::AllocationExceedsStock {
                    product_id: product.id.clone(),
                    branch_id: branch_id.clone(),
                    allocated: *allocated,
                    stock: product.stock,
                });
            }
        }

        self.state.inventory.insert(product.clone())?;
        info!(product_id = %product.id, stock = product.stock, "Product added");
        Ok(Outcome::changed(product, Vec::new()))
    }

    pub fn add_customer(&mut self, customer: Customer) -> CoreResult<Outcome<Customer>> {
        debug!(customer_id = %customer.id, "Adding customer");
        validate_id("id", &customer.id)?;
        validate_name("name", &customer.name)?;
        if customer.points < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "points".to_string(),
            }
            .into());
        }

        self.state.relations.insert_customer(customer.clone())?;
        info!(customer_id = %customer.id, "Customer added");
        Ok(Outcome::changed(customer, Vec::new()))
    }

    pub fn add_supplier(&mut self, supplier: Supplier) -> CoreResult<Outcome<Supplier>> {
        debug!(supplier_id = %supplier.id, "Adding supplier");
        validate_id("id", &supplier.id)?;
        validate_name("name", &supplier.name)?;

        self.state.relations.insert_supplier(supplier.clone())?;
        info!(supplier_id = %supplier.id, "Supplier added");
        Ok(Outcome::changed(supplier, Vec::new()))
    }

    pub fn define_bom(&mut self, bom: Bom) -> CoreResult<Outcome<Bom>> {
        debug!(bom_id = %bom.id, components = bom.components.len(), "Defining BOM");
        validate_id("id", &bom.id)?;
        validate_name("name", &bom.name)?;
        self.state.inventory.require(&bom.final_product_id)?;
        if bom.components.is_empty() {
            return Err(ValidationError::Required {
                field: "components".to_string(),
            }
            .into());
        }
        for component in &bom.components {
            self.state.inventory.require(&component.product_id)?;
            if component.quantity <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "components.quantity".to_string(),
                }
                .into());
            }
            if component.quantity > MAX_LINE_QUANTITY {
                return Err(ValidationError::too_large("components.quantity", MAX_LINE_QUANTITY).into());
            }
            if component.product_id == bom.final_product_id {
                return Err(ValidationError::InvalidFormat {
                    field: "components".to_string(),
                    reason: "a product cannot be a component of itself".to_string(),
                }
                .into());
            }
        }

        self.state.production.insert_bom(bom.clone())?;
        info!(bom_id = %bom.id, "BOM defined");
        Ok(Outcome::changed(bom, Vec::new()))
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn mark_notifications_read(&mut self) -> Outcome<usize> {
        let marked = self.state.notifications.mark_all_read();
        if marked == 0 {
            Outcome::unchanged(0)
        } else {
            Outcome::changed(marked, Vec::new())
        }
    }
}

fn to_order_lines(lines: Vec<SaleLine>) -> Vec<OrderLine> {
    lines
        .into_iter()
        .map(|line| OrderLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit: line.unit,
            unit_price: line.unit_price,
        })
        .collect()
}

fn generate_tracking_number() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TRK-{}", raw[..12].to_uppercase())
}
