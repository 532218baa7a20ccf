//! # Commands
//!
//! Request payloads for every engine operation, the tagged [`Command`]
//! envelope the shell deserializes, and the [`Effect`] it gets back.
//!
//! ## Wire Shape
//! ```text
//! → {"type":"record_sale","lines":[{"productId":"soap","quantity":2}],
//!    "paymentMethod":"cash"}
//! ← {"type":"sale","data":{"id":"…","total":…}}
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::installments::InstallmentPlan;
use crate::money::Money;
use crate::orders::{OnlineOrder, OnlineStatus, WholesaleOrder};
use crate::production::{Bom, ProductionOrder};
use crate::types::{
    CreditNote, Customer, PaymentMethod, Product, Purchase, Sale, Supplier, SupplierSettlement,
};

// =============================================================================
// Request Payloads
// =============================================================================

/// A requested product on a sale or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    /// Overrides the catalog price of one `unit`.
    #[serde(default)]
    pub unit_price: Option<Money>,
}

impl LineInput {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineInput {
            product_id: product_id.into(),
            quantity,
            unit: None,
            unit_price: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_unit_price(mut self, price: Money) -> Self {
        self.unit_price = Some(price);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub lines: Vec<LineInput>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl SaleRequest {
    pub fn new(lines: Vec<LineInput>, payment_method: PaymentMethod) -> Self {
        SaleRequest {
            lines,
            payment_method,
            customer_id: None,
            branch_id: None,
            note: None,
        }
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn at_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    /// Cost of one `unit`.
    pub unit_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub lines: Vec<PurchaseLineInput>,
    pub payment_method: PaymentMethod,
    /// Defaults to zero for credit and to the full total otherwise.
    #[serde(default)]
    pub paid_amount: Option<Money>,
    /// Branch that receives the goods.
    #[serde(default)]
    pub branch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub product_id: String,
    pub from_branch: String,
    pub to_branch: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditNoteRequest {
    pub invoice_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub amount: Money,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OnlineOrderRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub lines: Vec<LineInput>,
}

/// Target status plus optional shipping details for the `shipped` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub order_id: String,
    pub status: OnlineStatus,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub supplier_id: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
}

/// Result of a stock transfer: the allocations after the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockTransfer {
    pub product_id: String,
    pub from_branch: String,
    pub to_branch: String,
    pub quantity: i64,
    pub from_allocation: i64,
    pub to_allocation: i64,
}

// =============================================================================
// Command Envelope
// =============================================================================

/// Every operation the engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    RecordSale(SaleRequest),
    RecordPurchase(PurchaseRequest),
    TransferStock(TransferRequest),
    #[serde(rename_all = "camelCase")]
    StartProduction { bom_id: String, quantity: i64 },
    #[serde(rename_all = "camelCase")]
    CompleteProduction { order_id: String },
    #[serde(rename_all = "camelCase")]
    PayInstallment { plan_id: String, installment_id: String },
    IssueCreditNote(CreditNoteRequest),
    #[serde(rename_all = "camelCase")]
    SubmitWholesaleOrder { customer_id: String, lines: Vec<LineInput> },
    #[serde(rename_all = "camelCase")]
    ApproveWholesaleOrder { order_id: String },
    #[serde(rename_all = "camelCase")]
    RejectWholesaleOrder { order_id: String },
    PlaceOnlineOrder(OnlineOrderRequest),
    AdvanceOnlineOrder(AdvanceRequest),
    SettleSupplier(SettlementRequest),
    AddProduct(Product),
    AddCustomer(Customer),
    AddSupplier(Supplier),
    DefineBom(Bom),
    MarkNotificationsRead,
}

impl Command {
    /// Stable snake_case name, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RecordSale(_) => "record_sale",
            Command::RecordPurchase(_) => "record_purchase",
            Command::TransferStock(_) => "transfer_stock",
            Command::StartProduction { .. } => "start_production",
            Command::CompleteProduction { .. } => "complete_production",
            Command::PayInstallment { .. } => "pay_installment",
            Command::IssueCreditNote(_) => "issue_credit_note",
            Command::SubmitWholesaleOrder { .. } => "submit_wholesale_order",
            Command::ApproveWholesaleOrder { .. } => "approve_wholesale_order",
            Command::RejectWholesaleOrder { .. } => "reject_wholesale_order",
            Command::PlaceOnlineOrder(_) => "place_online_order",
            Command::AdvanceOnlineOrder(_) => "advance_online_order",
            Command::SettleSupplier(_) => "settle_supplier",
            Command::AddProduct(_) => "add_product",
            Command::AddCustomer(_) => "add_customer",
            Command::AddSupplier(_) => "add_supplier",
            Command::DefineBom(_) => "define_bom",
            Command::MarkNotificationsRead => "mark_notifications_read",
        }
    }
}

/// What an executed command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Effect {
    Sale(Sale),
    Purchase(Purchase),
    Transfer(StockTransfer),
    ProductionOrder(ProductionOrder),
    InstallmentPlan(InstallmentPlan),
    CreditNote(CreditNote),
    WholesaleOrder(WholesaleOrder),
    OnlineOrder(OnlineOrder),
    Settlement(SupplierSettlement),
    Product(Product),
    Customer(Customer),
    Supplier(Supplier),
    Bom(Bom),
    NotificationsRead(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_json() {
        let json = r#"{
            "type": "record_sale",
            "lines": [{"productId": "soap", "quantity": 2, "unit": "box"}],
            "paymentMethod": "credit",
            "customerId": "C1"
        }"#;
        let command: Command = serde_json::from_str(json).unwrap();
        let Command::RecordSale(request) = command else {
            panic!("expected record_sale");
        };
        assert_eq!(request.lines[0], LineInput::new("soap", 2).with_unit("box"));
        assert_eq!(request.payment_method, PaymentMethod::Credit);
        assert_eq!(request.customer_id.as_deref(), Some("C1"));
        assert_eq!(request.branch_id, None);
    }

    #[test]
    fn test_struct_variant_fields_are_camel_case() {
        let json = r#"{"type":"pay_installment","planId":"P","installmentId":"I"}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::PayInstallment {
                plan_id: "P".to_string(),
                installment_id: "I".to_string(),
            }
        );
        assert_eq!(command.name(), "pay_installment");
    }

    #[test]
    fn test_unit_command() {
        let command: Command = serde_json::from_str(r#"{"type":"mark_notifications_read"}"#).unwrap();
        assert_eq!(command, Command::MarkNotificationsRead);
    }

    #[test]
    fn test_effect_is_adjacently_tagged() {
        let json = serde_json::to_value(Effect::NotificationsRead(3)).unwrap();
        assert_eq!(json["type"], "notifications_read");
        assert_eq!(json["data"], 3);
    }
}
