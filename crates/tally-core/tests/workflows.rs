//! End-to-end flows for orders, production, credit notes and settlements.

use tally_core::command::{
    AdvanceRequest, Command, CreditNoteRequest, Effect, LineInput, OnlineOrderRequest,
    SettlementRequest,
};
use tally_core::orders::{OnlineStatus, ShipmentStatus, WholesaleStatus};
use tally_core::production::{Bom, BomComponent, ProductionStatus};
use tally_core::{
    CoreError, Customer, Engine, EngineConfig, Money, NotificationLevel, PaymentMethod, Product,
    Supplier, ValidationError,
};

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_product(
            Product::new("rice", "RICE-1", "Rice 1kg", Money::from_major(3))
                .with_wholesale_price(Money::from_cents(250))
                .with_major_unit("sack", 25)
                .with_stock(200)
                .with_min_stock(20),
        )
        .unwrap();
    engine
        .add_product(Product::new("oil", "OIL-1", "Oil 1L", Money::from_major(8)).with_stock(10))
        .unwrap();
    engine.add_customer(Customer::new("C1", "Amal")).unwrap();
    engine.add_supplier(Supplier::new("S1", "Mill Co")).unwrap();
    engine
}

fn place(engine: &mut Engine, lines: Vec<LineInput>) -> String {
    engine
        .place_online_order(OnlineOrderRequest {
            customer_id: None,
            customer_name: "Walk-in web".to_string(),
            lines,
        })
        .unwrap()
        .value
        .id
}

fn advance(engine: &mut Engine, order_id: &str, status: OnlineStatus) -> Result<(), CoreError> {
    engine
        .advance_online_order(AdvanceRequest {
            order_id: order_id.to_string(),
            status,
            carrier: None,
            tracking_number: None,
        })
        .map(|_| ())
}

// =============================================================================
// Wholesale
// =============================================================================

#[test]
fn wholesale_approval_books_a_credit_sale_at_wholesale_price() {
    let mut engine = engine();
    let order = engine
        .submit_wholesale_order("C1", &[LineInput::new("rice", 2).with_unit("sack")])
        .unwrap()
        .value;
    assert_eq!(order.total, Money::from_major(125));
    assert_eq!(engine.inventory().get("rice").unwrap().stock, 200);

    let approved = engine.approve_wholesale_order(&order.id).unwrap();

    assert!(approved.changed);
    assert_eq!(approved.value.status, WholesaleStatus::Approved);
    assert_eq!(engine.inventory().get("rice").unwrap().stock, 150);
    assert_eq!(engine.relations().customer("C1").unwrap().balance, Money::from_major(125));
    assert_eq!(engine.installments().for_customer("C1").count(), 1);
    assert!(approved.value.sale_id.is_some());
}

#[test]
fn approving_a_non_pending_order_is_a_no_op() {
    let mut engine = engine();
    let order = engine
        .submit_wholesale_order("C1", &[LineInput::new("oil", 1)])
        .unwrap()
        .value;
    engine.approve_wholesale_order(&order.id).unwrap();
    let approved = engine.orders().wholesale(&order.id).unwrap().clone();
    let state = engine.state().clone();

    let again = engine.approve_wholesale_order(&order.id).unwrap();

    assert!(!again.changed);
    assert_eq!(again.value, approved);
    assert_eq!(engine.state(), &state);

    let rejected = engine.reject_wholesale_order(&order.id).unwrap();
    assert!(!rejected.changed);
    assert_eq!(rejected.value.status, WholesaleStatus::Approved);
}

#[test]
fn rejected_wholesale_sale_keeps_order_pending() {
    let mut engine = engine();
    let order = engine
        .submit_wholesale_order("C1", &[LineInput::new("oil", 11)])
        .unwrap()
        .value;

    let err = engine.approve_wholesale_order(&order.id).unwrap_err();

    assert!(matches!(err, CoreError::InsufficientStock { .. }));
    let stored = engine.orders().wholesale(&order.id).unwrap();
    assert_eq!(stored.status, WholesaleStatus::PendingApproval);
    assert!(stored.sale_id.is_none());
    assert!(engine.state().sales.is_empty());
}

// =============================================================================
// Online
// =============================================================================

#[test]
fn online_order_full_lifecycle() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 4)]);
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 10);

    advance(&mut engine, &order_id, OnlineStatus::Processing).unwrap();
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 6);

    advance(&mut engine, &order_id, OnlineStatus::Shipped).unwrap();
    let order = engine.orders().online(&order_id).unwrap().clone();
    let shipment_id = order.shipment_id.clone().unwrap();
    let shipment = engine.orders().shipment(&shipment_id).unwrap();
    assert_eq!(shipment.status, ShipmentStatus::InTransit);
    assert!(shipment.tracking_number.starts_with("TRK-"));

    advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap();
    assert_eq!(engine.cash_book().balance().card, Money::from_major(32));
    assert_eq!(
        engine.orders().shipment(&shipment_id).unwrap().status,
        ShipmentStatus::Delivered
    );
    assert_eq!(engine.orders().online(&order_id).unwrap().status, OnlineStatus::Delivered);
}

#[test]
fn cancelling_a_processing_order_restocks() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("rice", 1).with_unit("sack")]);
    advance(&mut engine, &order_id, OnlineStatus::Processing).unwrap();
    assert_eq!(engine.inventory().get("rice").unwrap().stock, 175);

    advance(&mut engine, &order_id, OnlineStatus::Cancelled).unwrap();

    assert_eq!(engine.inventory().get("rice").unwrap().stock, 200);
    assert_eq!(engine.orders().online(&order_id).unwrap().status, OnlineStatus::Cancelled);
}

#[test]
fn shipping_a_pending_order_takes_the_stock() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 4)]);

    advance(&mut engine, &order_id, OnlineStatus::Shipped).unwrap();

    let order = engine.orders().online(&order_id).unwrap();
    assert_eq!(order.status, OnlineStatus::Shipped);
    assert!(order.shipment_id.is_some());
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 6);

    advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap();
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 6);
    assert_eq!(engine.cash_book().balance().card, Money::from_major(32));
}

#[test]
fn delivering_a_pending_order_takes_stock_and_payment() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 2)]);

    advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap();

    let order = engine.orders().online(&order_id).unwrap();
    assert_eq!(order.status, OnlineStatus::Delivered);
    assert!(order.shipment_id.is_none());
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 8);
    assert_eq!(engine.cash_book().balance().card, Money::from_major(16));
}

#[test]
fn delivering_a_processing_order_does_not_deduct_twice() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 3)]);
    advance(&mut engine, &order_id, OnlineStatus::Processing).unwrap();
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 7);

    advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap();

    assert_eq!(engine.inventory().get("oil").unwrap().stock, 7);
    assert_eq!(engine.cash_book().balance().card, Money::from_major(24));
    assert_eq!(engine.orders().online(&order_id).unwrap().status, OnlineStatus::Delivered);
}

#[test]
fn skipping_processing_without_stock_changes_nothing() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 11)]);
    let before = engine.state().clone();

    let err = advance(&mut engine, &order_id, OnlineStatus::Shipped).unwrap_err();

    assert!(matches!(err, CoreError::InsufficientStock { .. }));
    assert_eq!(engine.state(), &before);
}

#[test]
fn repeating_or_reversing_a_state_is_an_invalid_transition() {
    let mut engine = engine();
    let order_id = place(&mut engine, vec![LineInput::new("oil", 1)]);
    advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap();
    let before = engine.state().clone();

    let err = advance(&mut engine, &order_id, OnlineStatus::Delivered).unwrap_err();
    assert_eq!(
        err,
        CoreError::InvalidTransition {
            entity: "online order".to_string(),
            from: "delivered".to_string(),
            to: "delivered".to_string(),
        }
    );
    assert!(advance(&mut engine, &order_id, OnlineStatus::Shipped).is_err());
    assert_eq!(engine.state(), &before);
}

#[test]
fn processing_without_stock_changes_nothing() {
    let mut engine = engine();
    let order_id = place(
        &mut engine,
        vec![LineInput::new("rice", 2), LineInput::new("oil", 11)],
    );
    let before = engine.state().clone();

    let err = advance(&mut engine, &order_id, OnlineStatus::Processing).unwrap_err();

    assert!(matches!(err, CoreError::InsufficientStock { .. }));
    assert_eq!(engine.state(), &before);
}

// =============================================================================
// Production
// =============================================================================

#[test]
fn production_consumes_then_produces_once() {
    let mut engine = engine();
    engine
        .add_product(Product::new("kit", "KIT-1", "Cooking kit", Money::from_major(40)))
        .unwrap();
    engine
        .define_bom(Bom {
            id: "B-kit".to_string(),
            name: "Cooking kit".to_string(),
            final_product_id: "kit".to_string(),
            components: vec![
                BomComponent {
                    product_id: "rice".to_string(),
                    quantity: 5,
                },
                BomComponent {
                    product_id: "oil".to_string(),
                    quantity: 1,
                },
            ],
        })
        .unwrap();

    let started = engine.start_production("B-kit", 10).unwrap();
    assert_eq!(started.value.status, ProductionStatus::InProgress);
    assert_eq!(engine.inventory().get("rice").unwrap().stock, 150);
    assert_eq!(engine.inventory().get("oil").unwrap().stock, 0);
    // oil hit its minimum of 0
    assert_eq!(started.notifications.len(), 1);
    assert_eq!(started.notifications[0].level, NotificationLevel::Warning);

    let order_id = started.value.id;
    let completed = engine.complete_production(&order_id).unwrap();
    assert!(completed.changed);
    assert_eq!(completed.value.status, ProductionStatus::Completed);
    assert_eq!(engine.inventory().get("kit").unwrap().stock, 10);

    let again = engine.complete_production(&order_id).unwrap();
    assert!(!again.changed);
    assert_eq!(engine.inventory().get("kit").unwrap().stock, 10);
}

#[test]
fn bom_cannot_contain_its_own_product() {
    let mut engine = engine();
    let err = engine
        .define_bom(Bom {
            id: "B-loop".to_string(),
            name: "Loop".to_string(),
            final_product_id: "rice".to_string(),
            components: vec![BomComponent {
                product_id: "rice".to_string(),
                quantity: 1,
            }],
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::InvalidFormat { .. })));
}

// =============================================================================
// Credit Notes & Settlements
// =============================================================================

#[test]
fn credit_note_is_a_cash_refund_that_leaves_the_receivable() {
    let mut engine = engine();
    engine
        .record_sale(
            tally_core::command::SaleRequest::new(vec![LineInput::new("oil", 2)], PaymentMethod::Credit)
                .for_customer("C1"),
        )
        .unwrap();

    let note = engine
        .issue_credit_note(CreditNoteRequest {
            invoice_id: "INV-1".to_string(),
            customer_id: Some("C1".to_string()),
            amount: Money::from_major(5),
            reason: "Damaged bottle".to_string(),
        })
        .unwrap()
        .value;

    assert_eq!(note.customer_id.as_deref(), Some("C1"));
    assert_eq!(engine.cash_book().balance().cash, Money::from_major(-5));
    assert_eq!(engine.relations().customer("C1").unwrap().balance, Money::from_major(16));
}

#[test]
fn credit_note_needs_a_positive_amount() {
    let mut engine = engine();
    let err = engine
        .issue_credit_note(CreditNoteRequest {
            invoice_id: "INV-1".to_string(),
            customer_id: None,
            amount: Money::zero(),
            reason: String::new(),
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::MustBePositive { .. })));
    assert!(engine.cash_book().transactions().is_empty());
}

#[test]
fn settlement_reduces_the_payable() {
    let mut engine = engine();
    let purchase = Command::RecordPurchase(tally_core::command::PurchaseRequest {
        supplier_id: Some("S1".to_string()),
        lines: vec![tally_core::command::PurchaseLineInput {
            product_id: "rice".to_string(),
            quantity: 4,
            unit: Some("sack".to_string()),
            unit_cost: Money::from_major(50),
        }],
        payment_method: PaymentMethod::Credit,
        paid_amount: None,
        branch_id: None,
    });
    engine.execute(purchase).unwrap();
    assert_eq!(engine.relations().supplier("S1").unwrap().amount_owed(), Money::from_major(200));
    assert_eq!(engine.inventory().get("rice").unwrap().cost, Money::from_major(2));

    let outcome = engine
        .execute(Command::SettleSupplier(SettlementRequest {
            supplier_id: "S1".to_string(),
            amount: Money::from_major(120),
            payment_method: PaymentMethod::Cash,
        }))
        .unwrap();

    assert!(matches!(outcome.value, Effect::Settlement(_)));
    assert_eq!(engine.relations().supplier("S1").unwrap().amount_owed(), Money::from_major(80));
    assert_eq!(engine.cash_book().balance().cash, Money::from_major(-120));
}

#[test]
fn settling_on_credit_is_rejected() {
    let mut engine = engine();
    let err = engine
        .settle_supplier(SettlementRequest {
            supplier_id: "S1".to_string(),
            amount: Money::from_major(1),
            payment_method: PaymentMethod::Credit,
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn notifications_can_be_marked_read() {
    let mut engine = engine();
    engine
        .record_sale(tally_core::command::SaleRequest::new(
            vec![LineInput::new("oil", 10)],
            PaymentMethod::Cash,
        ))
        .unwrap();
    assert_eq!(engine.notifications().unread().count(), 1);

    let marked = engine.mark_notifications_read();
    assert!(marked.changed);
    assert_eq!(marked.value, 1);
    assert!(!engine.mark_notifications_read().changed);
}
