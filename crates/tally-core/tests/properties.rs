//! Cross-aggregate invariants exercised through the public engine API.

use chrono::Duration;
use proptest::prelude::*;
use proptest::test_runner::Config;
use tally_core::command::{
    CreditNoteRequest, LineInput, PurchaseLineInput, PurchaseRequest, SaleRequest, TransferRequest,
};
use tally_core::installments::{InstallmentPolicy, InstallmentStatus};
use tally_core::production::{Bom, BomComponent};
use tally_core::safe::TransactionKind;
use tally_core::{
    CoreError, Customer, Engine, EngineConfig, Money, NotificationLevel, PaymentMethod, Product,
    Supplier,
};

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_product(
            Product::new("P", "P-1", "Paint", Money::from_major(10))
                .with_stock(12)
                .with_min_stock(5),
        )
        .unwrap();
    engine
        .add_product(Product::new("A", "A-1", "Pigment", Money::from_major(1)).with_stock(15))
        .unwrap();
    engine
        .add_product(Product::new("F", "F-1", "Finished", Money::from_major(50)))
        .unwrap();
    engine.add_customer(Customer::new("C1", "Amal")).unwrap();
    engine.add_supplier(Supplier::new("S1", "Mill Co")).unwrap();
    engine
}

fn sell(engine: &mut Engine, product_id: &str, quantity: i64) -> Result<(), CoreError> {
    engine
        .record_sale(SaleRequest::new(
            vec![LineInput::new(product_id, quantity)],
            PaymentMethod::Cash,
        ))
        .map(|_| ())
}

fn transfer(engine: &mut Engine, from: &str, to: &str, quantity: i64) -> Result<(), CoreError> {
    engine
        .transfer_stock(TransferRequest {
            product_id: "P".to_string(),
            from_branch: from.to_string(),
            to_branch: to.to_string(),
            quantity,
        })
        .map(|_| ())
}

fn purchase(engine: &mut Engine, product_id: &str, quantity: i64, method: PaymentMethod) -> Result<(), CoreError> {
    engine
        .record_purchase(PurchaseRequest {
            supplier_id: Some("S1".to_string()),
            lines: vec![PurchaseLineInput {
                product_id: product_id.to_string(),
                quantity,
                unit: None,
                unit_cost: Money::from_major(4),
            }],
            payment_method: method,
            paid_amount: None,
            branch_id: None,
        })
        .map(|_| ())
}

const BRANCHES: [&str; 3] = ["main", "north", "south"];

#[derive(Debug, Clone)]
enum StockOp {
    Sell(i64),
    Purchase(i64),
    Transfer { from: usize, to: usize, quantity: i64 },
}

fn stock_op() -> impl Strategy<Value = StockOp> {
    prop_oneof![
        (1_i64..10).prop_map(StockOp::Sell),
        (1_i64..10).prop_map(StockOp::Purchase),
        (0_usize..3, 0_usize..3, 1_i64..10)
            .prop_map(|(from, to, quantity)| StockOp::Transfer { from, to, quantity }),
    ]
}

fn payment_method() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Card),
        Just(PaymentMethod::Credit),
        Just(PaymentMethod::Transfer),
    ]
}

#[derive(Debug, Clone)]
enum MoneyOp {
    Sell { quantity: i64, method: PaymentMethod, customer: bool },
    Purchase { quantity: i64, method: PaymentMethod },
    Refund(i64),
}

fn money_op() -> impl Strategy<Value = MoneyOp> {
    prop_oneof![
        (1_i64..4, payment_method(), any::<bool>())
            .prop_map(|(quantity, method, customer)| MoneyOp::Sell { quantity, method, customer }),
        (1_i64..6, payment_method()).prop_map(|(quantity, method)| MoneyOp::Purchase { quantity, method }),
        (1_i64..5_000).prop_map(MoneyOp::Refund),
    ]
}

fn signed_sum(engine: &Engine, method: PaymentMethod) -> Money {
    engine
        .cash_book()
        .transactions()
        .iter()
        .filter(|t| t.payment_method == method)
        .map(|t| match t.kind {
            TransactionKind::In => t.amount,
            TransactionKind::Out => -t.amount,
        })
        .sum()
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn stock_never_goes_negative(ops in proptest::collection::vec(stock_op(), 1..120)) {
        let mut engine = engine();

        for op in ops {
            let _ = match op {
                StockOp::Sell(quantity) => sell(&mut engine, "P", quantity),
                StockOp::Purchase(quantity) => purchase(&mut engine, "P", quantity, PaymentMethod::Credit),
                StockOp::Transfer { from, to, quantity } => {
                    transfer(&mut engine, BRANCHES[from], BRANCHES[to], quantity)
                }
            };

            let paint = engine.inventory().get("P").unwrap();
            prop_assert!(paint.stock >= 0);
            for allocated in paint.branch_stocks.values() {
                prop_assert!(*allocated >= 0);
                prop_assert!(*allocated <= paint.stock);
            }
        }
    }

    #[test]
    fn safe_balances_equal_ledger_sums(ops in proptest::collection::vec(money_op(), 1..60)) {
        let mut engine = engine();

        for op in ops {
            let _ = match op {
                MoneyOp::Sell { quantity, method, customer } => {
                    let request = SaleRequest::new(vec![LineInput::new("A", quantity)], method);
                    let request = if customer { request.for_customer("C1") } else { request };
                    engine.record_sale(request).map(|_| ())
                }
                MoneyOp::Purchase { quantity, method } => purchase(&mut engine, "A", quantity, method),
                MoneyOp::Refund(cents) => engine
                    .issue_credit_note(CreditNoteRequest {
                        invoice_id: "INV-1".to_string(),
                        customer_id: None,
                        amount: Money::from_cents(cents),
                        reason: String::new(),
                    })
                    .map(|_| ()),
            };

            let balance = engine.cash_book().balance();
            prop_assert_eq!(balance.cash, signed_sum(&engine, PaymentMethod::Cash));
            prop_assert_eq!(balance.card, signed_sum(&engine, PaymentMethod::Card));
            prop_assert!(engine.cash_book().reconcile().is_ok());
        }
    }

    #[test]
    fn plan_remaining_always_matches_pending(
        count in 1_u32..7,
        unit_price in 1_i64..100_000,
        quantity in 1_i64..12,
        payments in proptest::collection::vec(0_usize..7, 0..12),
    ) {
        let config = EngineConfig {
            installment_policy: InstallmentPolicy { count, interval_days: 30 },
            ..EngineConfig::default()
        };
        let mut engine = Engine::from_state(engine().into_state(), config);
        let sale = engine
            .record_sale(
                SaleRequest::new(
                    vec![LineInput::new("P", quantity).with_unit_price(Money::from_cents(unit_price))],
                    PaymentMethod::Credit,
                )
                .for_customer("C1"),
            )
            .unwrap()
            .value;
        let plan_id = sale.installment_plan_id.unwrap();

        let plan = engine.installments().get(&plan_id).unwrap().clone();
        prop_assert_eq!(plan.installments.len(), count as usize);
        prop_assert_eq!(plan.pending_total(), plan.remaining_amount);
        prop_assert_eq!(plan.remaining_amount, sale.total);

        for index in payments {
            let Some(installment) = plan.installments.get(index) else {
                continue;
            };
            engine.pay_installment(&plan_id, &installment.id).unwrap();

            let current = engine.installments().get(&plan_id).unwrap();
            prop_assert_eq!(current.pending_total(), current.remaining_amount);
            prop_assert_eq!(
                engine.relations().customer("C1").unwrap().balance,
                current.remaining_amount
            );
        }
    }
}

#[test]
fn mixed_methods_land_in_their_own_balance() {
    let mut engine = engine();
    sell(&mut engine, "P", 2).unwrap();
    engine
        .record_sale(SaleRequest::new(vec![LineInput::new("A", 3)], PaymentMethod::Card))
        .unwrap();
    engine
        .record_sale(
            SaleRequest::new(vec![LineInput::new("A", 1)], PaymentMethod::Credit).for_customer("C1"),
        )
        .unwrap();
    purchase(&mut engine, "A", 5, PaymentMethod::Card).unwrap();

    // the card purchase (5 x 4.00) still leaves the drawer as cash
    let balance = engine.cash_book().balance();
    assert_eq!(balance.cash, Money::zero());
    assert_eq!(balance.card, Money::from_major(3));
}

#[test]
fn transfer_there_and_back_restores_allocations() {
    let mut engine = engine();
    let main_before = engine.inventory().allocation("P", "main", "main").unwrap();
    let north_before = engine.inventory().allocation("P", "north", "main").unwrap();

    transfer(&mut engine, "main", "north", 5).unwrap();
    transfer(&mut engine, "north", "main", 5).unwrap();

    assert_eq!(engine.inventory().allocation("P", "main", "main").unwrap(), main_before);
    assert_eq!(engine.inventory().allocation("P", "north", "main").unwrap(), north_before);
}

#[test]
fn rejected_transfer_changes_nothing() {
    let mut engine = engine();
    let before = engine.state().clone();

    let err = transfer(&mut engine, "north", "main", 1).unwrap_err();

    assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
    assert_eq!(engine.state(), &before);
}

#[test]
fn plan_remaining_matches_pending_installments() {
    let config = EngineConfig {
        installment_policy: tally_core::installments::InstallmentPolicy {
            count: 3,
            interval_days: 30,
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::from_state(engine().into_state(), config);
    let sale = engine
        .record_sale(
            SaleRequest::new(
                vec![LineInput::new("P", 10).with_unit_price(Money::from_major(100))],
                PaymentMethod::Credit,
            )
            .for_customer("C1"),
        )
        .unwrap()
        .value;

    let plan_id = sale.installment_plan_id.unwrap();
    let plan = engine.installments().get(&plan_id).unwrap().clone();
    assert_eq!(plan.pending_total(), plan.remaining_amount);

    engine.pay_installment(&plan_id, &plan.installments[1].id).unwrap();
    let plan = engine.installments().get(&plan_id).unwrap();
    assert_eq!(plan.pending_total(), plan.remaining_amount);
    assert_eq!(plan.remaining_amount, Money::from_cents(66_667));
}

#[test]
fn paying_an_installment_twice_counts_once() {
    let mut engine = engine();
    let sale = engine
        .record_sale(
            SaleRequest::new(vec![LineInput::new("P", 3)], PaymentMethod::Credit).for_customer("C1"),
        )
        .unwrap()
        .value;
    let plan_id = sale.installment_plan_id.unwrap();
    let installment_id = engine.installments().get(&plan_id).unwrap().installments[0].id.clone();

    let first = engine.pay_installment(&plan_id, &installment_id).unwrap();
    let ledger_len = engine.cash_book().transactions().len();
    let second = engine.pay_installment(&plan_id, &installment_id).unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(engine.cash_book().transactions().len(), ledger_len);
    assert_eq!(engine.cash_book().balance().cash, Money::from_major(30));
    assert_eq!(engine.relations().customer("C1").unwrap().balance, Money::zero());
    assert_eq!(second.value.remaining_amount, Money::zero());
}

#[test]
fn low_stock_alert_fires_on_every_decrease() {
    let mut engine = engine();

    let outcome = engine
        .record_sale(SaleRequest::new(vec![LineInput::new("P", 8)], PaymentMethod::Cash))
        .unwrap();
    assert_eq!(engine.inventory().get("P").unwrap().stock, 4);
    let warnings: Vec<_> = outcome
        .notifications
        .iter()
        .filter(|n| n.level == NotificationLevel::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Paint"));

    let outcome = engine
        .record_sale(SaleRequest::new(vec![LineInput::new("P", 1)], PaymentMethod::Cash))
        .unwrap();
    assert_eq!(outcome.notifications.len(), 1);
    assert_eq!(engine.notifications().all().len(), 2);
}

#[test]
fn production_short_on_components_is_rejected() {
    let mut engine = engine();
    engine
        .define_bom(Bom {
            id: "B1".to_string(),
            name: "Finished goods".to_string(),
            final_product_id: "F".to_string(),
            components: vec![BomComponent {
                product_id: "A".to_string(),
                quantity: 2,
            }],
        })
        .unwrap();

    let err = engine.start_production("B1", 10).unwrap_err();

    assert_eq!(
        err,
        CoreError::InsufficientStock {
            product_id: "A".to_string(),
            requested: 20,
            available: 15,
        }
    );
    assert_eq!(engine.inventory().get("A").unwrap().stock, 15);
    assert_eq!(engine.production().orders().count(), 0);
}

#[test]
fn credit_sale_creates_receivable_and_plan() {
    let mut engine = engine();
    let sale = engine
        .record_sale(
            SaleRequest::new(
                vec![LineInput::new("P", 10).with_unit_price(Money::from_major(100))],
                PaymentMethod::Credit,
            )
            .for_customer("C1"),
        )
        .unwrap()
        .value;

    assert_eq!(sale.total, Money::from_major(1000));
    let customer = engine.relations().customer("C1").unwrap();
    assert_eq!(customer.balance, Money::from_major(1000));
    assert_eq!(customer.points, 1000);

    let plans: Vec<_> = engine.installments().for_customer("C1").collect();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].remaining_amount, Money::from_major(1000));
    assert_eq!(plans[0].installments.len(), 1);
    let installment = &plans[0].installments[0];
    assert_eq!(installment.amount, Money::from_major(1000));
    assert_eq!(installment.status, InstallmentStatus::Pending);
    assert_eq!(installment.due_date - sale.date, Duration::days(30));

    let balance = engine.cash_book().balance();
    assert_eq!(balance.cash, Money::zero());
    assert_eq!(balance.card, Money::zero());
}

#[test]
fn credit_sale_without_customer_creates_no_plan() {
    let mut engine = engine();
    let sale = engine
        .record_sale(SaleRequest::new(vec![LineInput::new("P", 1)], PaymentMethod::Credit))
        .unwrap()
        .value;

    assert!(sale.installment_plan_id.is_none());
    assert_eq!(engine.installments().plans().count(), 0);
    assert_eq!(engine.cash_book().transactions().len(), 1);
    assert_eq!(engine.cash_book().balance().cash, Money::zero());
}

#[test]
fn short_second_line_leaves_everything_untouched() {
    let mut engine = engine();
    let before = engine.state().clone();

    let err = engine
        .record_sale(
            SaleRequest::new(
                vec![LineInput::new("A", 2), LineInput::new("P", 13)],
                PaymentMethod::Credit,
            )
            .for_customer("C1"),
        )
        .unwrap_err();

    assert!(matches!(err, CoreError::InsufficientStock { .. }));
    assert_eq!(engine.inventory().get("A").unwrap().stock, 15);
    assert_eq!(engine.state(), &before);
}

#[test]
fn lines_for_the_same_product_are_checked_together() {
    let mut engine = engine();
    let err = engine
        .record_sale(SaleRequest::new(
            vec![LineInput::new("P", 7), LineInput::new("P", 6)],
            PaymentMethod::Cash,
        ))
        .unwrap_err();

    assert_eq!(
        err,
        CoreError::InsufficientStock {
            product_id: "P".to_string(),
            requested: 13,
            available: 12,
        }
    );
}

#[test]
fn unknown_product_is_a_missing_reference() {
    let mut engine = engine();
    let err = sell(&mut engine, "ghost", 1).unwrap_err();
    assert_eq!(err, CoreError::missing("product", "ghost"));
}
