//! # Relational Balances
//!
//! Customer receivables and loyalty, supplier payables.
//!
//! ## Sign Conventions
//! ```text
//! Customer.balance   + = customer owes the store    (credit sale   +total)
//!                                                   (installment   -amount)
//! Supplier.balance   - = store owes the supplier    (purchase  -unpaid part)
//!                                                   (settlement      +amount)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::installments::InstallmentPlan;
use crate::money::Money;
use crate::safe::{CashBook, Transaction, TransactionKind};
use crate::types::{Customer, PaymentMethod, Purchase, Sale, Supplier};

/// Customers and suppliers, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relations {
    customers: BTreeMap<String, Customer>,
    suppliers: BTreeMap<String, Supplier>,
}

impl Relations {
    pub fn insert_customer(&mut self, customer: Customer) -> CoreResult<()> {
        if self.customers.contains_key(&customer.id) {
            return Err(CoreError::Duplicate {
                kind: "customer".to_string(),
                id: customer.id,
            });
        }
        self.customers.insert(customer.id.clone(), customer);
        Ok(())
    }

    pub fn insert_supplier(&mut self, supplier: Supplier) -> CoreResult<()> {
        if self.suppliers.contains_key(&supplier.id) {
            return Err(CoreError::Duplicate {
                kind: "supplier".to_string(),
                id: supplier.id,
            });
        }
        self.suppliers.insert(supplier.id.clone(), supplier);
        Ok(())
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.get(id)
    }

    pub fn supplier(&self, id: &str) -> Option<&Supplier> {
        self.suppliers.get(id)
    }

    pub fn require_customer(&self, id: &str) -> CoreResult<&Customer> {
        self.customers
            .get(id)
            .ok_or_else(|| CoreError::missing("customer", id))
    }

    pub fn require_supplier(&self, id: &str) -> CoreResult<&Supplier> {
        self.suppliers
            .get(id)
            .ok_or_else(|| CoreError::missing("supplier", id))
    }

    fn customer_mut(&mut self, id: &str) -> CoreResult<&mut Customer> {
        self.customers
            .get_mut(id)
            .ok_or_else(|| CoreError::missing("customer", id))
    }

    fn supplier_mut(&mut self, id: &str) -> CoreResult<&mut Supplier> {
        self.suppliers
            .get_mut(id)
            .ok_or_else(|| CoreError::missing("supplier", id))
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn suppliers(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }

    /// Credits a sale to the customer's account.
    ///
    /// Credit sales raise the receivable. Every sale earns
    /// `floor(total)` loyalty points and counts toward `total_spent`.
    pub fn apply_sale_to_customer(&mut self, customer_id: &str, sale: &Sale) -> CoreResult<()> {
        let customer = self.customer_mut(customer_id)?;
        if sale.payment_method.is_credit() {
            customer.balance += sale.total;
        }
        customer.points += sale.total.whole_units().max(0);
        customer.total_spent += sale.total;
        customer.last_purchase = Some(sale.date);
        Ok(())
    }

    /// Grows the payable by whatever part of the purchase was not paid up
    /// front. A credit purchase with nothing paid owes its full total.
    pub fn apply_purchase_to_supplier(&mut self, supplier_id: &str, purchase: &Purchase) -> CoreResult<()> {
        let supplier = self.supplier_mut(supplier_id)?;
        supplier.balance -= purchase.unpaid_amount();
        Ok(())
    }

    /// Moves a supplier payable toward zero by `amount`.
    pub fn settle_supplier(&mut self, supplier_id: &str, amount: Money) -> CoreResult<()> {
        self.supplier_mut(supplier_id)?.balance += amount;
        Ok(())
    }
}

/// Posts a credit-note refund as cash leaving the safe.
///
/// Credit notes are store-level refunds: no customer balance changes here.
pub fn apply_credit_note(
    book: &mut CashBook,
    invoice_id: &str,
    amount: Money,
    date: DateTime<Utc>,
) -> Transaction {
    book.post(
        TransactionKind::Out,
        amount,
        PaymentMethod::Cash,
        format!("Credit note for invoice {}", invoice_id),
        date,
    )
}

/// Collects a pending installment in cash.
///
/// Pending → paid, plan remaining and customer receivable drop by the
/// installment amount, the cash is posted to the safe. Returns `None` when
/// the installment was already paid; nothing changes in that case.
pub fn apply_installment_payment(
    plan: &mut InstallmentPlan,
    installment_id: &str,
    relations: &mut Relations,
    book: &mut CashBook,
    date: DateTime<Utc>,
) -> CoreResult<Option<Transaction>> {
    relations.require_customer(&plan.customer_id)?;

    let Some(amount) = plan.pay(installment_id, date)? else {
        return Ok(None);
    };

    relations.customer_mut(&plan.customer_id)?.balance -= amount;
    let transaction = book.post(
        TransactionKind::In,
        amount,
        PaymentMethod::Cash,
        format!("Installment payment ({})", plan.id),
        date,
    );
    Ok(Some(transaction))
}
