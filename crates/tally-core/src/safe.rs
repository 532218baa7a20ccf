//! # Safe & Transaction Log
//!
//! The safe holds two running balances, `cash` and `card`. They are never
//! written directly: every money movement is posted as an immutable
//! [`Transaction`] and the matching balance moves with it.
//!
//! ```text
//! post(in,  120.00, cash)     → ledger += T1, cash += 120.00
//! post(out,  40.00, card)     → ledger += T2, card -=  40.00
//! post(in,  900.00, credit)   → ledger += T3  (no balance moves)
//! ```
//!
//! A credit sale is recognized revenue but not collected cash, so it shows up
//! in the ledger only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::types::PaymentMethod;

/// Direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    In,
    Out,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub description: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    /// Always ≥ 0; direction comes from `kind`.
    pub amount: Money,
}

impl Transaction {
    /// `+amount` for incoming, `-amount` for outgoing.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::In => self.amount,
            TransactionKind::Out => -self.amount,
        }
    }
}

/// The cash/card running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SafeBalance {
    pub cash: Money,
    pub card: Money,
}

impl SafeBalance {
    pub fn total(&self) -> Money {
        self.cash + self.card
    }
}

/// Safe balances disagree with the ledger they are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileMismatch {
    pub recorded: SafeBalance,
    pub expected: SafeBalance,
}

/// The safe plus the append-only ledger that drives it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBook {
    balance: SafeBalance,
    transactions: Vec<Transaction>,
}

impl CashBook {
    pub fn new() -> Self {
        CashBook::default()
    }

    /// Opens the book with starting balances, each recorded as an opening
    /// ledger entry so the balances stay derivable from the log.
    pub fn with_opening_balance(cash: Money, card: Money, date: DateTime<Utc>) -> Self {
        let mut book = CashBook::new();
        for (amount, method) in [(cash, PaymentMethod::Cash), (card, PaymentMethod::Card)] {
            if amount.is_positive() {
                book.post(TransactionKind::In, amount, method, "Opening balance", date);
            }
        }
        book
    }

    pub fn balance(&self) -> SafeBalance {
        self.balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, transaction_id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == transaction_id)
    }

    /// Appends a ledger entry and moves the matching balance.
    ///
    /// `amount` is expected to be ≥ 0; callers validate it. Methods other
    /// than cash and card only append.
    pub fn post(
        &mut self,
        kind: TransactionKind,
        amount: Money,
        payment_method: PaymentMethod,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            kind,
            description: description.into(),
            date,
            payment_method,
            amount,
        };

        let signed = transaction.signed_amount();
        match payment_method {
            PaymentMethod::Cash => self.balance.cash += signed,
            PaymentMethod::Card => self.balance.card += signed,
            PaymentMethod::Credit | PaymentMethod::Transfer => {}
        }

        debug!(
            id = %transaction.id,
            kind = ?kind,
            method = payment_method.as_str(),
            amount = %amount,
            "Transaction posted"
        );

        self.transactions.push(transaction.clone());
        transaction
    }

    /// Signed sum of all entries posted with `method`.
    pub fn net_for(&self, method: PaymentMethod) -> Money {
        self.transactions
            .iter()
            .filter(|t| t.payment_method == method)
            .map(Transaction::signed_amount)
            .sum()
    }

    /// Sum of `kind` entries dated within `[from, to)`.
    pub fn total_between(&self, kind: TransactionKind, from: DateTime<Utc>, to: DateTime<Utc>) -> Money {
        self.transactions
            .iter()
            .filter(|t| t.kind == kind && t.date >= from && t.date < to)
            .map(|t| t.amount)
            .sum()
    }

    /// Recomputes the balances from the ledger.
    pub fn reconcile(&self) -> Result<(), ReconcileMismatch> {
        let expected = SafeBalance {
            cash: self.net_for(PaymentMethod::Cash),
            card: self.net_for(PaymentMethod::Card),
        };
        if expected == self.balance {
            Ok(())
        } else {
            Err(ReconcileMismatch {
                recorded: self.balance,
                expected,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cash_and_card_move_separately() {
        let mut book = CashBook::new();
        let now = Utc::now();

        book.post(TransactionKind::In, Money::from_major(120), PaymentMethod::Cash, "Sale", now);
        book.post(TransactionKind::Out, Money::from_major(40), PaymentMethod::Card, "Refund", now);

        assert_eq!(book.balance().cash, Money::from_major(120));
        assert_eq!(book.balance().card, Money::from_major(-40));
        assert_eq!(book.transactions().len(), 2);
    }

    #[test]
    fn test_credit_and_transfer_only_append() {
        let mut book = CashBook::new();
        let now = Utc::now();

        let t = book.post(TransactionKind::In, Money::from_major(900), PaymentMethod::Credit, "Credit sale", now);
        book.post(TransactionKind::Out, Money::from_major(50), PaymentMethod::Transfer, "Wire", now);

        assert_eq!(book.balance(), SafeBalance::default());
        assert_eq!(book.transactions().len(), 2);
        assert_eq!(book.get(&t.id), Some(&t));
    }

    #[test]
    fn test_reconcile() {
        let mut book = CashBook::with_opening_balance(Money::from_major(100), Money::zero(), Utc::now());
        book.post(TransactionKind::Out, Money::from_major(30), PaymentMethod::Cash, "Expense", Utc::now());
        assert!(book.reconcile().is_ok());
        assert_eq!(book.balance().cash, Money::from_major(70));

        let mut tampered = book.clone();
        tampered.balance.cash += Money::from_cents(1);
        let mismatch = tampered.reconcile().unwrap_err();
        assert_eq!(mismatch.expected.cash, Money::from_major(70));
    }

    #[test]
    fn test_total_between() {
        let mut book = CashBook::new();
        let now = Utc::now();
        book.post(TransactionKind::In, Money::from_major(10), PaymentMethod::Cash, "a", now - Duration::days(2));
        book.post(TransactionKind::In, Money::from_major(20), PaymentMethod::Card, "b", now);
        book.post(TransactionKind::Out, Money::from_major(5), PaymentMethod::Cash, "c", now);

        let today = book.total_between(TransactionKind::In, now - Duration::hours(1), now + Duration::hours(1));
        assert_eq!(today, Money::from_major(20));
    }
}
