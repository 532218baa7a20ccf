//! # Installment Scheduler
//!
//! A credit sale to a known customer becomes an [`InstallmentPlan`].
//!
//! ## Plan Lifecycle
//! ```text
//! credit sale 1000.00 (customer C1)
//!      │
//!      ▼
//! create_plan(policy: 1 × 30 days)
//!      │
//!      ▼
//! Plan { remaining 1000.00, [ #1 1000.00 due +30d  pending ] }
//!      │
//!      ▼  pay(#1)
//! Plan { remaining    0.00, [ #1 1000.00 due +30d  paid    ] }
//!      │
//!      ▼  pay(#1) again
//! no-op
//! ```
//!
//! `remaining_amount` always equals the sum of pending installment amounts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// How a credit sale is split into installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPolicy {
    /// Number of installments (at least 1).
    pub count: u32,
    /// Days between the sale and the first due date, and between due dates.
    pub interval_days: i64,
}

impl Default for InstallmentPolicy {
    fn default() -> Self {
        InstallmentPolicy {
            count: 1,
            interval_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    pub status: InstallmentStatus,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPlan {
    pub id: String,
    pub customer_id: String,
    pub sale_id: String,
    pub total_amount: Money,
    pub remaining_amount: Money,
    pub installments: Vec<Installment>,
}

impl InstallmentPlan {
    pub fn installment(&self, installment_id: &str) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == installment_id)
    }

    /// Sum of the amounts still pending.
    pub fn pending_total(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Pending)
            .map(|i| i.amount)
            .sum()
    }

    pub fn is_settled(&self) -> bool {
        self.installments
            .iter()
            .all(|i| i.status == InstallmentStatus::Paid)
    }

    /// Marks an installment paid.
    ///
    /// Returns the amount paid, or `None` when the installment was already
    /// paid (a no-op). Unknown installment ids are a `MissingReference`.
    pub fn pay(&mut self, installment_id: &str, paid_at: DateTime<Utc>) -> CoreResult<Option<Money>> {
        let installment = self
            .installments
            .iter_mut()
            .find(|i| i.id == installment_id)
            .ok_or_else(|| CoreError::missing("installment", installment_id))?;

        if installment.status == InstallmentStatus::Paid {
            return Ok(None);
        }

        installment.status = InstallmentStatus::Paid;
        installment.paid_at = Some(paid_at);
        let amount = installment.amount;
        self.remaining_amount -= amount;
        Ok(Some(amount))
    }
}

/// Derives a plan for a credit sale.
///
/// The amount is split evenly across `policy.count` installments, with the
/// remainder cent(s) on the last one. The first is due `interval_days`
/// after `from`.
pub fn create_plan(
    customer_id: &str,
    sale_id: &str,
    total: Money,
    from: DateTime<Utc>,
    policy: InstallmentPolicy,
) -> InstallmentPlan {
    let installments = total
        .split_even(policy.count)
        .into_iter()
        .enumerate()
        .map(|(index, amount)| Installment {
            id: Uuid::new_v4().to_string(),
            amount,
            due_date: from + Duration::days(policy.interval_days * (index as i64 + 1)),
            status: InstallmentStatus::Pending,
            paid_at: None,
        })
        .collect();

    InstallmentPlan {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        sale_id: sale_id.to_string(),
        total_amount: total,
        remaining_amount: total,
        installments,
    }
}

/// All installment plans, keyed by plan id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentBook {
    plans: BTreeMap<String, InstallmentPlan>,
}

impl InstallmentBook {
    pub fn insert(&mut self, plan: InstallmentPlan) {
        self.plans.insert(plan.id.clone(), plan);
    }

    pub fn get(&self, plan_id: &str) -> Option<&InstallmentPlan> {
        self.plans.get(plan_id)
    }

    pub fn require(&self, plan_id: &str) -> CoreResult<&InstallmentPlan> {
        self.plans
            .get(plan_id)
            .ok_or_else(|| CoreError::missing("installment plan", plan_id))
    }

    pub fn require_mut(&mut self, plan_id: &str) -> CoreResult<&mut InstallmentPlan> {
        self.plans
            .get_mut(plan_id)
            .ok_or_else(|| CoreError::missing("installment plan", plan_id))
    }

    pub fn plans(&self) -> impl Iterator<Item = &InstallmentPlan> {
        self.plans.values()
    }

    pub fn for_customer<'a>(&'a self, customer_id: &'a str) -> impl Iterator<Item = &'a InstallmentPlan> {
        self.plans.values().filter(move |p| p.customer_id == customer_id)
    }

    /// Pending installments due before `cutoff`, with their plan.
    pub fn overdue(&self, cutoff: DateTime<Utc>) -> Vec<(&InstallmentPlan, &Installment)> {
        self.plans
            .values()
            .flat_map(|plan| plan.installments.iter().map(move |i| (plan, i)))
            .filter(|(_, i)| i.status == InstallmentStatus::Pending && i.due_date < cutoff)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_single_installment_in_30_days() {
        let now = Utc::now();
        let plan = create_plan("C1", "S1", Money::from_major(1000), now, InstallmentPolicy::default());

        assert_eq!(plan.installments.len(), 1);
        assert_eq!(plan.remaining_amount, Money::from_major(1000));
        assert_eq!(plan.installments[0].amount, Money::from_major(1000));
        assert_eq!(plan.installments[0].due_date, now + Duration::days(30));
        assert_eq!(plan.installments[0].status, InstallmentStatus::Pending);
    }

    #[test]
    fn test_split_policy() {
        let now = Utc::now();
        let policy = InstallmentPolicy {
            count: 3,
            interval_days: 7,
        };
        let plan = create_plan("C1", "S1", Money::from_major(100), now, policy);

        let amounts: Vec<i64> = plan.installments.iter().map(|i| i.amount.cents()).collect();
        assert_eq!(amounts, vec![3333, 3333, 3334]);
        assert_eq!(plan.installments[2].due_date, now + Duration::days(21));
        assert_eq!(plan.pending_total(), plan.remaining_amount);
    }

    #[test]
    fn test_pay_twice_only_counts_once() {
        let now = Utc::now();
        let policy = InstallmentPolicy {
            count: 2,
            interval_days: 30,
        };
        let mut plan = create_plan("C1", "S1", Money::from_major(500), now, policy);
        let first = plan.installments[0].id.clone();

        assert_eq!(plan.pay(&first, now).unwrap(), Some(Money::from_major(250)));
        assert_eq!(plan.pay(&first, now).unwrap(), None);
        assert_eq!(plan.remaining_amount, Money::from_major(250));
        assert_eq!(plan.pending_total(), plan.remaining_amount);
        assert!(!plan.is_settled());
    }

    #[test]
    fn test_pay_unknown_installment() {
        let mut plan = create_plan("C1", "S1", Money::from_major(5), Utc::now(), InstallmentPolicy::default());
        assert!(matches!(
            plan.pay("nope", Utc::now()),
            Err(CoreError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut book = InstallmentBook::default();
        book.insert(create_plan("C1", "S1", Money::from_major(5), now - Duration::days(40), InstallmentPolicy::default()));
        book.insert(create_plan("C2", "S2", Money::from_major(5), now, InstallmentPolicy::default()));

        let overdue = book.overdue(now);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].0.customer_id, "C1");
        assert_eq!(book.for_customer("C2").count(), 1);
    }
}
