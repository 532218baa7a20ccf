//! # Advisory Summary
//!
//! Optional natural-language digest of the day's activity.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EngineState ──► DailyFigures::collect(date)                            │
//! │                        │                                                │
//! │                        ├──► prompt() ──► Advisor::ask ── Ok(text) ──►   │
//! │                        │                       │                        │
//! │                        │                       └── Err ──┐              │
//! │                        └──► fallback_text() ◄────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never waits on an advisor. Any advisor failure degrades to
//! the deterministic summary.

use std::future::Future;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tally_core::safe::{SafeBalance, TransactionKind};
use tally_core::{EngineState, Money};
use thiserror::Error;
use tracing::{debug, warn};

/// Why an advisor produced no text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdvisorError {
    #[error("No advisor configured")]
    Unavailable,

    #[error("Advisor request failed: {0}")]
    Failed(String),

    #[error("Advisor returned an empty answer")]
    Empty,
}

/// External text service.
pub trait Advisor: Send + Sync {
    fn ask(&self, prompt: &str) -> impl Future<Output = Result<String, AdvisorError>> + Send;
}

/// Advisor used when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAdvisor;

impl Advisor for NoAdvisor {
    async fn ask(&self, _prompt: &str) -> Result<String, AdvisorError> {
        Err(AdvisorError::Unavailable)
    }
}

/// Figures for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFigures {
    pub date: NaiveDate,
    pub sales_count: usize,
    pub sales_total: Money,
    pub money_in: Money,
    pub money_out: Money,
    pub balance: SafeBalance,
    pub unread_alerts: usize,
}

impl DailyFigures {
    pub fn collect(state: &EngineState, date: NaiveDate) -> Self {
        let (from, to) = day_bounds(date);

        let (sales_count, sales_total) = state
            .sales
            .iter()
            .filter(|s| s.date >= from && s.date < to)
            .fold((0, Money::zero()), |(n, total), s| (n + 1, total + s.total));

        DailyFigures {
            date,
            sales_count,
            sales_total,
            money_in: state.cash_book.total_between(TransactionKind::In, from, to),
            money_out: state.cash_book.total_between(TransactionKind::Out, from, to),
            balance: state.cash_book.balance(),
            unread_alerts: state.notifications.unread().count(),
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "You are the bookkeeper of a small shop. In two sentences, summarize the day {} \
             for the owner. Sales: {} totalling {}. Money in: {}. Money out: {}. \
             Cash in safe: {}. Card balance: {}. Unread alerts: {}.",
            self.date,
            self.sales_count,
            self.sales_total,
            self.money_in,
            self.money_out,
            self.balance.cash,
            self.balance.card,
            self.unread_alerts,
        )
    }

    pub fn fallback_text(&self) -> String {
        format!(
            "{}: {} sale(s) totalling {}; money in {}, money out {}; safe holds {} cash and {} card; {} unread alert(s).",
            self.date,
            self.sales_count,
            self.sales_total,
            self.money_in,
            self.money_out,
            self.balance.cash,
            self.balance.card,
            self.unread_alerts,
        )
    }
}

/// Asks the advisor for a summary, falling back to the plain one.
pub async fn daily_summary<A: Advisor>(advisor: &A, figures: &DailyFigures) -> String {
    let answer = match advisor.ask(&figures.prompt()).await {
        Ok(text) if text.trim().is_empty() => Err(AdvisorError::Empty),
        other => other,
    };

    match answer {
        Ok(text) => {
            debug!(date = %figures.date, "Advisor summary received");
            text.trim().to_string()
        }
        Err(AdvisorError::Unavailable) => figures.fallback_text(),
        Err(err) => {
            warn!(error = %err, "Advisor failed, using plain summary");
            figures.fallback_text()
        }
    }
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::command::{LineInput, SaleRequest};
    use tally_core::{Engine, EngineConfig, PaymentMethod, Product};

    struct CannedAdvisor(&'static str);

    impl Advisor for CannedAdvisor {
        async fn ask(&self, prompt: &str) -> Result<String, AdvisorError> {
            assert!(prompt.contains("Sales: 2"));
            Ok(self.0.to_string())
        }
    }

    struct BrokenAdvisor;

    impl Advisor for BrokenAdvisor {
        async fn ask(&self, _prompt: &str) -> Result<String, AdvisorError> {
            Err(AdvisorError::Failed("timeout".to_string()))
        }
    }

    fn busy_day() -> (EngineState, NaiveDate) {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .add_product(Product::new("soap", "SOAP-1", "Soap", Money::from_major(2)).with_stock(10))
            .unwrap();
        engine
            .record_sale(SaleRequest::new(vec![LineInput::new("soap", 3)], PaymentMethod::Cash))
            .unwrap();
        engine
            .record_sale(SaleRequest::new(vec![LineInput::new("soap", 1)], PaymentMethod::Card))
            .unwrap();
        let date = engine.state().sales[0].date.date_naive();
        (engine.into_state(), date)
    }

    #[test]
    fn test_collect_counts_the_day() {
        let (state, date) = busy_day();
        let figures = DailyFigures::collect(&state, date);

        assert_eq!(figures.sales_count, 2);
        assert_eq!(figures.sales_total, Money::from_major(8));
        assert_eq!(figures.money_in, Money::from_major(8));
        assert_eq!(figures.money_out, Money::zero());
        assert_eq!(figures.balance.cash, Money::from_major(6));
        assert_eq!(figures.balance.card, Money::from_major(2));
    }

    #[test]
    fn test_other_days_are_excluded() {
        let (state, date) = busy_day();
        let yesterday = date.pred_opt().unwrap();
        let figures = DailyFigures::collect(&state, yesterday);

        assert_eq!(figures.sales_count, 0);
        assert_eq!(figures.money_in, Money::zero());
        // Balances are running totals, not per-day
        assert_eq!(figures.balance.cash, Money::from_major(6));
    }

    #[tokio::test]
    async fn test_advisor_text_is_used() {
        let (state, date) = busy_day();
        let figures = DailyFigures::collect(&state, date);

        let text = daily_summary(&CannedAdvisor("  A calm day.  "), &figures).await;
        assert_eq!(text, "A calm day.");
    }

    #[tokio::test]
    async fn test_fallback_when_advisor_missing_or_broken() {
        let (state, date) = busy_day();
        let figures = DailyFigures::collect(&state, date);

        let missing = daily_summary(&NoAdvisor, &figures).await;
        let broken = daily_summary(&BrokenAdvisor, &figures).await;

        assert_eq!(missing, figures.fallback_text());
        assert_eq!(broken, missing);
        assert!(missing.contains("2 sale(s) totalling 8.00"));
    }

    #[tokio::test]
    async fn test_blank_answer_falls_back() {
        let (state, date) = busy_day();
        let figures = DailyFigures::collect(&state, date);

        let text = daily_summary(&CannedAdvisor("   "), &figures).await;
        assert_eq!(text, figures.fallback_text());
    }
}
