//! # Notification Emitter
//!
//! Alerts are derived from the state before and after an operation. They
//! carry no transactional weight: dropping them never breaks an invariant,
//! and they are appended, never merged or deduplicated.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rule             Trigger                           Level               │
//! │  ───────────────  ────────────────────────────────  ─────────           │
//! │  Critical stock   stock went down during the event  warning             │
//! │                   AND stock ≤ min_stock now         (one alert naming   │
//! │                                                      every product)     │
//! │  Large sale       sale total > threshold            success             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::inventory::{below_min_stock, Inventory, StockLevels};
use crate::types::Sale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Notification {
            id: Uuid::new_v4().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            created_at,
            read: false,
        }
    }
}

/// What caused the state change being inspected.
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    Sale(&'a Sale),
    StockMovement,
}

/// Derives the alerts for one event.
pub fn evaluate(
    pre: &StockLevels,
    post: &Inventory,
    trigger: Trigger<'_>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let critical: Vec<String> = post
        .products()
        .filter(|p| pre.get(&p.id).is_some_and(|before| p.stock < *before))
        .filter(|p| below_min_stock(p))
        .map(|p| format!("{} ({})", p.name, p.stock))
        .collect();

    if !critical.is_empty() {
        notifications.push(Notification::new(
            NotificationLevel::Warning,
            "Critical stock",
            format!("Stock at or below minimum: {}", critical.join(", ")),
            now,
        ));
    }

    if let Trigger::Sale(sale) = trigger {
        if sale.total > config.large_sale_threshold {
            notifications.push(Notification::new(
                NotificationLevel::Success,
                "Large sale",
                format!("Sale of {} recorded", sale.total),
                now,
            ));
        }
    }

    notifications
}

/// Side channel that receives every emitted notification.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notifications: &[Notification]);
}

/// Sink that drops everything.
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn publish(&self, _notifications: &[Notification]) {}
}

/// The notification feed kept alongside the business state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    items: Vec<Notification>,
}

impl NotificationFeed {
    pub fn extend(&mut self, notifications: &[Notification]) {
        self.items.extend_from_slice(notifications);
    }

    pub fn all(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter(|n| !n.read)
    }

    /// Marks every notification read; returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for notification in self.items.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{PaymentMethod, Product};

    fn inventory() -> Inventory {
        let mut inventory = Inventory::new();
        inventory
            .insert(Product::new("p", "P", "Paint", Money::from_major(10)).with_stock(12).with_min_stock(5))
            .unwrap();
        inventory
            .insert(Product::new("q", "Q", "Brush", Money::from_major(3)).with_stock(2).with_min_stock(5))
            .unwrap();
        inventory
    }

    fn sale(total: Money) -> Sale {
        Sale {
            id: "S".to_string(),
            lines: Vec::new(),
            total,
            payment_method: PaymentMethod::Cash,
            customer_id: None,
            branch_id: None,
            transaction_id: "T".to_string(),
            installment_plan_id: None,
            note: None,
            date: Utc::now(),
        }
    }

    #[test]
    fn test_only_products_that_went_down_are_named() {
        let mut inventory = inventory();
        let pre = inventory.stock_levels();
        inventory.deduct("p", 8, None).unwrap();

        let notes = evaluate(&pre, &inventory, Trigger::StockMovement, &EngineConfig::default(), Utc::now());

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Warning);
        assert!(notes[0].message.contains("Paint (4)"));
        // Brush was already low but did not move
        assert!(!notes[0].message.contains("Brush"));
    }

    #[test]
    fn test_several_products_share_one_alert() {
        let mut inventory = inventory();
        let pre = inventory.stock_levels();
        inventory.deduct("p", 10, None).unwrap();
        inventory.deduct("q", 1, None).unwrap();

        let notes = evaluate(&pre, &inventory, Trigger::StockMovement, &EngineConfig::default(), Utc::now());
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("Paint (2)"));
        assert!(notes[0].message.contains("Brush (1)"));
    }

    #[test]
    fn test_large_sale_threshold_is_exclusive() {
        let inventory = inventory();
        let pre = inventory.stock_levels();
        let config = EngineConfig::default();

        let at = sale(Money::from_major(5000));
        assert!(evaluate(&pre, &inventory, Trigger::Sale(&at), &config, Utc::now()).is_empty());

        let above = sale(Money::from_cents(500_001));
        let notes = evaluate(&pre, &inventory, Trigger::Sale(&above), &config, Utc::now());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Success);
    }

    #[test]
    fn test_feed_is_additive() {
        let mut feed = NotificationFeed::default();
        let n = Notification::new(NotificationLevel::Info, "t", "m", Utc::now());
        feed.extend(&[n.clone()]);
        feed.extend(&[n]);
        assert_eq!(feed.all().len(), 2);
        assert_eq!(feed.mark_all_read(), 2);
        assert_eq!(feed.unread().count(), 0);
        assert_eq!(feed.mark_all_read(), 0);
    }
}
