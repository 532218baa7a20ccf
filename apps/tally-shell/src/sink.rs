//! Notification sink that forwards alerts to the log.

use tally_core::{Notification, NotificationLevel, NotificationSink};
use tracing::{info, warn};

/// Writes every published notification as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn publish(&self, notifications: &[Notification]) {
        for n in notifications {
            match n.level {
                NotificationLevel::Warning => {
                    warn!(id = %n.id, title = %n.title, "{}", n.message)
                }
                NotificationLevel::Info | NotificationLevel::Success => {
                    info!(id = %n.id, title = %n.title, "{}", n.message)
                }
            }
        }
    }
}
