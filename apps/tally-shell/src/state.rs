//! # Engine State
//!
//! The engine behind a single async mutex.
//!
//! ## Thread Safety
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request A ──► lock ──► execute ──► save snapshot ──► unlock            │
//! │  Request B ──────────── waits ────────────────────────► lock ──► ...    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The lock is held across the snapshot write so snapshots land in the same
//! order as the operations that produced them. `tokio::sync::Mutex` allows
//! that and cannot be poisoned.

use std::sync::Arc;

use tally_core::Engine;
use tokio::sync::{Mutex, MutexGuard};

/// Shared handle to the one engine instance.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        SharedEngine {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Exclusive access for the duration of the guard.
    pub async fn lock(&self) -> MutexGuard<'_, Engine> {
        self.inner.lock().await
    }

    /// Executes a function with read access to the engine.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let balance = shared.with_engine(|e| e.cash_book().balance()).await;
    /// ```
    pub async fn with_engine<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Engine) -> R,
    {
        let engine = self.inner.lock().await;
        f(&engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{EngineConfig, Money, Product};

    #[tokio::test]
    async fn test_clones_share_one_engine() {
        let shared = SharedEngine::new(Engine::new(EngineConfig::default()));
        let other = shared.clone();

        other
            .lock()
            .await
            .add_product(Product::new("P", "P-1", "Paint", Money::from_major(10)))
            .unwrap();

        let count = shared.with_engine(|e| e.inventory().len()).await;
        assert_eq!(count, 1);
    }
}
