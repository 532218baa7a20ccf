//! # Engine Configuration
//!
//! Business policy knobs consumed by the orchestrator. Plain data with
//! defaults; the host decides where the values come from (environment,
//! settings screen, ...).

use serde::{Deserialize, Serialize};

use crate::installments::InstallmentPolicy;
use crate::money::Money;

/// Branch id that implicitly holds all stock until an explicit allocation
/// exists.
pub const DEFAULT_MAIN_BRANCH: &str = "main";

/// Sales strictly above this total raise a "large sale" notification.
pub const DEFAULT_LARGE_SALE_THRESHOLD: Money = Money::from_major(5000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub main_branch_id: String,
    pub large_sale_threshold: Money,
    pub installment_policy: InstallmentPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            main_branch_id: DEFAULT_MAIN_BRANCH.to_string(),
            large_sale_threshold: DEFAULT_LARGE_SALE_THRESHOLD,
            installment_policy: InstallmentPolicy::default(),
        }
    }
}
