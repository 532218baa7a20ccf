//! # Shell Configuration
//!
//! Configuration loaded once at startup.
//!
//! ## Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file, plus [`EngineConfig::default`])
//!
//! A malformed variable never aborts startup: it is logged and the default
//! is kept.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;
use tally_core::installments::InstallmentPolicy;
use tally_core::{EngineConfig, Money};
use tracing::warn;

use crate::error::ShellError;

/// Key the engine snapshot is stored under unless overridden.
pub const DEFAULT_SNAPSHOT_KEY: &str = "erp_state";

/// Database file name inside the platform data directory.
const DATABASE_FILE: &str = "tally.db";

/// Shell configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Explicit database path. `None` means the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Snapshot key in the store.
    pub snapshot_key: String,

    /// Rules handed to the engine.
    pub engine: EngineConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            db_path: None,
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Creates a ShellConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `TALLY_DB_PATH`: database file
    /// - `TALLY_SNAPSHOT_KEY`: snapshot key (default `erp_state`)
    /// - `TALLY_MAIN_BRANCH`: main branch id (default `main`)
    /// - `TALLY_LARGE_SALE_THRESHOLD`: e.g. "5000.00"
    /// - `TALLY_INSTALLMENT_COUNT`: installments per credit sale (≥ 1)
    /// - `TALLY_INSTALLMENT_DAYS`: days between due dates (≥ 1)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ShellConfig::default();

        if let Some(path) = non_empty(lookup("TALLY_DB_PATH")) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(key) = non_empty(lookup("TALLY_SNAPSHOT_KEY")) {
            config.snapshot_key = key;
        }

        if let Some(branch) = non_empty(lookup("TALLY_MAIN_BRANCH")) {
            config.engine.main_branch_id = branch;
        }

        if let Some(raw) = lookup("TALLY_LARGE_SALE_THRESHOLD") {
            match Money::parse(&raw) {
                Ok(threshold) if !threshold.is_negative() => {
                    config.engine.large_sale_threshold = threshold;
                }
                _ => warn!(value = %raw, "Ignoring invalid TALLY_LARGE_SALE_THRESHOLD"),
            }
        }

        let defaults = InstallmentPolicy::default();
        let count = parse_at_least_one("TALLY_INSTALLMENT_COUNT", lookup("TALLY_INSTALLMENT_COUNT"));
        let days = parse_at_least_one("TALLY_INSTALLMENT_DAYS", lookup("TALLY_INSTALLMENT_DAYS"));
        config.engine.installment_policy = InstallmentPolicy {
            count: count
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(defaults.count),
            interval_days: days.unwrap_or(defaults.interval_days),
        };

        config
    }

    /// Resolves the database file.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.tally.erp/tally.db`
    /// - **Windows**: `%APPDATA%\tally\erp\data\tally.db`
    /// - **Linux**: `~/.local/share/erp/tally.db`
    pub fn database_path(&self) -> Result<PathBuf, ShellError> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "tally", "erp").ok_or(ShellError::NoDataDir)?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_at_least_one(name: &str, raw: Option<String>) -> Option<i64> {
    let raw = raw?;
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            warn!(variable = name, value = %raw, "Ignoring invalid value");
            None
        }
    }
}
