//! # Tally Shell Entry Point
//!
//! ```text
//! dashboard / script ──► stdin (NDJSON) ──► tally-shell ──► stdout (NDJSON)
//!                                               │
//!                                               └──► tally.db (snapshot)
//! ```
//!
//! The actual setup is in lib.rs for better testability.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match tally_shell::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tally-shell: {err}");
            ExitCode::FAILURE
        }
    }
}
