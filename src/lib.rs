// lib.rs - Solana Vanity Wallet Generator Library

pub mod config;
pub mod pattern;
pub mod wallet;
pub mod stats;
pub mod engine;
pub mod monitor;
pub mod output;

// Re-exports for convenience
pub use config::Config;
pub use pattern::VanityPattern;
pub use wallet::{Candidate, KeyDeriver, MnemonicWalletDeriver};
pub use stats::SearchStats;
pub use engine::{Match, SearchEngine, SearchOutcome};
pub use monitor::ProgressMonitor;
pub use output::{CsvSink, WalletRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum VanityError {
        #[error("Derivation error: {0}")]
        Derivation(#[from] crate::wallet::DerivationError),

        #[error("Search exhausted: all workers stopped after finding {found} of {target} matches")]
        WorkerExhaustion { found: u64, target: u64 },

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("CSV error: {0}")]
        Csv(#[from] csv::Error),
    }

    pub type Result<T> = std::result::Result<T, VanityError>;
}

/// Utilities module
pub mod utils {

    /// Format duration in human-readable format
    pub fn format_duration(seconds: f64) -> String {
        if seconds < 60.0 {
            format!("{:.1}s", seconds)
        } else if seconds < 3600.0 {
            format!("{:.1}m", seconds / 60.0)
        } else if seconds < 86400.0 {
            format!("{:.1}h", seconds / 3600.0)
        } else {
            format!("{:.1}d", seconds / 86400.0)
        }
    }

    /// Format number with thousands separator
    pub fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }
}
