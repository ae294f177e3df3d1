// ============================================================================
// output.rs - CSV Result Sink
// ============================================================================

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::engine::Match;
use crate::error::Result;

/// One persisted row, named exactly as the wallet import header expects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletRecord {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Mnemonic")]
    pub mnemonic: String,
}

/// Writes the collected matches to a CSV file, header first.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist every collected match. Called once per run, also when the
    /// search stopped short of its target (possibly with zero rows).
    pub fn persist(&self, matches: &[Match]) -> Result<usize> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(["Address", "Mnemonic"])?;
        for entry in matches {
            writer.write_record([entry.address.as_str(), entry.mnemonic.as_str()])?;
        }
        writer.flush()?;

        info!("wrote {} wallet(s) to {}", matches.len(), self.path.display());
        Ok(matches.len())
    }

    /// Read the artifact back, in row order.
    pub fn load(&self) -> Result<Vec<WalletRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_match(address: &str, mnemonic: &str) -> Match {
        Match {
            address: address.to_string(),
            mnemonic: mnemonic.to_string(),
            worker_id: 0,
        }
    }

    #[test]
    fn test_round_trip_preserves_order_and_content() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvSink::new(temp_dir.path().join("wallets.csv"));

        let matches = vec![
            sample_match("aaXYZ", "legal winner thank year wave sausage worth useful legal winner thank yellow"),
            sample_match("aaABC", "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote"),
        ];
        assert_eq!(sink.persist(&matches).unwrap(), 2);

        let records = sink.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "aaXYZ");
        assert_eq!(
            records[0].mnemonic,
            "legal winner thank year wave sausage worth useful legal winner thank yellow"
        );
        assert_eq!(records[1].address, "aaABC");
    }

    #[test]
    fn test_empty_result_set_still_writes_header() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvSink::new(temp_dir.path().join("empty.csv"));

        assert_eq!(sink.persist(&[]).unwrap(), 0);

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert!(content.starts_with("Address,Mnemonic"));
        assert!(sink.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_overwrites_previous_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvSink::new(temp_dir.path().join("wallets.csv"));

        sink.persist(&[sample_match("old", "old mnemonic")]).unwrap();
        sink.persist(&[sample_match("new", "new mnemonic")]).unwrap();

        let records = sink.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "new");
    }
}
