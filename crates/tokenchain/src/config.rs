//! Ledger configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokenchain_core::DumpConfig;

use crate::error::{LedgerError, Result};

/// Configuration for the [`Ledger`](crate::Ledger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Sign locally built blocks with the ledger's signer.
    pub sign_blocks: bool,
    /// Verify block signatures on ingest.
    pub verify_on_ingest: bool,
    /// Reject ingested blocks that carry no signature slot.
    pub require_block_signature: bool,
    /// Chain dump formatting.
    pub dump: DumpConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            sign_blocks: true,
            verify_on_ingest: true,
            require_block_signature: true,
            dump: DumpConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = LedgerConfig::from_json_str(r#"{"sign_blocks": false}"#).unwrap();
        assert!(!cfg.sign_blocks);
        assert!(cfg.verify_on_ingest);
        assert_eq!(cfg.dump.value_precision, 5);
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"dump": {{"value_precision": 3}}}}"#).unwrap();
        let cfg = LedgerConfig::from_json_file(f.path()).unwrap();
        assert_eq!(cfg.dump.value_precision, 3);
        assert!(cfg.dump.pretty);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            LedgerConfig::from_json_str("{"),
            Err(LedgerError::Config(_))
        ));
    }
}
