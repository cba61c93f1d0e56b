//! Verifier configuration.

use crate::{NipopowError, NipopowResult, PoPowParams};
use ergo_merkle::BlockId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Light client verifier configuration.
///
/// ```toml
/// genesis_id = "b0244dfc267baca974a4caee06120321562784303a8a688976ae56170e4d175b"
/// min_proofs = 2
/// check_header_ids = true
///
/// [min_params]
/// m = 6
/// k = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Expected genesis block id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_id: Option<BlockId>,
    /// Number of accepted proofs before the best chain is handed out.
    #[serde(default = "default_min_proofs")]
    pub min_proofs: u64,
    /// Recompute every header id from its bytes.
    #[serde(default)]
    pub check_header_ids: bool,
    /// Check every header's PoW hit against its target.
    #[serde(default)]
    pub check_pow: bool,
    /// Smallest m and k a proof may be built with.
    #[serde(default = "default_min_params")]
    pub min_params: PoPowParams,
}

fn default_min_proofs() -> u64 {
    1
}

fn default_min_params() -> PoPowParams {
    PoPowParams::new(1, 1)
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            genesis_id: None,
            min_proofs: default_min_proofs(),
            check_header_ids: false,
            check_pow: false,
            min_params: default_min_params(),
        }
    }
}

impl VerifierConfig {
    /// Configuration for a known genesis with everything else defaulted.
    pub fn for_genesis(genesis_id: BlockId) -> Self {
        Self {
            genesis_id: Some(genesis_id),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> NipopowResult<Self> {
        toml::from_str(content)
            .map_err(|e| NipopowError::Config(format!("failed to parse config: {}", e)))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> NipopowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NipopowError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Save as a TOML file.
    pub fn save(&self, path: &Path) -> NipopowResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NipopowError::Config(format!("failed to encode config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            NipopowError::Config(format!("failed to write {}: {}", path.display(), e))
        })
    }

    /// Whether a proof's parameters meet the configured minimum.
    pub fn accepts_params(&self, m: u32, k: u32) -> bool {
        m >= self.min_params.m && k >= self.min_params.k
    }
}
