//! Test harness for integration tests.
//!
//! Provides logging setup, verifier construction and temporary
//! configuration files.

use ergo_merkle::BlockId;
use ergo_nipopow::{
    NipopowProof, NipopowVerifier, ProcessOutcome, SharedNipopowVerifier, VerifierConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process; `RUST_LOG` overrides the
/// default `warn` filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Test context with a temporary directory for configuration files.
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context.
    pub fn new() -> Self {
        init_tracing();
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Directory removed on drop.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `config` to `name` inside the context directory.
    pub fn write_config(&self, name: &str, config: &VerifierConfig) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        config.save(&path).expect("Failed to save config");
        path
    }

    /// Verifier loaded from a configuration file written by this context.
    pub fn verifier_from_file(&self, config: &VerifierConfig) -> NipopowVerifier {
        let path = self.write_config("verifier.toml", config);
        let loaded = VerifierConfig::load(&path).expect("Failed to load config");
        NipopowVerifier::from_config(loaded).expect("Config must name a genesis")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifier with default settings expecting `genesis_id`.
pub fn test_verifier(genesis_id: BlockId) -> NipopowVerifier {
    init_tracing();
    NipopowVerifier::new(genesis_id)
}

/// Shared verifier with default settings expecting `genesis_id`.
pub fn shared_verifier(genesis_id: BlockId) -> SharedNipopowVerifier {
    SharedNipopowVerifier::new(test_verifier(genesis_id))
}

/// Feed proofs in order, returning every outcome; panics on rejection.
pub fn process_all(
    verifier: &mut NipopowVerifier,
    proofs: &[NipopowProof],
) -> Vec<ProcessOutcome> {
    proofs
        .iter()
        .map(|proof| {
            let outcome = verifier
                .process(proof.clone())
                .expect("proof must pass validation");
            debug!(?outcome, tip_height = proof.tip_height(), "Processed peer proof");
            outcome
        })
        .collect()
}
