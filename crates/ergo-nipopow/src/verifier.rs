//! NiPoPoW proof verifier.
//!
//! Manages the best known proof and validates new proofs against it.

use crate::{BlockHeader, NipopowAlgos, NipopowError, NipopowProof, NipopowResult, VerifierConfig};
use ergo_merkle::{BlockId, MerkleProof};
use tracing::{debug, info, warn};

/// Result of processing a valid NiPoPoW proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The new proof represents a better chain and was adopted.
    BetterChain {
        /// Number of proofs accepted so far.
        proofs_processed: u64,
    },
    /// The existing proof is still the best.
    NoBetterChain {
        /// Number of proofs accepted so far.
        proofs_processed: u64,
    },
}

/// Verifier state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VerifierState {
    /// No proof accepted yet.
    #[default]
    Empty,
    /// Best proof seen so far.
    Tracking(Box<NipopowProof>),
}

/// NiPoPoW proof verifier.
///
/// Maintains the best known proof and validates new proofs against it.
/// Used for light client bootstrap and quick chain synchronization.
#[derive(Debug)]
pub struct NipopowVerifier {
    /// Expected genesis block ID.
    genesis_id: BlockId,
    /// Acceptance rules.
    config: VerifierConfig,
    algos: NipopowAlgos,
    state: VerifierState,
    /// Number of proofs that passed validation.
    proofs_processed: u64,
}

impl NipopowVerifier {
    /// Create a verifier for a known genesis block with default settings.
    pub fn new(genesis_id: BlockId) -> Self {
        Self {
            genesis_id,
            config: VerifierConfig::for_genesis(genesis_id),
            algos: NipopowAlgos::default(),
            state: VerifierState::Empty,
            proofs_processed: 0,
        }
    }

    /// Create a verifier from configuration; the genesis id is required.
    pub fn from_config(config: VerifierConfig) -> NipopowResult<Self> {
        let genesis_id = config
            .genesis_id
            .ok_or_else(|| NipopowError::Config("genesis_id is not set".to_string()))?;
        if config.min_params.m == 0 || config.min_params.k == 0 {
            return Err(NipopowError::Config(
                "min_params must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            genesis_id,
            config,
            algos: NipopowAlgos::default(),
            state: VerifierState::Empty,
            proofs_processed: 0,
        })
    }

    /// Start a new sync session: forget the best proof and the counter.
    ///
    /// Meant for a client that rebootstraps from a fresh set of peers;
    /// processing never moves a verifier back to `Empty` on its own.
    pub fn reset(&mut self) {
        self.state = VerifierState::Empty;
        self.proofs_processed = 0;
    }

    /// Process a new proof.
    ///
    /// Every check runs before any state changes: an error leaves the
    /// verifier untouched. A valid proof is adopted when nothing is tracked
    /// yet or when it is better than the current best.
    pub fn process(&mut self, proof: NipopowProof) -> NipopowResult<ProcessOutcome> {
        if let Err(e) = self.check(&proof) {
            warn!(
                error = %e,
                tip_height = proof.tip_height(),
                "Rejected NiPoPoW proof"
            );
            return Err(e);
        }

        let is_better = match &self.state {
            VerifierState::Empty => true,
            VerifierState::Tracking(best) => proof.outscores(best, &self.algos)?,
        };

        self.proofs_processed += 1;
        if is_better {
            info!(
                height = proof.tip_height(),
                tip = ?proof.tip_id(),
                proofs_processed = self.proofs_processed,
                "Adopted better NiPoPoW proof"
            );
            self.state = VerifierState::Tracking(Box::new(proof));
            Ok(ProcessOutcome::BetterChain {
                proofs_processed: self.proofs_processed,
            })
        } else {
            debug!(
                height = proof.tip_height(),
                best_height = ?self.best_height(),
                "NiPoPoW proof is not better than current best"
            );
            Ok(ProcessOutcome::NoBetterChain {
                proofs_processed: self.proofs_processed,
            })
        }
    }

    fn check(&self, proof: &NipopowProof) -> NipopowResult<()> {
        let got = proof.genesis_id().ok_or_else(|| {
            NipopowError::InvalidProof("NiPoPoW proof prefix cannot be empty".to_string())
        })?;
        if got != self.genesis_id {
            return Err(NipopowError::WrongGenesis {
                expected: self.genesis_id,
                got,
            });
        }

        if !self.config.accepts_params(proof.m, proof.k) {
            return Err(NipopowError::InvalidProof(format!(
                "parameters m={} k={} below minimum m={} k={}",
                proof.m, proof.k, self.config.min_params.m, self.config.min_params.k
            )));
        }

        proof.validate()?;

        if self.config.check_header_ids {
            for header in proof.headers_chain() {
                header.verify_id()?;
            }
        }

        if self.config.check_pow {
            for header in proof.headers_chain().into_iter().filter(|h| !h.is_genesis()) {
                if !self.algos.pow_scheme.check_pow(header)? {
                    return Err(NipopowError::InvalidProof(format!(
                        "PoW hit above target at height {}",
                        header.height
                    )));
                }
            }
        }

        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> &VerifierState {
        &self.state
    }

    /// Get the current best proof.
    pub fn best_proof(&self) -> Option<&NipopowProof> {
        match &self.state {
            VerifierState::Empty => None,
            VerifierState::Tracking(best) => Some(best.as_ref()),
        }
    }

    /// Headers of the best proof in ascending height, empty when no proof
    /// has been accepted.
    pub fn best_chain(&self) -> Vec<BlockHeader> {
        self.best_proof()
            .map(|p| p.headers_chain().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the best chain tip height.
    pub fn best_height(&self) -> Option<u32> {
        self.best_proof().map(|p| p.tip_height())
    }

    /// Get the expected genesis ID.
    pub fn genesis_id(&self) -> BlockId {
        self.genesis_id
    }

    /// Configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Number of proofs that passed validation.
    pub fn proofs_processed(&self) -> u64 {
        self.proofs_processed
    }

    /// Check if we have enough proofs to proceed.
    pub fn has_quorum(&self) -> bool {
        self.proofs_processed >= self.config.min_proofs && self.best_proof().is_some()
    }

    /// Best chain headers, once quorum is reached.
    pub fn headers_to_apply(&self) -> Option<Vec<&BlockHeader>> {
        if !self.has_quorum() {
            return None;
        }
        self.best_proof().map(|p| p.headers_chain())
    }

    /// Header of the best chain with the given id.
    pub fn find_header(&self, id: &BlockId) -> Option<&BlockHeader> {
        self.best_proof()?
            .headers_chain()
            .into_iter()
            .find(|h| &h.id == id)
    }

    /// Check that a transaction is included in a header of the best chain.
    ///
    /// False when the header is unknown or the proof does not lead to its
    /// transactions root.
    pub fn verify_transaction(&self, header_id: &BlockId, proof: &MerkleProof) -> bool {
        self.find_header(header_id)
            .is_some_and(|h| h.contains_transaction(proof))
    }
}
