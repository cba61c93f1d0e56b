//! Thread-safe verifier handle.

use crate::{BlockHeader, NipopowProof, NipopowResult, NipopowVerifier, ProcessOutcome};
use ergo_merkle::{BlockId, MerkleProof};
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

/// Cloneable handle to one verifier shared between tasks.
///
/// `process` holds the write lock for the whole call; queries take the read
/// lock and return owned data.
#[derive(Debug, Clone)]
pub struct SharedNipopowVerifier {
    inner: Arc<RwLock<NipopowVerifier>>,
}

impl SharedNipopowVerifier {
    /// Wrap a verifier.
    pub fn new(verifier: NipopowVerifier) -> Self {
        Self {
            inner: Arc::new(RwLock::new(verifier)),
        }
    }

    /// Process a proof under the write lock.
    pub fn process(&self, proof: NipopowProof) -> NipopowResult<ProcessOutcome> {
        self.inner.write().process(proof)
    }

    /// Best chain headers.
    pub fn best_chain(&self) -> Vec<BlockHeader> {
        self.inner.read().best_chain()
    }

    /// Best proof, cloned.
    pub fn best_proof(&self) -> Option<NipopowProof> {
        self.inner.read().best_proof().cloned()
    }

    /// Best chain tip height.
    pub fn best_height(&self) -> Option<u32> {
        self.inner.read().best_height()
    }

    /// See [`NipopowVerifier::has_quorum`].
    pub fn has_quorum(&self) -> bool {
        self.inner.read().has_quorum()
    }

    /// Number of proofs that passed validation.
    pub fn proofs_processed(&self) -> u64 {
        self.inner.read().proofs_processed()
    }

    /// Best chain headers, once quorum is reached.
    pub fn headers_to_apply(&self) -> Option<Vec<BlockHeader>> {
        self.inner
            .read()
            .headers_to_apply()
            .map(|headers| headers.into_iter().cloned().collect())
    }

    /// Header of the best chain with the given id.
    pub fn find_header(&self, id: &BlockId) -> Option<BlockHeader> {
        self.inner.read().find_header(id).cloned()
    }

    /// See [`NipopowVerifier::verify_transaction`].
    pub fn verify_transaction(&self, header_id: &BlockId, proof: &MerkleProof) -> bool {
        self.inner.read().verify_transaction(header_id, proof)
    }

    /// Direct read access.
    pub fn read(&self) -> RwLockReadGuard<'_, NipopowVerifier> {
        self.inner.read()
    }
}

impl From<NipopowVerifier> for SharedNipopowVerifier {
    fn from(verifier: NipopowVerifier) -> Self {
        Self::new(verifier)
    }
}
