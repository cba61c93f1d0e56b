//! Error types for NiPoPoW proofs and the verifier.

use ergo_merkle::{BlockId, MerkleError};
use thiserror::Error;

/// NiPoPoW errors.
///
/// A proof that is well formed but loses the comparison is not an error:
/// comparisons return `false` and the verifier reports `NoBetterChain`.
#[derive(Error, Debug)]
pub enum NipopowError {
    /// Proof prefix does not start at the expected genesis block.
    #[error("Wrong genesis: expected {expected}, got {got}")]
    WrongGenesis { expected: BlockId, got: BlockId },

    /// Proof failed structural validation.
    #[error("Invalid NiPoPoW proof: {0}")]
    InvalidProof(String),

    /// Suffix header does not point at its predecessor.
    #[error("Suffix not contiguous at height {height}: parent {parent_id}, expected {expected}")]
    NonContiguousSuffix {
        height: u32,
        parent_id: BlockId,
        expected: BlockId,
    },

    /// Interlinks are not proven by the header's extension root.
    #[error("Interlinks proof does not match extension root of {id} at height {height}")]
    InvalidInterlinksProof { id: BlockId, height: u32 },

    /// Declared header id differs from the hash of the header bytes.
    #[error("Header id mismatch at height {height}: declared {declared}, computed {computed}")]
    InvalidHeaderId {
        height: u32,
        declared: BlockId,
        computed: BlockId,
    },

    /// Security parameter m is zero.
    #[error("NiPoPoW m parameter must be >= 1")]
    ZeroMParameter,

    /// Suffix length k is zero.
    #[error("NiPoPoW k parameter must be >= 1")]
    ZeroKParameter,

    /// Chain is too short to build a proof.
    #[error("Chain too short: {len} headers, need at least {required}")]
    ChainTooShort { len: usize, required: usize },

    /// Chain does not start at genesis.
    #[error("Chain is not anchored at genesis")]
    NotAnchored,

    /// Interlinks vector is malformed.
    #[error("Invalid interlinks: {0}")]
    InvalidInterlinks(String),

    /// Version 1 solution lacks the one-time key or the distance.
    #[error("Incomplete PoW solution in header {0}")]
    IncompleteSolution(BlockId),

    /// nBits does not encode a positive difficulty.
    #[error("Invalid difficulty encoding: {0:#010x}")]
    InvalidDifficulty(u32),

    /// PoW scheme parameters out of range.
    #[error("Invalid PoW parameters: {0}")]
    InvalidPowParams(String),

    /// Input could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Merkle proof or digest error.
    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),
}

impl NipopowError {
    /// True for errors caused by proof content rather than by its encoding.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NipopowError::WrongGenesis { .. }
                | NipopowError::InvalidProof(_)
                | NipopowError::NonContiguousSuffix { .. }
                | NipopowError::InvalidInterlinksProof { .. }
                | NipopowError::InvalidHeaderId { .. }
                | NipopowError::ZeroMParameter
                | NipopowError::ZeroKParameter
        )
    }
}

impl From<serde_json::Error> for NipopowError {
    fn from(e: serde_json::Error) -> Self {
        NipopowError::Decode(e.to_string())
    }
}

/// Result type for NiPoPoW operations.
pub type NipopowResult<T> = Result<T, NipopowError>;
