//! Error types for Merkle proof decoding.

use thiserror::Error;

/// Errors raised while decoding digests and proofs.
///
/// A proof that decodes fine but does not lead to the expected root is not an
/// error: `valid` simply returns `false`.
#[derive(Error, Debug)]
pub enum MerkleError {
    /// Digest is not exactly 32 bytes.
    #[error("Invalid digest length: expected {expected} bytes, got {got}")]
    InvalidDigestLength { expected: usize, got: usize },

    /// Input is not valid hex.
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Proof structure could not be decoded.
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Node side is neither 0 (left) nor 1 (right).
    #[error("Invalid node side: {0}, expected 0 or 1")]
    InvalidSide(u8),
}

/// Result type for Merkle operations.
pub type MerkleResult<T> = Result<T, MerkleError>;
