//! # ergo-merkle
//!
//! Blake2b256 Merkle trees and inclusion proofs in the layout used by Ergo
//! block sections (transactions, extension).
//!
//! This crate provides:
//! - [`Digest32`], the fixed 32-byte hash value used for ids and node digests
//! - [`MerkleProof`], a single-leaf inclusion proof
//! - [`BatchMerkleProof`], a compact proof for several leaves of one tree
//! - [`MerkleTree`], a reference builder producing roots and both proof kinds
//!
//! ## Hashing
//!
//! Leaves are hashed as `H(0x00 || data)`, internal nodes as
//! `H(0x01 || left || right)`. A level with an odd number of nodes pairs its
//! last node with an empty node, which contributes no bytes to the hash.

mod batch;
mod digest;
mod error;
mod proof;
mod tree;

pub use batch::{BatchMerkleProof, BatchMerkleProofIndex};
pub use digest::{
    blake2b256_hash, internal_hash, leaf_hash, prefixed_hash, prefixed_hash2, BlockId, Digest32,
    DIGEST_SIZE, INTERNAL_PREFIX, LEAF_PREFIX,
};
pub use error::{MerkleError, MerkleResult};
pub use proof::{LevelNode, MerkleProof, NodeSide};
pub use tree::{MerkleNode, MerkleTree, EMPTY_MERKLE_ROOT};
