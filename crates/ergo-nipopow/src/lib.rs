//! NiPoPoW (Non-Interactive Proofs of Proof-of-Work) light client support.
//!
//! This crate implements NiPoPoW as described in the KMZ17 paper (FC20 version).
//! It provides:
//! - Headers with their id and Autolykos PoW hit
//! - Block extensions and the interlinks vector stored in them
//! - Proof generation, validation and comparison
//! - A verifier tracking the best proof seen, for light client bootstrap
//!
//! # Overview
//!
//! NiPoPoW enables efficient proofs that a chain represents significant PoW.
//! It works by:
//! 1. Classifying blocks by their "level" (based on how much they exceeded target)
//! 2. Maintaining "interlinks" in each block to higher-level superblocks
//! 3. Generating proofs by selecting relevant superblocks at each level
//!
//! # Key Concepts
//!
//! - **Level (μ)**: A block's level is based on how much its PoW exceeded the target
//! - **Superblock**: A block at level μ ≥ 1 (exceeded target by 2^μ factor)
//! - **Interlinks**: A vector of block IDs creating a skip-list structure
//! - **Proof**: Selected headers + interlinks proofs demonstrating chain work

mod algos;
mod autolykos;
mod config;
mod error;
mod extension;
mod header;
mod interlinks;
mod popow_header;
mod proof;
mod serialization;
mod shared;
#[cfg(test)]
pub(crate) mod test_helpers;
mod verifier;

pub use algos::{
    best_arg, compare_superblock_counts, count_superblocks_by_level, lowest_common_ancestor,
    NipopowAlgos, MAX_LEVEL,
};
pub use autolykos::{
    decode_compact_bits, group_order, level_of_hit, target_from_n_bits, AutolykosPowScheme,
};
pub use config::VerifierConfig;
pub use error::{NipopowError, NipopowResult};
pub use extension::{Extension, ExtensionField, FIELD_KEY_SIZE, FIELD_VALUE_MAX_SIZE};
pub use header::{
    AutolykosSolution, BlockHeader, AUTOLYKOS_V2_VERSION, GENESIS_HEIGHT, GROUP_ELEMENT_SIZE,
    STATE_ROOT_SIZE,
};
pub use interlinks::{
    is_interlinks_key, pack_interlinks, unpack_interlinks, update_interlinks,
    INTERLINKS_VECTOR_PREFIX,
};
pub use popow_header::PoPowHeader;
pub use proof::{NipopowProof, PoPowParams};
pub use shared::SharedNipopowVerifier;
pub use verifier::{NipopowVerifier, ProcessOutcome, VerifierState};

/// Default security parameter (minimum superchain length).
pub const DEFAULT_M: u32 = 30;

/// Default suffix length.
pub const DEFAULT_K: u32 = 30;
