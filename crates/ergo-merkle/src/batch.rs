//! Batch Merkle proof for several leaves of one tree.

use crate::digest::internal_hash;
use crate::{Digest32, LevelNode, MerkleError, MerkleResult, NodeSide};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A proven leaf: its position in the tree and its leaf digest `H(0x00 || data)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchMerkleProofIndex {
    /// Leaf position.
    pub index: u32,
    /// Leaf digest.
    pub digest: Digest32,
}

/// Compact proof that several leaves belong to one tree.
///
/// `proofs` holds only the sibling digests that cannot be derived from the
/// proven leaves, in the order they are consumed while rebuilding the tree
/// bottom-up. Here the side records where the supplied sibling sits: `Left`
/// hashes `sibling || node`, `Right` hashes `node || sibling`.
///
/// JSON form: `{"indices": [{"index", "digest"}], "proofs": [{"digest", "side"}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchMerkleProof {
    indices: Vec<BatchMerkleProofIndex>,
    proofs: Vec<LevelNode>,
}

impl BatchMerkleProof {
    /// Create a proof from proven leaves and supplied siblings.
    pub fn new(indices: Vec<BatchMerkleProofIndex>, proofs: Vec<LevelNode>) -> Self {
        Self { indices, proofs }
    }

    /// Proven leaves.
    pub fn indices(&self) -> &[BatchMerkleProofIndex] {
        &self.indices
    }

    /// Supplied sibling digests.
    pub fn proofs(&self) -> &[LevelNode] {
        &self.proofs
    }

    /// True when the proof carries neither leaves nor siblings.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() && self.proofs.is_empty()
    }

    /// Check the proof against a trusted root.
    ///
    /// Returns `false` when the siblings run out before a single root is
    /// reached, when the proven leaves are empty or repeat a position, or when
    /// the rebuilt root differs from `expected_root`.
    pub fn valid(&self, expected_root: &Digest32) -> bool {
        self.reconstruct_root()
            .is_some_and(|root| root == *expected_root)
    }

    /// Rebuild the root implied by the proof, if the proof is complete.
    pub fn reconstruct_root(&self) -> Option<Digest32> {
        if self.indices.is_empty() {
            return None;
        }

        let mut known: Vec<(u64, Digest32)> = self
            .indices
            .iter()
            .map(|ix| (u64::from(ix.index), ix.digest))
            .collect();
        known.sort_by_key(|(index, _)| *index);
        if known.windows(2).any(|w| w[0].0 == w[1].0) {
            return None;
        }

        let mut siblings = self.proofs.iter();
        let mut level = 0usize;

        loop {
            let mut parents = Vec::with_capacity(known.len());
            let mut i = 0;
            while i < known.len() {
                let (index, digest) = known[i];

                // Both children known: hash them together, no sibling needed.
                if index % 2 == 0 {
                    if let Some(&(next_index, next_digest)) = known.get(i + 1) {
                        if next_index == index + 1 {
                            parents.push((index / 2, internal_hash(Some(&digest), Some(&next_digest))));
                            i += 2;
                            continue;
                        }
                    }
                }

                let sibling = siblings.next()?;
                let parent = match sibling.side {
                    NodeSide::Left => internal_hash(sibling.hash.as_ref(), Some(&digest)),
                    NodeSide::Right => internal_hash(Some(&digest), sibling.hash.as_ref()),
                };
                parents.push((index / 2, parent));
                i += 1;
            }

            known = parents;
            trace!(
                level,
                nodes = known.len(),
                remaining = siblings.len(),
                "Rebuilt batch proof level"
            );
            level += 1;

            if known.len() == 1 && siblings.len() == 0 {
                return Some(known[0].1);
            }
        }
    }

    /// Decode from the JSON form.
    pub fn from_json(json: &str) -> MerkleResult<Self> {
        serde_json::from_str(json).map_err(|e| MerkleError::MalformedProof(e.to_string()))
    }

    /// Encode to the JSON form.
    pub fn to_json(&self) -> MerkleResult<String> {
        serde_json::to_string(self).map_err(|e| MerkleError::MalformedProof(e.to_string()))
    }
}
