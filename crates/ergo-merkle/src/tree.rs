//! Reference Merkle tree builder.
//!
//! Builds the same tree as the node's `Algos.merkleTreeRoot`: leaves hashed
//! with prefix 0, internal nodes with prefix 1, an odd node paired with the
//! empty node. A single leaf still gets an internal root above it.

use crate::digest::{blake2b256_hash, internal_hash, leaf_hash};
use crate::{BatchMerkleProof, BatchMerkleProofIndex, Digest32, LevelNode, MerkleProof, NodeSide};
use std::collections::HashMap;

/// Root of a tree without leaves: blake2b256 of the empty byte string.
/// = 0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8
pub const EMPTY_MERKLE_ROOT: [u8; 32] = [
    0x0e, 0x57, 0x51, 0xc0, 0x26, 0xe5, 0x43, 0xb2, 0xe8, 0xab, 0x2e, 0xb0, 0x60, 0x99, 0xda, 0xa1,
    0xd1, 0xe5, 0xdf, 0x47, 0x77, 0x8f, 0x77, 0x87, 0xfa, 0xab, 0x45, 0xcd, 0xf1, 0x2f, 0xe3, 0xa8,
];

/// A tree leaf: payload plus its leaf digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    hash: Digest32,
    data: Vec<u8>,
}

impl MerkleNode {
    /// Leaf holding `data`.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            hash: leaf_hash(&data),
            data,
        }
    }

    /// Leaf digest `H(0x00 || data)`.
    pub fn hash(&self) -> &Digest32 {
        &self.hash
    }

    /// Leaf payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Merkle tree over a list of leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<MerkleNode>,
    /// `levels[0]` holds leaf digests, the last level holds the root alone.
    levels: Vec<Vec<Digest32>>,
    /// Leaf digest → first leaf position.
    index_by_hash: HashMap<Digest32, usize>,
}

impl MerkleTree {
    /// Build the tree.
    pub fn new(leaves: Vec<MerkleNode>) -> Self {
        let mut index_by_hash = HashMap::with_capacity(leaves.len());
        for (i, leaf) in leaves.iter().enumerate() {
            index_by_hash.entry(leaf.hash).or_insert(i);
        }

        let mut levels = Vec::new();
        if !leaves.is_empty() {
            let mut current: Vec<Digest32> = leaves.iter().map(|l| l.hash).collect();
            loop {
                let parents: Vec<Digest32> = current
                    .chunks(2)
                    .map(|pair| internal_hash(Some(&pair[0]), pair.get(1)))
                    .collect();
                levels.push(current);
                let done = parents.len() == 1;
                current = parents;
                if done {
                    levels.push(current);
                    break;
                }
            }
        }

        Self {
            leaves,
            levels,
            index_by_hash,
        }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True when the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Root digest.
    pub fn root_hash(&self) -> Digest32 {
        self.levels
            .last()
            .and_then(|root| root.first().copied())
            .unwrap_or_else(|| blake2b256_hash(&[]))
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof_by_index(&self, index: usize) -> Option<MerkleProof> {
        let leaf = self.leaves.get(index)?;

        let mut path = Vec::with_capacity(self.levels.len());
        let mut position = index;
        for level in self.inner_levels() {
            let side = if position % 2 == 0 {
                NodeSide::Left
            } else {
                NodeSide::Right
            };
            path.push(LevelNode {
                hash: level.get(position ^ 1).copied(),
                side,
            });
            position /= 2;
        }

        Some(MerkleProof::with_levels(leaf.data.clone(), path))
    }

    /// Inclusion proof for the first leaf holding `data`.
    pub fn proof_by_element(&self, data: &[u8]) -> Option<MerkleProof> {
        let index = *self.index_by_hash.get(&leaf_hash(data))?;
        self.proof_by_index(index)
    }

    /// Batch proof for the leaves at `indices`.
    ///
    /// Returns `None` for an empty selection or any position out of range.
    pub fn proof_by_indices(&self, indices: &[usize]) -> Option<BatchMerkleProof> {
        let mut positions = indices.to_vec();
        positions.sort_unstable();
        positions.dedup();
        if positions.is_empty() || positions.iter().any(|&i| i >= self.leaves.len()) {
            return None;
        }

        let proven = positions
            .iter()
            .map(|&i| {
                Some(BatchMerkleProofIndex {
                    index: u32::try_from(i).ok()?,
                    digest: self.leaves[i].hash,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        let mut siblings = Vec::new();
        for level in self.inner_levels() {
            let mut parents = Vec::with_capacity(positions.len());
            let mut j = 0;
            while j < positions.len() {
                let position = positions[j];
                if position % 2 == 0 && positions.get(j + 1) == Some(&(position + 1)) {
                    j += 2;
                } else {
                    let sibling = position ^ 1;
                    let side = if sibling < position {
                        NodeSide::Left
                    } else {
                        NodeSide::Right
                    };
                    siblings.push(LevelNode {
                        hash: level.get(sibling).copied(),
                        side,
                    });
                    j += 1;
                }
                parents.push(position / 2);
            }
            positions = parents;
        }

        Some(BatchMerkleProof::new(proven, siblings))
    }

    /// All levels below the root.
    fn inner_levels(&self) -> &[Vec<Digest32>] {
        match self.levels.split_last() {
            Some((_, inner)) => inner,
            None => &[],
        }
    }
}
