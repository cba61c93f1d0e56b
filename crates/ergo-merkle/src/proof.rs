//! Single-leaf Merkle inclusion proof.

use crate::digest::{internal_hash, leaf_hash, optional_hex};
use crate::{Digest32, MerkleError, MerkleResult, DIGEST_SIZE};
use serde::{Deserialize, Serialize};

/// Side of a node within its pair, encoded as 0 (left) or 1 (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NodeSide {
    /// Left child.
    Left = 0,
    /// Right child.
    Right = 1,
}

impl NodeSide {
    /// The opposite side.
    pub fn flip(self) -> Self {
        match self {
            NodeSide::Left => NodeSide::Right,
            NodeSide::Right => NodeSide::Left,
        }
    }
}

impl TryFrom<u8> for NodeSide {
    type Error = MerkleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NodeSide::Left),
            1 => Ok(NodeSide::Right),
            other => Err(MerkleError::InvalidSide(other)),
        }
    }
}

impl From<NodeSide> for u8 {
    fn from(side: NodeSide) -> Self {
        side as u8
    }
}

/// One step of a Merkle path: a sibling digest and a side.
///
/// `hash` is `None` where the sibling is the empty node padding an odd level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelNode {
    /// Sibling digest.
    #[serde(rename = "digest", with = "optional_hex")]
    pub hash: Option<Digest32>,
    /// Side flag, see [`MerkleProof`] and [`crate::BatchMerkleProof`] for its meaning.
    pub side: NodeSide,
}

impl LevelNode {
    /// Level with a present sibling.
    pub fn new(hash: Digest32, side: NodeSide) -> Self {
        Self {
            hash: Some(hash),
            side,
        }
    }

    /// Level whose sibling is the empty node.
    pub fn empty(side: NodeSide) -> Self {
        Self { hash: None, side }
    }
}

/// Proof that a leaf is included in a tree with a given root.
///
/// `levels` run from the leaf's sibling up to the child of the root. The side
/// of each level is the side of the node being proven: `Left` hashes
/// `current || sibling`, `Right` hashes `sibling || current`. A swapped side
/// yields a different digest, so callers must replay sides exactly as built.
///
/// JSON form: `{"leafData": hex, "levels": [[hex, side], ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    #[serde(with = "hex::serde")]
    leaf_data: Vec<u8>,
    #[serde(with = "level_pairs")]
    levels: Vec<LevelNode>,
}

impl MerkleProof {
    /// Start an empty proof for `leaf_data`.
    pub fn new(leaf_data: &[u8]) -> Self {
        Self {
            leaf_data: leaf_data.to_vec(),
            levels: Vec::new(),
        }
    }

    /// Proof with all levels known up front.
    pub fn with_levels(leaf_data: Vec<u8>, levels: Vec<LevelNode>) -> Self {
        Self { leaf_data, levels }
    }

    /// Append one level.
    ///
    /// An empty `hash` stands for the empty sibling; any other length than 32
    /// bytes is rejected.
    pub fn add_node(&mut self, hash: &[u8], side: NodeSide) -> MerkleResult<()> {
        let hash = if hash.is_empty() {
            None
        } else {
            Some(Digest32::try_from(hash)?)
        };
        self.levels.push(LevelNode { hash, side });
        Ok(())
    }

    /// Leaf payload.
    pub fn leaf_data(&self) -> &[u8] {
        &self.leaf_data
    }

    /// Path levels, leaf first.
    pub fn levels(&self) -> &[LevelNode] {
        &self.levels
    }

    /// Root implied by the leaf and the path.
    pub fn root_hash(&self) -> Digest32 {
        self.levels
            .iter()
            .fold(leaf_hash(&self.leaf_data), |current, level| match level.side {
                NodeSide::Left => internal_hash(Some(&current), level.hash.as_ref()),
                NodeSide::Right => internal_hash(level.hash.as_ref(), Some(&current)),
            })
    }

    /// Check the proof against a trusted root.
    pub fn valid(&self, expected_root: &Digest32) -> bool {
        self.root_hash() == *expected_root
    }

    /// Check the proof against a hex-encoded root.
    ///
    /// Fails on undecodable input; a well-formed root that does not match
    /// yields `Ok(false)`.
    pub fn valid_hex(&self, expected_root: &str) -> MerkleResult<bool> {
        let bytes = hex::decode(expected_root)?;
        if bytes.len() != DIGEST_SIZE {
            return Err(MerkleError::InvalidDigestLength {
                expected: DIGEST_SIZE,
                got: bytes.len(),
            });
        }
        Ok(self.root_hash().as_ref() == bytes.as_slice())
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

/// Levels as `[hex, side]` pairs.
mod level_pairs {
    use super::{optional_hex, LevelNode, NodeSide};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(levels: &[LevelNode], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(levels.len()))?;
        for level in levels {
            let digest = level.hash.map(|h| h.to_hex()).unwrap_or_default();
            seq.serialize_element(&(digest, u8::from(level.side)))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<LevelNode>, D::Error> {
        let pairs = Vec::<(String, u8)>::deserialize(deserializer)?;
        pairs
            .into_iter()
            .map(|(digest, side)| {
                let hash = optional_hex::decode(&digest).map_err(serde::de::Error::custom)?;
                let side = NodeSide::try_from(side).map_err(serde::de::Error::custom)?;
                Ok(LevelNode { hash, side })
            })
            .collect()
    }
}
