//! PoPowHeader - Block header with interlinks and proof.

use crate::extension::Extension;
use crate::interlinks::pack_interlinks;
use crate::{BlockHeader, NipopowResult};
use ergo_merkle::{leaf_hash, BatchMerkleProof, BlockId, Digest32};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Proof-of-Proof-of-Work header.
///
/// Contains a block header along with its interlinks vector
/// and a batch Merkle proof that the interlinks are committed to by the
/// header's extension root.
///
/// JSON form: `{"header": {...}, "interlinks": [hex], "interlinksProof": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoPowHeader {
    /// The block header.
    pub header: BlockHeader,
    /// Unpacked interlinks vector.
    pub interlinks: Vec<BlockId>,
    /// Proof for the packed interlinks fields of the block extension.
    #[serde(default)]
    pub interlinks_proof: BatchMerkleProof,
}

impl PoPowHeader {
    /// Create a new PoPowHeader.
    pub fn new(
        header: BlockHeader,
        interlinks: Vec<BlockId>,
        interlinks_proof: BatchMerkleProof,
    ) -> Self {
        Self {
            header,
            interlinks,
            interlinks_proof,
        }
    }

    /// Build from a header and its full extension.
    pub fn from_block(header: BlockHeader, extension: &Extension) -> NipopowResult<Self> {
        let interlinks = extension.interlinks()?;
        let interlinks_proof = extension.interlinks_proof().unwrap_or_default();
        Ok(Self::new(header, interlinks, interlinks_proof))
    }

    /// Get the block ID.
    pub fn id(&self) -> BlockId {
        self.header.id
    }

    /// Get the block height.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Get the parent block ID.
    pub fn parent_id(&self) -> BlockId {
        self.header.parent_id
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.is_genesis()
    }

    /// Get the genesis block ID from interlinks.
    ///
    /// Genesis is always the first element of interlinks.
    pub fn genesis_id(&self) -> Option<&BlockId> {
        self.interlinks.first()
    }

    /// Most recent ancestor of level at least `level`.
    ///
    /// Level 0 is the parent. Levels above the highest recorded one resolve
    /// to genesis. `None` for genesis itself.
    pub fn link_at_level(&self, level: usize) -> Option<BlockId> {
        if level == 0 {
            return (!self.is_genesis()).then_some(self.header.parent_id);
        }
        let len = self.interlinks.len();
        if level >= len {
            return self.interlinks.first().copied();
        }
        self.interlinks.get(len - level).copied()
    }

    /// Check if this header connects to another via interlinks or parent.
    ///
    /// A header connects to another if:
    /// - Its parent_id matches the other header's ID, OR
    /// - Any of its interlinks matches the other header's ID
    pub fn connects_to(&self, other_id: &BlockId) -> bool {
        if &self.header.parent_id == other_id {
            return true;
        }

        self.interlinks.iter().any(|link| link == other_id)
    }

    /// Check that the interlinks are committed to by the extension root.
    ///
    /// With no interlinks the proof must be empty. Otherwise the proven leaf
    /// digests, in index order, must be exactly the packed interlinks fields
    /// and the proof must rebuild `header.extension_root`.
    pub fn check_interlinks_proof(&self) -> bool {
        if self.interlinks.is_empty() {
            return self.interlinks_proof.is_empty();
        }

        let expected: Vec<Digest32> = pack_interlinks(&self.interlinks)
            .iter()
            .map(|field| leaf_hash(&field.leaf_data()))
            .collect();

        let mut proven = self.interlinks_proof.indices().to_vec();
        proven.sort_by_key(|ix| ix.index);
        let digests_match = proven.len() == expected.len()
            && proven.iter().zip(&expected).all(|(ix, d)| ix.digest == *d);
        if !digests_match {
            trace!(
                height = self.height(),
                proven = proven.len(),
                expected = expected.len(),
                "Interlinks leaves differ from proven leaves"
            );
            return false;
        }

        self.interlinks_proof.valid(&self.header.extension_root)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> NipopowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode to JSON.
    pub fn to_json(&self) -> NipopowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl PartialEq for PoPowHeader {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for PoPowHeader {}

impl std::hash::Hash for PoPowHeader {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
