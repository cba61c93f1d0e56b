//! NiPoPoW proof structure, validation and comparison.

use crate::algos::{best_arg, compare_superblock_counts, lowest_common_ancestor};
use crate::{BlockHeader, NipopowAlgos, NipopowError, NipopowResult, PoPowHeader};
use ergo_merkle::{BatchMerkleProof, BlockId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// NiPoPoW proof parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoPowParams {
    /// Security parameter - minimum superchain length at each level.
    pub m: u32,
    /// Suffix length - number of headers at the end.
    pub k: u32,
}

impl Default for PoPowParams {
    fn default() -> Self {
        Self {
            m: super::DEFAULT_M,
            k: super::DEFAULT_K,
        }
    }
}

impl PoPowParams {
    /// Create new parameters.
    pub fn new(m: u32, k: u32) -> Self {
        Self { m, k }
    }

    /// Reject zero parameters.
    pub fn validate(&self) -> NipopowResult<()> {
        if self.m == 0 {
            return Err(NipopowError::ZeroMParameter);
        }
        if self.k == 0 {
            return Err(NipopowError::ZeroKParameter);
        }
        Ok(())
    }
}

/// A NiPoPoW proof representing a chain of work.
///
/// The proof consists of:
/// - A prefix: selected superblocks from the chain, starting at genesis
/// - A suffix: the last k headers, contiguous by parent id
///
/// JSON form: `{"m", "k", "prefix", "suffix"}`. The node's
/// `{"suffixHead", "suffixTail"}` layout is accepted as input too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NipopowProofJson")]
pub struct NipopowProof {
    /// Security parameter used to generate this proof.
    pub m: u32,
    /// Suffix length.
    pub k: u32,
    /// Prefix headers (selected superblocks).
    pub prefix: Vec<PoPowHeader>,
    /// Suffix headers, ascending height; the last one is the claimed tip.
    pub suffix: Vec<PoPowHeader>,
}

impl NipopowProof {
    /// Create a new NiPoPoW proof.
    pub fn new(m: u32, k: u32, prefix: Vec<PoPowHeader>, suffix: Vec<PoPowHeader>) -> Self {
        Self {
            m,
            k,
            prefix,
            suffix,
        }
    }

    /// Get the genesis block ID from this proof.
    pub fn genesis_id(&self) -> Option<BlockId> {
        self.prefix.first().map(|h| h.id())
    }

    /// Prefix followed by suffix.
    pub fn popow_headers(&self) -> impl Iterator<Item = &PoPowHeader> {
        self.prefix.iter().chain(self.suffix.iter())
    }

    /// Get all headers in the proof chain (prefix + suffix).
    pub fn headers_chain(&self) -> Vec<&BlockHeader> {
        self.popow_headers().map(|ph| &ph.header).collect()
    }

    /// Claimed tip (last suffix header).
    pub fn tip(&self) -> Option<&BlockHeader> {
        self.suffix.last().map(|h| &h.header)
    }

    /// Get the height of the proof tip, 0 for a proof without suffix.
    pub fn tip_height(&self) -> u32 {
        self.tip().map_or(0, |h| h.height)
    }

    /// Get the ID of the proof tip.
    pub fn tip_id(&self) -> Option<BlockId> {
        self.tip().map(|h| h.id)
    }

    /// Check if the proof has valid heights (strictly increasing).
    pub fn has_valid_heights(&self) -> bool {
        self.popow_headers()
            .zip(self.popow_headers().skip(1))
            .all(|(prev, next)| prev.height() < next.height())
    }

    /// Check if headers are properly connected via parent or interlinks.
    pub fn has_valid_connections(&self) -> bool {
        self.check_connections().is_ok()
    }

    fn check_connections(&self) -> NipopowResult<()> {
        // Prefix and the first suffix header: parent or interlinks.
        let linked = self.prefix.iter().chain(self.suffix.first());
        for (prev, next) in linked.clone().zip(linked.skip(1)) {
            if !next.connects_to(&prev.id()) {
                return Err(NipopowError::InvalidProof(format!(
                    "header at height {} does not link to height {}",
                    next.height(),
                    prev.height()
                )));
            }
        }

        // Suffix: simple parent chain.
        for pair in self.suffix.windows(2) {
            if pair[1].parent_id() != pair[0].id() {
                return Err(NipopowError::NonContiguousSuffix {
                    height: pair[1].height(),
                    parent_id: pair[1].parent_id(),
                    expected: pair[0].id(),
                });
            }
        }

        Ok(())
    }

    /// Validate the proof structure.
    pub fn validate(&self) -> NipopowResult<()> {
        PoPowParams::new(self.m, self.k).validate()?;

        let first = self.prefix.first().ok_or_else(|| {
            NipopowError::InvalidProof("NiPoPoW proof prefix cannot be empty".to_string())
        })?;
        if !first.is_genesis() {
            return Err(NipopowError::InvalidProof(format!(
                "prefix starts at height {}, not at genesis",
                first.height()
            )));
        }

        if self.suffix.len() != self.k as usize {
            return Err(NipopowError::InvalidProof(format!(
                "NiPoPoW suffix length mismatch: expected {}, got {}",
                self.k,
                self.suffix.len()
            )));
        }

        if !self.has_valid_heights() {
            return Err(NipopowError::InvalidProof(
                "NiPoPoW proof has invalid heights".to_string(),
            ));
        }

        self.check_connections()?;

        if let Some(bad) = self.popow_headers().find(|h| !h.check_interlinks_proof()) {
            return Err(NipopowError::InvalidInterlinksProof {
                id: bad.id(),
                height: bad.height(),
            });
        }

        // Each header needs a level to be scored against other proofs.
        NipopowAlgos::default().levels_of(&self.headers_chain())?;

        Ok(())
    }

    /// Check if this proof is valid.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Compare this proof against another, returning true if this is better.
    ///
    /// Both proofs must be valid. Proofs without a common header (different
    /// genesis) are never better than each other.
    pub fn is_better_than(&self, other: &NipopowProof) -> NipopowResult<bool> {
        self.validate()?;
        other.validate()?;
        self.outscores(other, &NipopowAlgos::default())
    }

    /// Comparison on already validated proofs.
    ///
    /// Scores the parts of both chains above their lowest common ancestor
    /// with `best_arg` under this proof's m. On equal scores the superblock
    /// counts decide from the highest level down; a full tie is not better.
    pub(crate) fn outscores(&self, other: &NipopowProof, algos: &NipopowAlgos) -> NipopowResult<bool> {
        let this_chain = self.headers_chain();
        let other_chain = other.headers_chain();

        let Some(lca) = lowest_common_ancestor(&this_chain, &other_chain) else {
            debug!("NiPoPoW proofs share no header");
            return Ok(false);
        };
        let branch_height = lca.height;

        let this_diverging: Vec<&BlockHeader> = this_chain
            .into_iter()
            .filter(|h| h.height > branch_height)
            .collect();
        let other_diverging: Vec<&BlockHeader> = other_chain
            .into_iter()
            .filter(|h| h.height > branch_height)
            .collect();

        let this_levels = algos.levels_of(&this_diverging)?;
        let other_levels = algos.levels_of(&other_diverging)?;

        let this_score = best_arg(&this_levels, self.m);
        let other_score = best_arg(&other_levels, self.m);
        trace!(
            branch_height,
            this_score,
            other_score,
            "Compared diverging chains"
        );

        Ok(match this_score.cmp(&other_score) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                compare_superblock_counts(&this_levels, &other_levels) == Ordering::Greater
            }
        })
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

/// Accepted JSON layouts of a proof.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NipopowProofJson {
    m: Option<u32>,
    k: Option<u32>,
    prefix: Vec<PoPowHeader>,
    suffix: Option<Vec<PoPowHeader>>,
    suffix_head: Option<PoPowHeader>,
    #[serde(default)]
    suffix_tail: Vec<BlockHeader>,
}

impl TryFrom<NipopowProofJson> for NipopowProof {
    type Error = String;

    fn try_from(json: NipopowProofJson) -> Result<Self, Self::Error> {
        let suffix = match (json.suffix, json.suffix_head) {
            (Some(suffix), None) => suffix,
            (None, Some(head)) => std::iter::once(head)
                .chain(
                    json.suffix_tail
                        .into_iter()
                        .map(|h| PoPowHeader::new(h, Vec::new(), BatchMerkleProof::default())),
                )
                .collect(),
            (Some(_), Some(_)) => {
                return Err("both suffix and suffixHead present".to_string());
            }
            (None, None) => return Err("missing suffix".to_string()),
        };
        let k = json.k.unwrap_or(suffix.len() as u32);
        Ok(Self::new(json.m.unwrap_or(super::DEFAULT_M), k, json.prefix, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{build_chain, extend_chain, proof_of};

    #[test]
    fn test_popow_params_default() {
        let params = PoPowParams::default();
        assert_eq!(params.m, 30);
        assert_eq!(params.k, 30);
    }

    #[test]
    fn test_proof_structure() {
        let chain = build_chain(&[0, 0, 0, 0]);
        let proof = NipopowProof::new(1, 2, chain[..2].to_vec(), chain[2..].to_vec());

        assert_eq!(proof.tip_height(), 4);
        assert_eq!(proof.tip_id(), Some(chain[3].id()));
        assert_eq!(proof.headers_chain().len(), 4);
        assert_eq!(proof.genesis_id(), Some(chain[0].id()));
        assert!(proof.is_valid());
    }

    #[test]
    fn test_proof_invalid_heights() {
        let chain = build_chain(&[0, 0, 0, 0]);
        let proof = NipopowProof::new(
            1,
            1,
            vec![chain[0].clone(), chain[2].clone(), chain[1].clone()],
            vec![chain[3].clone()],
        );

        assert!(!proof.has_valid_heights());
        assert!(matches!(proof.validate(), Err(NipopowError::InvalidProof(_))));
    }

    #[test]
    fn test_validate_zero_params() {
        let chain = build_chain(&[0, 0, 0]);
        let mut proof = NipopowProof::new(1, 1, chain[..2].to_vec(), chain[2..].to_vec());
        proof.m = 0;
        assert!(matches!(proof.validate(), Err(NipopowError::ZeroMParameter)));
        proof.m = 1;
        proof.k = 0;
        assert!(matches!(proof.validate(), Err(NipopowError::ZeroKParameter)));
    }

    #[test]
    fn test_validate_prefix_rules() {
        let chain = build_chain(&[0, 0, 0, 0]);

        let empty = NipopowProof::new(1, 1, vec![], chain[3..].to_vec());
        assert!(matches!(empty.validate(), Err(NipopowError::InvalidProof(_))));

        let headless = NipopowProof::new(1, 1, chain[1..3].to_vec(), chain[3..].to_vec());
        assert!(matches!(headless.validate(), Err(NipopowError::InvalidProof(_))));
    }

    #[test]
    fn test_validate_suffix_length() {
        let chain = build_chain(&[0, 0, 0, 0]);
        let proof = NipopowProof::new(1, 3, chain[..2].to_vec(), chain[2..].to_vec());
        assert!(matches!(proof.validate(), Err(NipopowError::InvalidProof(_))));
    }

    #[test]
    fn test_validate_non_contiguous_suffix() {
        let chain = build_chain(&[0; 6]);
        let proof = NipopowProof::new(
            1,
            2,
            chain[..3].to_vec(),
            vec![chain[3].clone(), chain[5].clone()],
        );
        assert!(matches!(
            proof.validate(),
            Err(NipopowError::NonContiguousSuffix { height: 6, .. })
        ));
    }

    #[test]
    fn test_validate_broken_prefix_link() {
        // Flat chain: block 4 links only to its parent, not to block 2.
        let chain = build_chain(&[0; 5]);
        let proof = NipopowProof::new(
            1,
            1,
            vec![chain[0].clone(), chain[1].clone(), chain[3].clone()],
            vec![chain[4].clone()],
        );
        assert!(!proof.has_valid_connections());
        assert!(matches!(proof.validate(), Err(NipopowError::InvalidProof(_))));
    }

    #[test]
    fn test_validate_bad_interlinks_proof() {
        let chain = build_chain(&[0, 1, 0, 0]);
        let mut proof = NipopowProof::new(1, 1, chain[..3].to_vec(), chain[3..].to_vec());
        proof.prefix[2].header.extension_root = BlockId::zero();
        assert!(matches!(
            proof.validate(),
            Err(NipopowError::InvalidInterlinksProof { height: 3, .. })
        ));
    }

    #[test]
    fn test_validate_unscorable_header() {
        let chain = build_chain(&[0, 1, 0, 0, 2, 0]);

        let mut proof = proof_of(&chain, 2, 2);
        proof.suffix[0].header.autolykos_solution.pow_distance = None;
        assert!(matches!(
            proof.validate(),
            Err(NipopowError::IncompleteSolution(_))
        ));

        let mut proof = proof_of(&chain, 2, 2);
        proof.suffix[1].header.n_bits = 0;
        assert!(matches!(
            proof.validate(),
            Err(NipopowError::InvalidDifficulty(0))
        ));
    }

    #[test]
    fn test_is_better_than_irreflexive() {
        let chain = build_chain(&[0, 1, 0, 2, 0, 0, 1, 0]);
        let proof = proof_of(&chain, 2, 2);
        assert!(!proof.is_better_than(&proof).unwrap());
        assert!(!proof.is_better_than(&proof.clone()).unwrap());
    }

    #[test]
    fn test_is_better_than_extension_wins() {
        let chain = build_chain(&[0; 10]);
        let short = proof_of(&chain[..6], 2, 2);
        let long = proof_of(&chain, 2, 2);

        assert!(long.is_better_than(&short).unwrap());
        assert!(!short.is_better_than(&long).unwrap());
    }

    #[test]
    fn test_is_better_than_fork_superblocks_win() {
        // Same length after the fork; one branch carries superblocks.
        let base = build_chain(&[0; 6]);
        let plain = extend_chain(&base, &[0, 0, 0, 0, 0, 0], 1);
        let strong = extend_chain(&base, &[0, 2, 0, 2, 0, 2], 2);

        let plain_proof = proof_of(&plain, 2, 2);
        let strong_proof = proof_of(&strong, 2, 2);

        assert!(strong_proof.is_better_than(&plain_proof).unwrap());
        assert!(!plain_proof.is_better_than(&strong_proof).unwrap());
    }

    #[test]
    fn test_is_better_than_tie_break() {
        // m = 3 ignores the lone level-2 superblock in best_arg: both
        // branches score 4, the higher level decides.
        let base = build_chain(&[0; 4]);
        let flat = extend_chain(&base, &[0, 0, 0, 0], 1);
        let bumped = extend_chain(&base, &[0, 2, 0, 0], 2);

        let flat_proof = proof_of(&flat, 3, 1);
        let bumped_proof = proof_of(&bumped, 3, 1);

        assert!(bumped_proof.is_better_than(&flat_proof).unwrap());
        assert!(!flat_proof.is_better_than(&bumped_proof).unwrap());
    }

    #[test]
    fn test_is_better_than_different_genesis() {
        let a = build_chain(&[0; 5]);
        let b = extend_chain(&[], &[0; 5], 7);
        assert_ne!(a[0].id(), b[0].id());

        let pa = proof_of(&a, 1, 1);
        let pb = proof_of(&b, 1, 1);
        assert!(!pa.is_better_than(&pb).unwrap());
        assert!(!pb.is_better_than(&pa).unwrap());
    }

    #[test]
    fn test_is_better_than_invalid_input() {
        let chain = build_chain(&[0; 5]);
        let good = proof_of(&chain, 1, 1);
        let mut bad = good.clone();
        bad.k = 2;
        assert!(bad.is_better_than(&good).is_err());
        assert!(good.is_better_than(&bad).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let chain = build_chain(&[0, 1, 0, 0, 2, 0]);
        let proof = proof_of(&chain, 2, 2);
        let json = proof.to_json().unwrap();
        assert!(json.contains(r#""suffix":["#));

        let back = NipopowProof::from_json(&json).unwrap();
        assert_eq!(back, proof);
        assert!(back.is_valid());
    }

    #[test]
    fn test_json_node_layout() {
        let chain = build_chain(&[0; 5]);
        let proof = proof_of(&chain, 2, 2);
        let mut value: serde_json::Value = serde_json::from_str(&proof.to_json().unwrap()).unwrap();

        let suffix = value["suffix"].as_array().unwrap().clone();
        value.as_object_mut().unwrap().remove("suffix");
        value.as_object_mut().unwrap().remove("k");
        value["suffixHead"] = suffix[0].clone();
        value["suffixTail"] = serde_json::json!([suffix[1]["header"].clone()]);

        let back: NipopowProof = serde_json::from_value(value).unwrap();
        assert_eq!(back.k, 2);
        assert_eq!(back.suffix.len(), 2);
        assert!(back.suffix[1].interlinks.is_empty());
        assert!(back.is_valid());
    }

    #[test]
    fn test_json_defaults_and_errors() {
        let chain = build_chain(&[0; 3]);
        let header = serde_json::to_value(&chain[2]).unwrap();
        let genesis = serde_json::to_value(&chain[0]).unwrap();

        let minimal = serde_json::json!({"prefix": [genesis], "suffix": [header]});
        let proof: NipopowProof = serde_json::from_value(minimal).unwrap();
        assert_eq!(proof.m, crate::DEFAULT_M);
        assert_eq!(proof.k, 1);

        let both = serde_json::json!({"prefix": [], "suffix": [], "suffixHead": header});
        assert!(serde_json::from_value::<NipopowProof>(both).is_err());

        let neither = serde_json::json!({"prefix": []});
        assert!(matches!(
            NipopowProof::from_json(&neither.to_string()),
            Err(NipopowError::Decode(_))
        ));
    }
}
