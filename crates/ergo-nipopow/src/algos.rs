//! Core NiPoPoW algorithms.
//!
//! Implements the key algorithms from the KMZ17 paper.

use crate::interlinks::update_interlinks;
use crate::{
    AutolykosPowScheme, BlockHeader, NipopowError, NipopowProof, NipopowResult, PoPowHeader,
    PoPowParams,
};
use ergo_merkle::BlockId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Highest level tracked when counting superblocks. Genesis reports
/// `u32::MAX` and is clamped to this.
pub const MAX_LEVEL: u32 = 255;

/// NiPoPoW algorithms for proof generation and comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct NipopowAlgos {
    /// PoW scheme used to derive header levels.
    pub pow_scheme: AutolykosPowScheme,
}

impl NipopowAlgos {
    /// Create algorithms over a custom PoW scheme.
    pub fn new(pow_scheme: AutolykosPowScheme) -> Self {
        Self { pow_scheme }
    }

    /// Level (μ) of a header. Genesis returns u32::MAX.
    pub fn max_level_of(&self, header: &BlockHeader) -> NipopowResult<u32> {
        self.pow_scheme.max_level_of(header)
    }

    /// Levels of a chain segment, in order.
    pub fn levels_of(&self, chain: &[&BlockHeader]) -> NipopowResult<Vec<u32>> {
        chain.iter().map(|h| self.max_level_of(h)).collect()
    }

    /// Compute the best argument (proof score) for a chain segment.
    pub fn best_arg(&self, chain: &[&BlockHeader], m: u32) -> NipopowResult<u64> {
        Ok(best_arg(&self.levels_of(chain)?, m))
    }

    /// Interlinks of the block following `prev`.
    pub fn next_interlinks(&self, prev: &PoPowHeader) -> NipopowResult<Vec<BlockId>> {
        let level = self.max_level_of(&prev.header)?;
        update_interlinks(&prev.header, level, &prev.interlinks)
    }

    /// Build a proof for `chain` (genesis first, ascending heights).
    ///
    /// The suffix is the last k headers. The prefix is built top-down from
    /// the highest interlinks level of the last prefix candidate: at every
    /// level the superblocks above the current anchor are kept, and once
    /// there are at least m of them the m-th from the end becomes the anchor
    /// for the level below.
    pub fn prove(&self, chain: &[PoPowHeader], params: &PoPowParams) -> NipopowResult<NipopowProof> {
        params.validate()?;
        let (m, k) = (params.m as usize, params.k as usize);

        if chain.len() < m + k {
            return Err(NipopowError::ChainTooShort {
                len: chain.len(),
                required: m + k,
            });
        }
        if !chain[0].is_genesis() {
            return Err(NipopowError::NotAnchored);
        }

        let (body, suffix) = chain.split_at(chain.len() - k);
        let levels: Vec<u32> = body
            .iter()
            .map(|h| self.max_level_of(&h.header))
            .collect::<NipopowResult<_>>()?;
        let max_level = body
            .last()
            .map_or(0, |h| h.interlinks.len().saturating_sub(1)) as u32;

        let mut selected: BTreeMap<u32, usize> = BTreeMap::new();
        let mut anchor_height = chain[0].height();
        for level in (0..=max_level).rev() {
            let sub_chain: Vec<usize> = (0..body.len())
                .filter(|&i| levels[i] >= level && body[i].height() >= anchor_height)
                .collect();
            for &i in &sub_chain {
                selected.insert(body[i].height(), i);
            }
            if sub_chain.len() >= m {
                anchor_height = body[sub_chain[sub_chain.len() - m]].height();
            }
        }

        let prefix: Vec<PoPowHeader> = selected.values().map(|&i| body[i].clone()).collect();
        debug!(
            chain_len = chain.len(),
            prefix_len = prefix.len(),
            max_level,
            m = params.m,
            k = params.k,
            "Built NiPoPoW proof"
        );
        Ok(NipopowProof::new(params.m, params.k, prefix, suffix.to_vec()))
    }
}

/// Compute the best argument (proof score) for a chain.
///
/// # Arguments
/// * `levels` - Levels of all headers in the chain segment
/// * `m` - Minimum superchain length
///
/// # Returns
/// Best score = max(2^μ × count) over level 0 and every level μ ≥ 1 with at
/// least m superblocks. Saturates at `u64::MAX`.
pub fn best_arg(levels: &[u32], m: u32) -> u64 {
    if levels.is_empty() {
        return 0;
    }

    // Level 0: all blocks count
    let mut best_score = levels.len() as u64;

    let mut level: u32 = 1;
    while level <= MAX_LEVEL {
        let superblock_count = levels.iter().filter(|&&l| l >= level).count();
        if superblock_count < m as usize || superblock_count == 0 {
            break;
        }
        let score = 1u64
            .checked_shl(level)
            .map_or(u64::MAX, |weight| weight.saturating_mul(superblock_count as u64));
        best_score = best_score.max(score);
        level += 1;
    }

    best_score
}

/// Count superblocks at each level in a chain segment.
///
/// Returns a Vec where index is level and value is the count of headers with
/// at least that level.
pub fn count_superblocks_by_level(levels: &[u32]) -> Vec<usize> {
    let Some(max_level) = levels.iter().map(|&l| l.min(MAX_LEVEL)).max() else {
        return Vec::new();
    };
    let mut counts = vec![0usize; max_level as usize + 1];

    for &level in levels {
        // A block at level L is also a superblock at all levels < L
        for count in counts.iter_mut().take(level.min(MAX_LEVEL) as usize + 1) {
            *count += 1;
        }
    }

    counts
}

/// Tie-break between two segments with equal scores.
///
/// Walks the per-level superblock counts from the highest occupied level
/// down to level 0; the first level where the counts differ decides.
pub fn compare_superblock_counts(left: &[u32], right: &[u32]) -> Ordering {
    let left = count_superblocks_by_level(left);
    let right = count_superblocks_by_level(right);
    let top = left.len().max(right.len());
    (0..top)
        .rev()
        .map(|level| {
            let l = left.get(level).copied().unwrap_or(0);
            let r = right.get(level).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Last header of `left` whose id also occurs in `right`.
pub fn lowest_common_ancestor<'a>(
    left: &[&'a BlockHeader],
    right: &[&BlockHeader],
) -> Option<&'a BlockHeader> {
    let right_ids: HashSet<BlockId> = right.iter().map(|h| h.id).collect();
    left.iter().rev().find(|h| right_ids.contains(&h.id)).copied()
}
