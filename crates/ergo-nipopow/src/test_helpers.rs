//! Shared test helpers for NiPoPoW tests.

use crate::autolykos::group_order;
use crate::extension::Extension;
use crate::interlinks::pack_interlinks;
use crate::{AutolykosSolution, BlockHeader, NipopowAlgos, NipopowProof, PoPowHeader, PoPowParams};
use ergo_merkle::{BlockId, Digest32, EMPTY_MERKLE_ROOT};
use num_bigint::BigUint;

/// nBits of difficulty 1: the target is the whole group order.
pub const DIFFICULTY_ONE_N_BITS: u32 = 0x0101_0000;

fn make_header(height: u32, parent_id: BlockId, level: u32, extension_root: Digest32, salt: u64) -> BlockHeader {
    // hit = (q >> level) - 1 gives floor(log2(q / hit)) == level.
    let shifted = group_order() >> level.min(250);
    let pow_distance = shifted - BigUint::from(1u32);

    let header = BlockHeader {
        version: 1,
        id: BlockId::zero(),
        parent_id,
        ad_proofs_root: Digest32::zero(),
        state_root: [0u8; 33],
        transactions_root: Digest32::zero(),
        extension_root,
        timestamp: 1_561_978_800_000 + u64::from(height) * 120_000 + salt,
        n_bits: DIFFICULTY_ONE_N_BITS,
        height,
        votes: [0u8; 3],
        autolykos_solution: AutolykosSolution {
            miner_pk: [0x02; 33],
            pow_onetime_pk: Some([0x03; 33]),
            nonce: [0u8; 8],
            pow_distance: Some(pow_distance),
        },
    };
    header.with_computed_id().unwrap()
}

/// v1 header at `height` with superblock level `level` and a computed id.
pub fn test_header(height: u32, parent_id: BlockId, level: u32) -> BlockHeader {
    make_header(height, parent_id, level, Digest32::from(EMPTY_MERKLE_ROOT), 0)
}

/// Chain starting at genesis; `levels[i]` is the level of the header at
/// height `i + 1` (ignored for genesis).
pub fn build_chain(levels: &[u32]) -> Vec<PoPowHeader> {
    extend_chain(&[], levels, 0)
}

/// Continue `base` with one header per level. `salt` shifts timestamps so
/// that branches from the same base get distinct ids.
pub fn extend_chain(base: &[PoPowHeader], levels: &[u32], salt: u64) -> Vec<PoPowHeader> {
    let algos = NipopowAlgos::default();
    let mut chain = base.to_vec();

    for &level in levels {
        let (height, parent_id, interlinks) = match chain.last() {
            None => (1, BlockId::zero(), Vec::new()),
            Some(prev) => (
                prev.height() + 1,
                prev.id(),
                algos.next_interlinks(prev).unwrap(),
            ),
        };
        let fields = pack_interlinks(&interlinks);
        let root = Extension::new(BlockId::zero(), fields.clone()).digest();
        let header = make_header(height, parent_id, level, root, salt);
        let extension = Extension::new(header.id, fields);
        chain.push(PoPowHeader::from_block(header, &extension).unwrap());
    }

    chain
}

/// Proof over `chain` built with the default algorithms.
pub fn proof_of(chain: &[PoPowHeader], m: u32, k: u32) -> NipopowProof {
    NipopowAlgos::default()
        .prove(chain, &PoPowParams::new(m, k))
        .unwrap()
}
