//! Test data generators for integration tests.
//!
//! Builds authentic header chains through the public API: every header has
//! a computed id, a PoW distance that puts it at the requested superblock
//! level, and an extension root committing to its interlinks.

use ergo_merkle::{BlockId, Digest32, MerkleNode, MerkleTree};
use ergo_nipopow::{
    group_order, pack_interlinks, AutolykosSolution, BlockHeader, Extension, NipopowAlgos,
    NipopowProof, NipopowResult, PoPowHeader, PoPowParams, GENESIS_HEIGHT,
};
use num_bigint::BigUint;
use rand::Rng;

/// nBits of difficulty 1, so the target is the group order.
pub const TEST_N_BITS: u32 = 0x0101_0000;

/// First timestamp of generated chains (milliseconds).
pub const BASE_TIMESTAMP: u64 = 1_561_978_800_000;

/// Highest level the random generators produce.
pub const MAX_RANDOM_LEVEL: u32 = 12;

/// Generate a v1 header at `level`: its distance is `(q >> level) - 1`.
pub fn header_at_level(
    height: u32,
    parent_id: BlockId,
    level: u32,
    extension_root: Digest32,
    salt: u64,
) -> BlockHeader {
    let pow_distance = (group_order() >> level.min(250)) - BigUint::from(1u32);
    let header = BlockHeader {
        version: 1,
        id: BlockId::zero(),
        parent_id,
        ad_proofs_root: Digest32::zero(),
        state_root: [0u8; 33],
        transactions_root: Digest32::zero(),
        extension_root,
        timestamp: BASE_TIMESTAMP + u64::from(height) * 120_000 + salt,
        n_bits: TEST_N_BITS,
        height,
        votes: [0u8; 3],
        autolykos_solution: AutolykosSolution {
            miner_pk: [0x02; 33],
            pow_onetime_pk: Some([0x03; 33]),
            nonce: salt.to_be_bytes(),
            pow_distance: Some(pow_distance),
        },
    };
    header
        .with_computed_id()
        .expect("generated v1 header has a complete solution")
}

/// Generate a chain from genesis; `levels[i]` is the level of the header at
/// height `i + 1` (the genesis entry is ignored).
pub fn generate_chain(levels: &[u32]) -> Vec<PoPowHeader> {
    extend_chain(&[], levels, 0)
}

/// Extend `base` by one header per level. Branches grown from the same base
/// with different salts get different ids.
pub fn extend_chain(base: &[PoPowHeader], levels: &[u32], salt: u64) -> Vec<PoPowHeader> {
    extend_chain_with(base, levels, salt, |_| Digest32::zero())
}

/// Like [`extend_chain`], with the transactions root of each new header
/// taken from `transactions_root(height)`.
pub fn extend_chain_with(
    base: &[PoPowHeader],
    levels: &[u32],
    salt: u64,
    transactions_root: impl Fn(u32) -> Digest32,
) -> Vec<PoPowHeader> {
    let algos = NipopowAlgos::default();
    let mut chain = base.to_vec();

    for &level in levels {
        let (height, parent_id, interlinks) = match chain.last() {
            None => (GENESIS_HEIGHT, BlockId::zero(), Vec::new()),
            Some(prev) => (
                prev.height() + 1,
                prev.id(),
                algos
                    .next_interlinks(prev)
                    .expect("generated headers have levels"),
            ),
        };
        let fields = pack_interlinks(&interlinks);
        let extension_root = Extension::new(BlockId::zero(), fields.clone()).digest();

        let mut header = header_at_level(height, parent_id, level, extension_root, salt);
        header.transactions_root = transactions_root(height);
        let header = header
            .with_computed_id()
            .expect("generated v1 header has a complete solution");

        let extension = Extension::new(header.id, fields);
        let popow = PoPowHeader::from_block(header, &extension)
            .expect("packed interlinks unpack");
        chain.push(popow);
    }

    chain
}

/// Random levels where level μ has probability 2^-(μ+1), as with real PoW.
pub fn random_levels<R: Rng>(rng: &mut R, len: usize) -> Vec<u32> {
    (0..len)
        .map(|_| rng.gen::<u32>().trailing_zeros().min(MAX_RANDOM_LEVEL))
        .collect()
}

/// Random chain of `len` headers.
pub fn random_chain<R: Rng>(rng: &mut R, len: usize) -> Vec<PoPowHeader> {
    generate_chain(&random_levels(rng, len))
}

/// Two branches sharing the first `shared` headers, each growing
/// `branch_len` more with its own random levels.
pub fn random_fork<R: Rng>(
    rng: &mut R,
    shared: usize,
    branch_len: usize,
) -> (Vec<PoPowHeader>, Vec<PoPowHeader>) {
    let base = random_chain(rng, shared);
    let left = extend_chain(&base, &random_levels(rng, branch_len), 1);
    let right = extend_chain(&base, &random_levels(rng, branch_len), 2);
    (left, right)
}

/// Build a proof with the default algorithms.
pub fn prove(chain: &[PoPowHeader], m: u32, k: u32) -> NipopowResult<NipopowProof> {
    NipopowAlgos::default().prove(chain, &PoPowParams::new(m, k))
}

/// Random leaves of random sizes.
pub fn random_leaves<R: Rng>(rng: &mut R, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| {
            let len = rng.gen_range(1..=64);
            (0..len).map(|_| rng.gen()).collect()
        })
        .collect()
}

/// Merkle tree over the given leaves.
pub fn tree_of(leaves: &[Vec<u8>]) -> MerkleTree {
    MerkleTree::new(leaves.iter().cloned().map(MerkleNode::from_bytes).collect())
}
