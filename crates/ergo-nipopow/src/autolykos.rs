//! Autolykos PoW hit and superblock level.
//!
//! A light client never checks the full PoW rules; it needs the hit (the
//! value compared against the target) to classify headers by level:
//!
//! - Version 1 headers carry the hit directly as the distance `d`.
//! - Version 2 headers derive it from the header bytes and the nonce:
//!   1. `msg = H(header_without_pow)`
//!   2. `i = H(msg || nonce)[24..32] mod N`, the seed index
//!   3. `seed = H(H(i || height || M)[1..] || msg || nonce)`
//!   4. k = 32 table indexes from 4-byte windows over the seed
//!   5. `hit = H(Σ H(index || height || M)[1..])`
//!
//! `M` is the numbers 0..1024 as 8-byte big-endian words, and the table
//! size N grows by 5% every 51200 blocks from height 614400 on.
//!
//! A header's level is `floor(log2(target / hit))` where `target = q / difficulty`
//! and q is the secp256k1 group order.

use crate::{BlockHeader, NipopowError, NipopowResult};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::sync::OnceLock;
use tracing::trace;

type Blake2b256 = Blake2b<U32>;

/// Number of table elements summed per solution.
pub const AUTOLYKOS_K: u32 = 32;

/// Base table size exponent, N = 2^26.
pub const AUTOLYKOS_N_BASE_LOG2: u32 = 26;

/// Smallest base exponent whose table survives the 5% growth steps.
pub const MIN_N_BASE_LOG2: u32 = 7;

/// Height from which the table size starts growing.
pub const N_INCREASE_START: u32 = 600 * 1024;

/// Blocks between table size increases.
pub const N_INCREASE_PERIOD: u32 = 50 * 1024;

/// Height after which the table size stays fixed.
pub const N_MAX_HEIGHT: u32 = 4_198_400;

/// secp256k1 group order.
const GROUP_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// secp256k1 group order q.
pub fn group_order() -> BigUint {
    BigUint::from_bytes_be(&GROUP_ORDER)
}

/// `M`: 1024 big-endian u64 words.
fn big_m() -> &'static [u8] {
    static BIG_M: OnceLock<Vec<u8>> = OnceLock::new();
    BIG_M.get_or_init(|| (0u64..1024).flat_map(|i| i.to_be_bytes()).collect())
}

/// Decode the compact (Bitcoin MPI) difficulty encoding used by `nBits`.
///
/// Fails for negative or zero difficulty.
pub fn decode_compact_bits(n_bits: u32) -> NipopowResult<BigUint> {
    let size = (n_bits >> 24) as usize;
    let mantissa = n_bits & 0x00FF_FFFF;
    if size == 0 {
        return Err(NipopowError::InvalidDifficulty(n_bits));
    }

    // Sign bit of the first MPI byte.
    if (mantissa >> 16) & 0x80 != 0 {
        return Err(NipopowError::InvalidDifficulty(n_bits));
    }

    let word = mantissa & 0x007F_FFFF;
    let difficulty = if size <= 3 {
        BigUint::from(word >> (8 * (3 - size)))
    } else {
        BigUint::from(word) << (8 * (size - 3))
    };

    if difficulty.is_zero() {
        return Err(NipopowError::InvalidDifficulty(n_bits));
    }
    Ok(difficulty)
}

/// Target a hit must stay below for the given `nBits`.
pub fn target_from_n_bits(n_bits: u32) -> NipopowResult<BigUint> {
    Ok(group_order() / decode_compact_bits(n_bits)?)
}

/// `floor(log2(target / hit))`, 0 when the hit does not beat the target.
pub fn level_of_hit(target: &BigUint, hit: &BigUint) -> u32 {
    let ratio = if hit.is_zero() {
        target.clone()
    } else {
        target / hit
    };
    match ratio.bits() {
        0 => 0,
        bits => (bits - 1).to_u32().unwrap_or(u32::MAX),
    }
}

/// Autolykos PoW parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutolykosPowScheme {
    /// Number of table elements summed.
    k: u32,
    /// Base table size exponent.
    n_log2: u32,
}

impl Default for AutolykosPowScheme {
    fn default() -> Self {
        Self {
            k: AUTOLYKOS_K,
            n_log2: AUTOLYKOS_N_BASE_LOG2,
        }
    }
}

impl AutolykosPowScheme {
    /// Create a scheme with custom parameters.
    ///
    /// `n_log2` must lie in `MIN_N_BASE_LOG2..=AUTOLYKOS_N_BASE_LOG2` so the
    /// table size stays non-zero and fits a `u32` at every height.
    pub fn new(k: u32, n_log2: u32) -> NipopowResult<Self> {
        if !(MIN_N_BASE_LOG2..=AUTOLYKOS_N_BASE_LOG2).contains(&n_log2) {
            return Err(NipopowError::InvalidPowParams(format!(
                "table size exponent {} outside {}..={}",
                n_log2, MIN_N_BASE_LOG2, AUTOLYKOS_N_BASE_LOG2
            )));
        }
        if k == 0 {
            return Err(NipopowError::InvalidPowParams(
                "k must be at least 1".to_string(),
            ));
        }
        Ok(Self { k, n_log2 })
    }

    /// The k parameter.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Table size N for a header version and height.
    pub fn calc_n(&self, version: u8, height: u32) -> u32 {
        let base = 1u32 << self.n_log2;
        if version == 1 {
            return base;
        }
        let height = height.min(N_MAX_HEIGHT);
        if height < N_INCREASE_START {
            return base;
        }
        let iterations = (height - N_INCREASE_START) / N_INCREASE_PERIOD + 1;
        (0..iterations).fold(base, |n, _| n / 100 * 105)
    }

    /// PoW hit of a header.
    pub fn pow_hit(&self, header: &BlockHeader) -> NipopowResult<BigUint> {
        if header.version == 1 {
            return header
                .autolykos_solution
                .pow_distance
                .clone()
                .ok_or(NipopowError::IncompleteSolution(header.id));
        }

        let n = self.calc_n(header.version, header.height);
        let header_bytes = header.serialize_without_pow();
        let msg = hash(&[header_bytes.as_slice()]);
        let nonce = &header.autolykos_solution.nonce;
        let height_bytes = header.height.to_be_bytes();

        let seed = self.calc_seed(&msg, nonce, &height_bytes, n);
        let indexes = self.gen_indexes(&seed, n);

        let sum = indexes.iter().fold(BigUint::zero(), |acc, index| {
            let element = hash(&[&index.to_be_bytes()[..], &height_bytes[..], big_m()]);
            acc + BigUint::from_bytes_be(&element[1..])
        });

        let hit = BigUint::from_bytes_be(&hash(&[&to_32_bytes(&sum)[..]]));
        trace!(
            height = header.height,
            n,
            hit = %hit,
            "Computed Autolykos v2 hit"
        );
        Ok(hit)
    }

    /// Superblock level of a header; genesis has the maximal level.
    pub fn max_level_of(&self, header: &BlockHeader) -> NipopowResult<u32> {
        if header.is_genesis() {
            return Ok(u32::MAX);
        }
        let target = target_from_n_bits(header.n_bits)?;
        let hit = self.pow_hit(header)?;
        Ok(level_of_hit(&target, &hit))
    }

    /// Check that the hit is below the target.
    pub fn check_pow(&self, header: &BlockHeader) -> NipopowResult<bool> {
        let target = target_from_n_bits(header.n_bits)?;
        Ok(self.pow_hit(header)? < target)
    }

    fn calc_seed(&self, msg: &[u8; 32], nonce: &[u8; 8], height: &[u8; 4], n: u32) -> [u8; 32] {
        let prei = hash(&[&msg[..], &nonce[..]]);
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&prei[24..]);
        let i = (u64::from_be_bytes(tail) % u64::from(n)) as u32;

        let f = hash(&[&i.to_be_bytes()[..], &height[..], big_m()]);
        hash(&[&f[1..], &msg[..], &nonce[..]])
    }

    fn gen_indexes(&self, seed: &[u8; 32], n: u32) -> Vec<u32> {
        let mut extended = seed.to_vec();
        extended.extend_from_slice(&seed[..3]);
        (0..self.k as usize)
            .map(|i| {
                let mut word = [0u8; 4];
                word.copy_from_slice(&extended[i..i + 4]);
                u32::from_be_bytes(word) % n
            })
            .collect()
    }
}

/// Blake2b256 over concatenated parts.
fn hash(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Left-pad to 32 bytes; longer values keep their low 32 bytes.
fn to_32_bytes(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; 32];
    let take = bytes.len().min(32);
    out[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}
