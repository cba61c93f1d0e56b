//! 32-byte digests and prefixed Blake2b256 hashing.

use crate::{MerkleError, MerkleResult};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of a digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Prefix byte for leaf hashes.
pub const LEAF_PREFIX: u8 = 0;

/// Prefix byte for internal node hashes.
pub const INTERNAL_PREFIX: u8 = 1;

type Blake2b256 = Blake2b<U32>;

/// A 32-byte hash value.
///
/// Used as block id, leaf digest and Merkle node digest. Equality and
/// ordering are byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest32([u8; DIGEST_SIZE]);

/// Block (header) identifier.
pub type BlockId = Digest32;

impl Digest32 {
    /// All-zero digest (parent id of the genesis block).
    pub const fn zero() -> Self {
        Self([0u8; DIGEST_SIZE])
    }

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from a hex string of exactly 64 characters.
    pub fn from_hex(s: &str) -> MerkleResult<Self> {
        let bytes = hex::decode(s)?;
        Self::try_from(bytes.as_slice())
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest32 {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Digest32> for [u8; DIGEST_SIZE] {
    fn from(digest: Digest32) -> Self {
        digest.0
    }
}

impl TryFrom<&[u8]> for Digest32 {
    type Error = MerkleError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; DIGEST_SIZE] =
            bytes
                .try_into()
                .map_err(|_| MerkleError::InvalidDigestLength {
                    expected: DIGEST_SIZE,
                    got: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl TryFrom<Vec<u8>> for Digest32 {
    type Error = MerkleError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(bytes.as_slice())
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Digest32 {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({})", self.to_hex())
    }
}

impl Serialize for Digest32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for optional digests written as hex, empty string meaning absent.
pub(crate) mod optional_hex {
    use super::Digest32;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        digest: &Option<Digest32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match digest {
            Some(d) => serializer.serialize_str(&d.to_hex()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Digest32>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }

    pub fn decode(s: &str) -> crate::MerkleResult<Option<Digest32>> {
        if s.is_empty() {
            Ok(None)
        } else {
            Digest32::from_hex(s).map(Some)
        }
    }
}

/// Blake2b256 hash of `data`.
pub fn blake2b256_hash(data: &[u8]) -> Digest32 {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    Digest32(hasher.finalize().into())
}

/// `H(prefix || data)`.
pub fn prefixed_hash(prefix: u8, data: &[u8]) -> Digest32 {
    let mut hasher = Blake2b256::new();
    hasher.update([prefix]);
    hasher.update(data);
    Digest32(hasher.finalize().into())
}

/// `H(prefix || left || right)`, absent parts contribute no bytes.
pub fn prefixed_hash2(prefix: u8, left: Option<&Digest32>, right: Option<&Digest32>) -> Digest32 {
    let mut hasher = Blake2b256::new();
    hasher.update([prefix]);
    if let Some(left) = left {
        hasher.update(left.as_bytes());
    }
    if let Some(right) = right {
        hasher.update(right.as_bytes());
    }
    Digest32(hasher.finalize().into())
}

/// Digest of a tree leaf holding `data`.
pub fn leaf_hash(data: &[u8]) -> Digest32 {
    prefixed_hash(LEAF_PREFIX, data)
}

/// Digest of an internal node.
pub fn internal_hash(left: Option<&Digest32>, right: Option<&Digest32>) -> Digest32 {
    prefixed_hash2(INTERNAL_PREFIX, left, right)
}
