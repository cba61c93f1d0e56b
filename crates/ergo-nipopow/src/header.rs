//! Block header as seen by a light client.

use crate::serialization::{hex_array, optional_hex_array, put_vlq, vlq_size};
use crate::{NipopowError, NipopowResult};
use ergo_merkle::{blake2b256_hash, BlockId, Digest32, MerkleProof};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Height of the genesis block.
pub const GENESIS_HEIGHT: u32 = 1;

/// Header version that introduced Autolykos v2.
pub const AUTOLYKOS_V2_VERSION: u8 = 2;

/// Size of a compressed group element (miner and one-time keys).
pub const GROUP_ELEMENT_SIZE: usize = 33;

/// Size of the AVL+ state root (digest plus tree height byte).
pub const STATE_ROOT_SIZE: usize = 33;

/// Autolykos PoW solution.
///
/// Version 1 headers carry all four parts. From version 2 on only the miner
/// key and the nonce are part of the header bytes; nodes still report `w` and
/// `d` in JSON, and they are kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutolykosSolution {
    /// Miner public key.
    #[serde(rename = "pk", with = "hex_array")]
    pub miner_pk: [u8; GROUP_ELEMENT_SIZE],
    /// One-time public key (v1).
    #[serde(
        rename = "w",
        default,
        with = "optional_hex_array",
        skip_serializing_if = "Option::is_none"
    )]
    pub pow_onetime_pk: Option<[u8; GROUP_ELEMENT_SIZE]>,
    /// Nonce.
    #[serde(rename = "n", with = "hex_array")]
    pub nonce: [u8; 8],
    /// Distance `d` (v1).
    #[serde(
        rename = "d",
        default,
        with = "pow_distance",
        skip_serializing_if = "Option::is_none"
    )]
    pub pow_distance: Option<BigUint>,
}

/// Block header.
///
/// JSON follows the node REST shape. Unknown fields such as `size` or
/// `difficulty` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Header version.
    pub version: u8,
    /// Header id, `blake2b256(serialize())`.
    pub id: BlockId,
    /// Parent header id (all zeroes for genesis).
    pub parent_id: BlockId,
    /// Root of the AD proofs section.
    pub ad_proofs_root: Digest32,
    /// AVL+ state root after this block.
    #[serde(with = "hex_array")]
    pub state_root: [u8; STATE_ROOT_SIZE],
    /// Root of the transactions Merkle tree.
    pub transactions_root: Digest32,
    /// Root of the extension Merkle tree.
    #[serde(rename = "extensionHash", alias = "extensionRoot")]
    pub extension_root: Digest32,
    /// Block timestamp, milliseconds.
    pub timestamp: u64,
    /// Compact difficulty.
    pub n_bits: u32,
    /// Block height.
    pub height: u32,
    /// Miner votes.
    #[serde(with = "hex_array")]
    pub votes: [u8; 3],
    /// PoW solution.
    #[serde(rename = "powSolutions")]
    pub autolykos_solution: AutolykosSolution,
}

impl BlockHeader {
    /// Check if this is the genesis header.
    pub fn is_genesis(&self) -> bool {
        self.height == GENESIS_HEIGHT
    }

    /// Header bytes without the PoW solution (the message the miner signs).
    pub fn serialize_without_pow(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            1 + 32 * 4
                + STATE_ROOT_SIZE
                + vlq_size(self.timestamp)
                + 4
                + vlq_size(u64::from(self.height))
                + 3
                + 1,
        );
        buf.push(self.version);
        buf.extend_from_slice(self.parent_id.as_ref());
        buf.extend_from_slice(self.ad_proofs_root.as_ref());
        buf.extend_from_slice(self.transactions_root.as_ref());
        buf.extend_from_slice(&self.state_root);
        put_vlq(&mut buf, self.timestamp);
        buf.extend_from_slice(self.extension_root.as_ref());
        buf.extend_from_slice(&self.n_bits.to_be_bytes());
        put_vlq(&mut buf, u64::from(self.height));
        buf.extend_from_slice(&self.votes);
        if self.version >= AUTOLYKOS_V2_VERSION {
            // No unparsed bytes.
            buf.push(0);
        }
        buf
    }

    /// Full header bytes.
    pub fn serialize(&self) -> NipopowResult<Vec<u8>> {
        let mut buf = self.serialize_without_pow();
        let solution = &self.autolykos_solution;
        buf.extend_from_slice(&solution.miner_pk);

        if self.version < AUTOLYKOS_V2_VERSION {
            let (w, d) = match (&solution.pow_onetime_pk, &solution.pow_distance) {
                (Some(w), Some(d)) => (w, d),
                _ => return Err(NipopowError::IncompleteSolution(self.id)),
            };
            buf.extend_from_slice(w);
            buf.extend_from_slice(&solution.nonce);
            // Signed big-endian, so a set top bit needs a leading zero.
            let mut d_bytes = d.to_bytes_be();
            if d_bytes[0] & 0x80 != 0 {
                d_bytes.insert(0, 0);
            }
            let len =
                u8::try_from(d_bytes.len()).map_err(|_| NipopowError::IncompleteSolution(self.id))?;
            buf.push(len);
            buf.extend_from_slice(&d_bytes);
        } else {
            buf.extend_from_slice(&solution.nonce);
        }

        Ok(buf)
    }

    /// Id computed from the header bytes.
    pub fn compute_id(&self) -> NipopowResult<BlockId> {
        Ok(blake2b256_hash(&self.serialize()?))
    }

    /// Check that the declared id matches the header bytes.
    pub fn verify_id(&self) -> NipopowResult<()> {
        let computed = self.compute_id()?;
        if computed != self.id {
            return Err(NipopowError::InvalidHeaderId {
                height: self.height,
                declared: self.id,
                computed,
            });
        }
        Ok(())
    }

    /// Replace the id with the one computed from the header bytes.
    pub fn with_computed_id(mut self) -> NipopowResult<Self> {
        self.id = self.compute_id()?;
        Ok(self)
    }

    /// Check that a transaction proof leads to this header's transactions root.
    pub fn contains_transaction(&self, proof: &MerkleProof) -> bool {
        proof.valid(&self.transactions_root)
    }

    /// Decode from node JSON.
    pub fn from_json(json: &str) -> NipopowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode to node JSON.
    pub fn to_json(&self) -> NipopowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `d` as a JSON number, or a decimal string when it does not fit in u64.
mod pow_distance {
    use num_bigint::BigUint;
    use num_traits::{FromPrimitive, ToPrimitive};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(d: &Option<BigUint>, serializer: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => match d.to_u64() {
                Some(v) => serializer.serialize_u64(v),
                None => serializer.serialize_str(&d.to_str_radix(10)),
            },
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Int(v)) => Ok(Some(BigUint::from(v))),
            Some(Raw::Text(s)) => BigUint::parse_bytes(s.as_bytes(), 10)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid pow distance: {}", s))),
            // Large JSON numbers arrive as floats and lose their low bits.
            Some(Raw::Float(f)) => BigUint::from_f64(f)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid pow distance: {}", f))),
        }
    }
}
