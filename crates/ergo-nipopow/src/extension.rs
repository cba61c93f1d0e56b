//! Block extension: key-value fields committed to by the header's extension root.
//!
//! Each field becomes one Merkle leaf `[key.len] ++ key ++ value`; the tree
//! root over all fields in block order is the header's `extension_root`.
//! The interlinks vector lives in fields with key prefix
//! [`INTERLINKS_VECTOR_PREFIX`](crate::INTERLINKS_VECTOR_PREFIX).

use crate::interlinks::{is_interlinks_key, unpack_interlinks};
use crate::serialization::hex_array;
use crate::NipopowResult;
use ergo_merkle::{BatchMerkleProof, BlockId, Digest32, MerkleNode, MerkleProof, MerkleTree};
use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Extension field key size (bytes).
pub const FIELD_KEY_SIZE: usize = 2;

/// Maximum extension field value size (bytes).
pub const FIELD_VALUE_MAX_SIZE: usize = 64;

/// Extension field (key-value pair).
///
/// JSON form: `[key_hex, value_hex]`, as the node reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionField {
    /// Field key.
    pub key: [u8; FIELD_KEY_SIZE],
    /// Field value (0-64 bytes).
    pub value: Vec<u8>,
}

impl ExtensionField {
    /// Create a new extension field.
    pub fn new(key: [u8; FIELD_KEY_SIZE], value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Merkle leaf payload: `[key.len] ++ key ++ value`.
    pub fn leaf_data(&self) -> Vec<u8> {
        let mut leaf = Vec::with_capacity(1 + FIELD_KEY_SIZE + self.value.len());
        leaf.push(FIELD_KEY_SIZE as u8);
        leaf.extend_from_slice(&self.key);
        leaf.extend_from_slice(&self.value);
        leaf
    }
}

impl Serialize for ExtensionField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&hex::encode(self.key))?;
        tuple.serialize_element(&hex::encode(&self.value))?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for ExtensionField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (key, value) = <(String, String)>::deserialize(deserializer)?;
        let key = hex_array::decode(&key).map_err(D::Error::custom)?;
        let value = hex::decode(&value).map_err(D::Error::custom)?;
        if value.len() > FIELD_VALUE_MAX_SIZE {
            return Err(D::Error::custom(format!(
                "extension value of {} bytes exceeds {}",
                value.len(),
                FIELD_VALUE_MAX_SIZE
            )));
        }
        Ok(Self { key, value })
    }
}

/// Block extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    /// Header ID this extension belongs to.
    pub header_id: BlockId,
    /// Fields in block order (order affects the digest).
    pub fields: Vec<ExtensionField>,
}

impl Extension {
    /// Create a new extension.
    pub fn new(header_id: BlockId, fields: Vec<ExtensionField>) -> Self {
        Self { header_id, fields }
    }

    /// Create an empty extension.
    pub fn empty(header_id: BlockId) -> Self {
        Self::new(header_id, Vec::new())
    }

    /// Get a field value by key.
    pub fn get(&self, key: &[u8; FIELD_KEY_SIZE]) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| &f.key == key)
            .map(|f| f.value.as_slice())
    }

    /// Merkle tree over the fields.
    pub fn merkle_tree(&self) -> MerkleTree {
        MerkleTree::new(
            self.fields
                .iter()
                .map(|f| MerkleNode::from_bytes(f.leaf_data()))
                .collect(),
        )
    }

    /// Extension root, as committed in the header.
    pub fn digest(&self) -> Digest32 {
        self.merkle_tree().root_hash()
    }

    /// Unpacked interlinks vector.
    pub fn interlinks(&self) -> NipopowResult<Vec<BlockId>> {
        unpack_interlinks(&self.fields)
    }

    /// Batch proof for all interlinks fields, `None` when there are none.
    pub fn interlinks_proof(&self) -> Option<BatchMerkleProof> {
        let indices: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| is_interlinks_key(&f.key))
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return None;
        }
        self.merkle_tree().proof_by_indices(&indices)
    }

    /// Inclusion proof for the field with `key`.
    pub fn proof_for(&self, key: &[u8; FIELD_KEY_SIZE]) -> Option<MerkleProof> {
        let index = self.fields.iter().position(|f| &f.key == key)?;
        self.merkle_tree().proof_by_index(index)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interlinks::pack_interlinks;
    use ergo_merkle::{internal_hash, leaf_hash, EMPTY_MERKLE_ROOT};

    fn id(byte: u8) -> BlockId {
        BlockId::from([byte; 32])
    }

    #[test]
    fn test_empty_digest() {
        let ext = Extension::empty(id(0));
        assert_eq!(ext.digest(), Digest32::from(EMPTY_MERKLE_ROOT));
        assert!(ext.interlinks().unwrap().is_empty());
        assert!(ext.interlinks_proof().is_none());
    }

    #[test]
    fn test_leaf_layout() {
        let field = ExtensionField::new([0x00, 0x01], vec![0xAA, 0xBB]);
        assert_eq!(field.leaf_data(), vec![2, 0x00, 0x01, 0xAA, 0xBB]);

        let ext = Extension::new(id(0), vec![field.clone()]);
        let expected = internal_hash(Some(&leaf_hash(&field.leaf_data())), None);
        assert_eq!(ext.digest(), expected);
    }

    #[test]
    fn test_interlinks_with_other_fields() {
        let links = vec![id(1), id(2), id(2), id(3)];
        let mut fields = vec![ExtensionField::new([0x00, 0x01], vec![0, 0, 0, 7])];
        fields.extend(pack_interlinks(&links));
        fields.push(ExtensionField::new([0x02, 0x00], vec![1; 10]));
        let ext = Extension::new(id(9), fields);

        assert_eq!(ext.interlinks().unwrap(), links);

        let proof = ext.interlinks_proof().unwrap();
        let proven: Vec<u32> = proof.indices().iter().map(|i| i.index).collect();
        assert_eq!(proven, vec![1, 2, 3]);
        assert!(proof.valid(&ext.digest()));
    }

    #[test]
    fn test_field_proof() {
        let fields: Vec<ExtensionField> = (0u8..5)
            .map(|i| ExtensionField::new([0x00, i], vec![i; 4]))
            .collect();
        let ext = Extension::new(id(0), fields);
        let proof = ext.proof_for(&[0x00, 3]).unwrap();
        assert_eq!(proof.leaf_data(), &[2, 0x00, 3, 3, 3, 3, 3]);
        assert!(proof.valid(&ext.digest()));
        assert!(ext.proof_for(&[0x05, 0x05]).is_none());
        assert_eq!(ext.get(&[0x00, 2]), Some(&[2u8, 2, 2, 2][..]));
    }

    #[test]
    fn test_json_fields_as_pairs() {
        let ext = Extension::new(id(4), vec![ExtensionField::new([0x01, 0x00], vec![0x01, 0xFF])]);
        let json = ext.to_json().unwrap();
        assert!(json.contains(r#""fields":[["0100","01ff"]]"#));
        assert!(json.contains(r#""headerId""#));
        assert_eq!(Extension::from_json(&json).unwrap(), ext);

        let too_long = format!(
            r#"{{"headerId": "{}", "fields": [["0000", "{}"]]}}"#,
            id(4),
            "00".repeat(65)
        );
        assert!(Extension::from_json(&too_long).is_err());

        let bad_key = format!(r#"{{"headerId": "{}", "fields": [["000000", "00"]]}}"#, id(4));
        assert!(Extension::from_json(&bad_key).is_err());
    }
}
