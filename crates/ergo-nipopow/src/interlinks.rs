//! Interlinks packing, unpacking and maintenance.
//!
//! Interlinks are stored in block extensions as key-value pairs with prefix 0x01.
//!
//! Layout: `[genesis, highest level, ..., level 1]`. Element `len - μ` is the
//! most recent ancestor of level at least μ.

use crate::extension::{ExtensionField, FIELD_KEY_SIZE};
use crate::{BlockHeader, NipopowError, NipopowResult};
use ergo_merkle::{BlockId, DIGEST_SIZE};

/// Extension field prefix for interlinks vector.
pub const INTERLINKS_VECTOR_PREFIX: u8 = 0x01;

/// Check if an extension key belongs to the interlinks vector.
pub fn is_interlinks_key(key: &[u8; FIELD_KEY_SIZE]) -> bool {
    key[0] == INTERLINKS_VECTOR_PREFIX
}

/// Pack interlinks into extension fields.
///
/// Format:
/// - Key: [0x01, index_byte]
/// - Value: [duplicates_count_byte, modifier_id_32_bytes]
///
/// Run-length encodes consecutive duplicate block IDs.
pub fn pack_interlinks(links: &[BlockId]) -> Vec<ExtensionField> {
    let mut result = Vec::new();
    let mut idx: u8 = 0;

    let mut i = 0;
    while i < links.len() {
        let link = &links[i];

        // Max 255 duplicates per entry
        let count = links[i..]
            .iter()
            .take_while(|id| *id == link)
            .count()
            .min(255) as u8;

        let mut value = Vec::with_capacity(1 + DIGEST_SIZE);
        value.push(count);
        value.extend_from_slice(link.as_ref());

        result.push(ExtensionField::new([INTERLINKS_VECTOR_PREFIX, idx], value));

        i += count as usize;
        idx = idx.wrapping_add(1);
    }

    result
}

/// Unpack interlinks from extension fields.
///
/// Fields outside the interlinks prefix are ignored; a malformed interlinks
/// field is an error.
pub fn unpack_interlinks(fields: &[ExtensionField]) -> NipopowResult<Vec<BlockId>> {
    let mut interlink_fields: Vec<&ExtensionField> =
        fields.iter().filter(|f| is_interlinks_key(&f.key)).collect();
    interlink_fields.sort_by_key(|f| f.key[1]);

    let mut result = Vec::new();
    for field in interlink_fields {
        if field.value.len() != 1 + DIGEST_SIZE {
            return Err(NipopowError::InvalidInterlinks(format!(
                "field {} has {} bytes, expected {}",
                hex::encode(field.key),
                field.value.len(),
                1 + DIGEST_SIZE
            )));
        }
        let count = field.value[0] as usize;
        if count == 0 {
            return Err(NipopowError::InvalidInterlinks(format!(
                "field {} has zero count",
                hex::encode(field.key)
            )));
        }
        let block_id = BlockId::try_from(&field.value[1..])?;
        result.extend(std::iter::repeat(block_id).take(count));
    }

    Ok(result)
}

/// Interlinks of the block following `prev_header`.
///
/// `prev_level` is the superblock level of `prev_header`, `prev_interlinks`
/// its own interlinks vector.
pub fn update_interlinks(
    prev_header: &BlockHeader,
    prev_level: u32,
    prev_interlinks: &[BlockId],
) -> NipopowResult<Vec<BlockId>> {
    if prev_header.is_genesis() {
        return Ok(vec![prev_header.id]);
    }

    let (genesis, tail) = prev_interlinks.split_first().ok_or_else(|| {
        NipopowError::InvalidInterlinks(format!(
            "empty interlinks for non-genesis header at height {}",
            prev_header.height
        ))
    })?;

    if prev_level == 0 {
        return Ok(prev_interlinks.to_vec());
    }

    let level = prev_level as usize;
    let mut result = Vec::with_capacity(1 + tail.len().max(level));
    result.push(*genesis);
    if tail.len() > level {
        result.extend_from_slice(&tail[..tail.len() - level]);
    }
    result.extend(std::iter::repeat(prev_header.id).take(level));
    Ok(result)
}
