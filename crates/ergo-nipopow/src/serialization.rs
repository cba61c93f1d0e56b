//! Scorex-style binary writing helpers.
//!
//! Unsigned integers in header bytes use VLQ: little-endian groups of 7 bits,
//! bit 7 set on every byte except the last.

/// Append `value` as VLQ.
pub fn put_vlq(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Number of bytes `value` takes as VLQ.
pub fn vlq_size(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 6) / 7
}

/// Serde helper for fixed-size byte arrays written as hex.
pub(crate) mod hex_array {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(D::Error::custom)
    }

    pub fn decode<const N: usize>(s: &str) -> Result<[u8; N], String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| format!("expected {} bytes, got {}", N, len))
    }
}

/// Like [`hex_array`] for optional fields; absent or `null` means `None`.
pub(crate) mod optional_hex_array {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &Option<[u8; N]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<Option<[u8; N]>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::hex_array::decode(&s).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
