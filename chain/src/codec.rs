//! Hash and codec primitives shared by the rest of the crate.
//!
//! This is the lowest layer: a 32-byte SHA-256 digest type, big-endian
//! fixed-width integer helpers, and a total Base58 (Bitcoin alphabet)
//! codec. Nothing above this module should reach for `sha2` or `bs58`
//! directly — go through [`Hash32`] and [`base58`] instead, so the
//! choice of hash function and text encoding stays in one place.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of every hash produced by [`Hash32::compute`].
pub const HASH_LEN: usize = 32;

/// A SHA-256 digest, used throughout the crate as the one hash type.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash32(pub [u8; HASH_LEN]);

impl Hash32 {
    /// The all-zero hash, used as the Merkle padding sentinel and as the
    /// genesis block's parent id placeholder.
    pub const ZERO: Hash32 = Hash32([0u8; HASH_LEN]);

    /// Computes `SHA-256(data)`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash32(out)
    }

    /// Computes `SHA-256(a || b)`, the pairwise fold used by the Merkle tree.
    pub fn compute_pair(a: &Hash32, b: &Hash32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(a.0);
        hasher.update(b.0);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash32(out)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

/// Errors raised by the codec primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid encoding")]
    InvalidEncoding,
}

/// Big-endian fixed-width integer helpers.
///
/// These exist so call sites read as "serialize at this declared width"
/// rather than reaching for `to_be_bytes` ad hoc at every call site.
pub mod be {
    pub fn write_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(out: &mut Vec<u8>, v: u64) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn read_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
        let bytes = buf.get(*pos..*pos + 4)?;
        *pos += 4;
        Some(u32::from_be_bytes(bytes.try_into().ok()?))
    }

    pub fn read_u64(buf: &[u8], pos: &mut usize) -> Option<u64> {
        let bytes = buf.get(*pos..*pos + 8)?;
        *pos += 8;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }

    pub fn read_bytes<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Option<&'a [u8]> {
        let slice = buf.get(*pos..*pos + len)?;
        *pos += len;
        Some(slice)
    }
}

/// Base58 (Bitcoin alphabet) encoding, total for valid inputs.
pub mod base58 {
    use super::CodecError;

    pub fn encode(bytes: &[u8]) -> String {
        bs58::encode(bytes).into_string()
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, CodecError> {
        bs58::decode(s)
            .into_vec()
            .map_err(|_| CodecError::InvalidEncoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = Hash32::compute(b"hello");
        let b = Hash32::compute(b"hello");
        assert_eq!(a, b);
        assert_ne!(a, Hash32::compute(b"world"));
    }

    #[test]
    fn pair_hash_is_order_sensitive() {
        let a = Hash32::compute(b"left");
        let b = Hash32::compute(b"right");
        assert_ne!(Hash32::compute_pair(&a, &b), Hash32::compute_pair(&b, &a));
    }

    #[test]
    fn base58_roundtrips() {
        let data = vec![0u8, 1, 2, 250, 251, 252, 253, 254, 255];
        let encoded = base58::encode(&data);
        let decoded = base58::decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn base58_rejects_invalid_characters() {
        // '0', 'O', 'I', 'l' are excluded from the Bitcoin alphabet.
        let err = base58::decode("invalid0").unwrap_err();
        assert_eq!(err, CodecError::InvalidEncoding);
    }

    #[test]
    fn be_roundtrips_u32_and_u64() {
        let mut buf = Vec::new();
        be::write_u32(&mut buf, 0xdead_beef);
        be::write_u64(&mut buf, 0x0102_0304_0506_0708);

        let mut pos = 0;
        assert_eq!(be::read_u32(&buf, &mut pos), Some(0xdead_beef));
        assert_eq!(be::read_u64(&buf, &mut pos), Some(0x0102_0304_0506_0708));
        assert_eq!(pos, buf.len());
    }
}
