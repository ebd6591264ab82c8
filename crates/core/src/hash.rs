//! SHA-256 hashing utilities for the ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw SHA-256 digest bytes.
pub type H256 = [u8; 32];

/// Errors produced while parsing a textual hash.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("invalid hex digits in hash")]
    InvalidHex,
    #[error("hash must be 64 hex digits, got {0}")]
    InvalidLength(usize),
}

/// A wrapper type for H256 rendered as a `0x`-prefixed lowercase hex string.
///
/// Byte-wise ordering of two hashes coincides with the lexicographic ordering
/// of their hex renderings, since the renderings are fixed-width lowercase.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash(pub H256);

impl Hash {
    /// The null hash (all zeros), used as the empty Merkle root, the padding
    /// node for odd Merkle levels, and the genesis previous hash.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string (without the 0x prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(HashParseError::InvalidLength(digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|_| HashParseError::InvalidHex)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Whether this is the null hash.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Count the leading zero hex digits of the rendered hash.
    pub fn leading_zero_digits(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }

    /// Whether the rendered hash starts with at least `difficulty` zero digits.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_digits() >= difficulty
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// SHA-256 of `data`.
pub fn hash(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// SHA-256 over the concatenation of `parts`.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(b"ledger"), hash(b"ledger"));
        assert_ne!(hash(b"ledger"), hash(b"ledger "));
    }

    #[test]
    fn test_hash_known_answer() {
        assert_eq!(
            hash(b"abc").to_string(),
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = hash(b"test data");
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(h.to_string().parse::<Hash>().unwrap(), h);
    }

    #[test]
    fn test_hash_display() {
        let display = format!("{}", hash(b"test"));
        assert!(display.starts_with("0x"));
        assert_eq!(display.len(), 66);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert_eq!(Hash::from_hex("0x1234"), Err(HashParseError::InvalidLength(4)));
        let bad = format!("0x{}", "zz".repeat(32));
        assert_eq!(Hash::from_hex(&bad), Err(HashParseError::InvalidHex));
    }

    #[test]
    fn test_hash_concat() {
        let h1 = hash_concat(&[b"hello", b"world"]);
        let h2 = hash(b"helloworld");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_leading_zero_digits() {
        assert_eq!(Hash::ZERO.leading_zero_digits(), 64);

        let mut bytes = [0xffu8; 32];
        assert_eq!(Hash(bytes).leading_zero_digits(), 0);
        bytes[0] = 0x0f;
        assert_eq!(Hash(bytes).leading_zero_digits(), 1);
        bytes[0] = 0x00;
        bytes[1] = 0x0a;
        assert_eq!(Hash(bytes).leading_zero_digits(), 3);
        assert!(Hash(bytes).meets_difficulty(3));
        assert!(!Hash(bytes).meets_difficulty(4));
    }

    #[test]
    fn test_ordering_matches_hex_ordering() {
        let a = hash(b"a");
        let b = hash(b"b");
        assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
    }

    #[test]
    fn test_serde_as_prefixed_string() {
        let h = hash(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
