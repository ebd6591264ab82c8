//! Canonical record encoding.
//!
//! A [`Record`] is a set of named fields whose values are either non-negative
//! integers or `0x`-prefixed hex strings. Its canonical encoding sorts the
//! fields by key and joins the rendered values with commas: integers in
//! decimal, hex strings verbatim. Keys themselves are not part of the output.
//!
//! ```
//! use merklechain_core::encoding::{HexString, Record};
//!
//! let mut record = Record::new();
//! record.insert("nonce", 7u64).unwrap();
//! record.insert("miner", HexString::new("0xab").unwrap()).unwrap();
//! assert_eq!(record.encode(), "0xab,7");
//! ```

use crate::hash::{hash, Hash};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while building or decoding a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("field name is empty")]
    EmptyKey,

    #[error("field name {0:?} contains a separator or whitespace")]
    InvalidKey(String),

    #[error("field {0:?} appears more than once")]
    DuplicateField(String),

    #[error("{0:?} is not a 0x-prefixed hex string")]
    InvalidHex(String),

    #[error("unsupported field value: {0}")]
    UnsupportedValue(String),
}

pub type Result<T> = std::result::Result<T, EncodingError>;

/// A validated `0x`-prefixed hex string, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexString(String);

impl HexString {
    /// Validate and wrap a hex string. At least one digit must follow `0x`.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let valid = s
            .strip_prefix("0x")
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()));
        if valid {
            Ok(Self(s))
        } else {
            Err(EncodingError::InvalidHex(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 20-byte account address.
impl From<[u8; 20]> for HexString {
    fn from(address: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(address)))
    }
}

impl From<Hash> for HexString {
    fn from(hash: Hash) -> Self {
        Self(hash.to_string())
    }
}

impl Serialize for HexString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HexString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HexString::new(s).map_err(de::Error::custom)
    }
}

/// A single field value. The variant set is closed: anything else is
/// rejected when the record is built or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Int(u64),
    Hex(HexString),
}

impl FieldValue {
    fn render_into(&self, out: &mut String) {
        match self {
            FieldValue::Int(n) => out.push_str(&n.to_string()),
            FieldValue::Hex(h) => out.push_str(h.as_str()),
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Hex(_) => None,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(n.into())
    }
}

impl From<HexString> for FieldValue {
    fn from(h: HexString) -> Self {
        FieldValue::Hex(h)
    }
}

impl From<Hash> for FieldValue {
    fn from(h: Hash) -> Self {
        FieldValue::Hex(h.into())
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Int(n) => serializer.serialize_u64(*n),
            FieldValue::Hex(h) => h.serialize(serializer),
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or a 0x-prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Int(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<FieldValue, E> {
        u64::try_from(v).map(FieldValue::Int).map_err(|_| {
            E::custom(EncodingError::UnsupportedValue(format!("negative integer {v}")))
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<FieldValue, E> {
        Err(E::custom(EncodingError::UnsupportedValue(format!("float {v}"))))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<FieldValue, E> {
        Err(E::custom(EncodingError::UnsupportedValue(format!("boolean {v}"))))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FieldValue, E> {
        HexString::new(v).map(FieldValue::Hex).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<FieldValue, E> {
        Err(E::custom(EncodingError::UnsupportedValue("null".into())))
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// Normalize a field name: surrounding whitespace is dropped, and the result
/// must be non-empty with no interior whitespace or commas.
pub fn normalize_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(EncodingError::EmptyKey);
    }
    if key.chars().any(|c| c == ',' || c.is_whitespace()) {
        return Err(EncodingError::InvalidKey(key.to_string()));
    }
    Ok(key.to_string())
}

/// A structured record ready for canonical encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. Fails if the key is malformed or collides with an
    /// existing key after normalization.
    pub fn insert(&mut self, key: &str, value: impl Into<FieldValue>) -> Result<()> {
        let key = normalize_key(key)?;
        if self.fields.contains_key(&key) {
            return Err(EncodingError::DuplicateField(key));
        }
        self.fields.insert(key, value.into());
        Ok(())
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Insert a field whose key is already known to be normalized and unique.
    pub(crate) fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produce the canonical encoding.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, value) in self.fields.values().enumerate() {
            if i > 0 {
                out.push(',');
            }
            value.render_into(&mut out);
        }
        out
    }

    /// Hash the canonical encoding.
    pub fn hash(&self) -> Hash {
        hash(self.encode().as_bytes())
    }

    /// Split the encoding around the value of `key`, so that
    /// `prefix + rendered(value) + suffix == encode()` for any value.
    ///
    /// Returns `None` if the key is absent.
    pub fn split_at(&self, key: &str) -> Option<(String, String)> {
        if !self.fields.contains_key(key) {
            return None;
        }
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut seen = false;
        for (k, value) in &self.fields {
            if k == key {
                seen = true;
                continue;
            }
            if seen {
                suffix.push(',');
                value.render_into(&mut suffix);
            } else {
                value.render_into(&mut prefix);
                prefix.push(',');
            }
        }
        Some((prefix, suffix))
    }
}

/// Types with a canonical record representation.
pub trait Canonical {
    fn to_record(&self) -> Record;

    /// Hash of the canonical encoding; this is the object's identity.
    fn canonical_hash(&self) -> Hash {
        self.to_record().hash()
    }
}
