//! Transaction records.

use crate::encoding::{normalize_key, Canonical, EncodingError, FieldValue, HexString, Record};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names with a fixed meaning; extra fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 5] = ["amount", "lock_time", "recipient", "sender", "transaction_fee"];

/// A pending or confirmed transfer. Immutable once built; its identity is the
/// hash of its canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction")]
pub struct Transaction {
    sender: HexString,
    recipient: HexString,
    amount: u64,
    transaction_fee: u64,
    lock_time: u64,
    #[serde(flatten)]
    extra: BTreeMap<String, FieldValue>,
}

/// Wire shape, validated into a [`Transaction`].
#[derive(Deserialize)]
struct RawTransaction {
    sender: HexString,
    recipient: HexString,
    amount: u64,
    transaction_fee: u64,
    lock_time: u64,
    #[serde(flatten)]
    extra: BTreeMap<String, FieldValue>,
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = EncodingError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let mut tx = Transaction::new(
            raw.sender,
            raw.recipient,
            raw.amount,
            raw.transaction_fee,
            raw.lock_time,
        );
        for (key, value) in raw.extra {
            tx = tx.with_field(&key, value)?;
        }
        Ok(tx)
    }
}

impl Transaction {
    /// Create a transaction with only the standard fields.
    pub fn new(
        sender: HexString,
        recipient: HexString,
        amount: u64,
        transaction_fee: u64,
        lock_time: u64,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            transaction_fee,
            lock_time,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an additional field (e.g. a nonce or signature).
    pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Result<Self, EncodingError> {
        let key = normalize_key(key)?;
        if RESERVED_FIELDS.contains(&key.as_str()) || self.extra.contains_key(&key) {
            return Err(EncodingError::DuplicateField(key));
        }
        self.extra.insert(key, value.into());
        Ok(self)
    }

    pub fn sender(&self) -> &HexString {
        &self.sender
    }

    pub fn recipient(&self) -> &HexString {
        &self.recipient
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn transaction_fee(&self) -> u64 {
        self.transaction_fee
    }

    pub fn lock_time(&self) -> u64 {
        self.lock_time
    }

    /// Look up an additional field by name.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.extra.get(key)
    }

    pub fn extra_fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra
    }

    /// Whether the transaction may be included in a block with this timestamp.
    pub fn is_unlocked_at(&self, timestamp: u64) -> bool {
        self.lock_time < timestamp
    }

    /// The transaction hash.
    pub fn hash(&self) -> Hash {
        self.canonical_hash()
    }
}

impl Canonical for Transaction {
    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set("sender", self.sender.clone());
        record.set("recipient", self.recipient.clone());
        record.set("amount", self.amount);
        record.set("transaction_fee", self.transaction_fee);
        record.set("lock_time", self.lock_time);
        for (key, value) in &self.extra {
            record.set(key, value.clone());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> HexString {
        HexString::new(s).unwrap()
    }

    fn sample() -> Transaction {
        Transaction::new(hex("0xaa"), hex("0xbb"), 100, 5, 1_697_412_600)
    }

    #[test]
    fn test_transaction_hash_known_answer() {
        // amount,lock_time,recipient,sender,transaction_fee
        assert_eq!(sample().to_record().encode(), "100,1697412600,0xbb,0xaa,5");
        assert_eq!(
            sample().hash().to_string(),
            "0xa68638e41deb144a621007107b557d712f31f573c001d10648d9489acf058269"
        );
    }

    #[test]
    fn test_transaction_hash_deterministic() {
        assert_eq!(sample().hash(), sample().hash());
    }

    #[test]
    fn test_extra_fields_change_hash() {
        let tx = sample().with_field("nonce", 3u64).unwrap();
        assert_ne!(tx.hash(), sample().hash());
        assert_eq!(tx.field("nonce"), Some(&FieldValue::Int(3)));
    }

    #[test]
    fn test_extra_field_cannot_shadow_reserved() {
        assert_eq!(
            sample().with_field(" amount", 1u64),
            Err(EncodingError::DuplicateField("amount".into()))
        );
        let tx = sample().with_field("memo", hex("0x01")).unwrap();
        assert!(tx.with_field("memo", 2u64).is_err());
    }

    #[test]
    fn test_lock_time_is_strict() {
        let tx = sample();
        assert!(!tx.is_unlocked_at(1_697_412_600));
        assert!(tx.is_unlocked_at(1_697_412_601));
    }

    #[test]
    fn test_json_roundtrip_with_extra_fields() {
        let json = r#"{
            "sender": "0xaa",
            "recipient": "0xbb",
            "amount": 100,
            "transaction_fee": 5,
            "lock_time": 1697412600,
            "signature": "0xdeadbeef",
            "nonce": 9
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.field("nonce"), Some(&FieldValue::Int(9)));
        assert_eq!(tx.extra_fields().len(), 2);

        let back: Transaction = serde_json::from_str(&serde_json::to_string(&tx).unwrap()).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.hash(), tx.hash());
    }

    #[test]
    fn test_json_rejects_unsupported_values() {
        let json = r#"{"sender":"0xaa","recipient":"0xbb","amount":1,"transaction_fee":1,"lock_time":1,"memo":"hello"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());

        let json = r#"{"sender":"alice","recipient":"0xbb","amount":1,"transaction_fee":1,"lock_time":1}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }
}
