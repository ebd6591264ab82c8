//! Block and block header structures.

use crate::encoding::{Canonical, HexString, Record};
use crate::hash::{hash, Hash};
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// The header of a block. Its canonical hash is the block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (0 for genesis).
    pub height: u64,
    /// Hash of the previous block header, or the null hash for genesis.
    #[serde(rename = "previous_block_header_hash")]
    pub previous_hash: Hash,
    /// Merkle root of the transaction hashes, in block order.
    #[serde(rename = "transactions_merkle_root")]
    pub merkle_root: Hash,
    /// Unix timestamp in seconds, fixed by the block schedule.
    pub timestamp: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Required count of leading zero hex digits in the block hash.
    pub difficulty: u32,
    /// Address credited with producing the block.
    pub miner: HexString,
    /// Number of transactions committed to by `merkle_root`.
    pub transactions_count: u64,
}

impl BlockHeader {
    /// Calculate the hash of this block header.
    pub fn hash(&self) -> Hash {
        self.canonical_hash()
    }

    /// Whether the header hash satisfies its own difficulty.
    pub fn meets_difficulty(&self) -> bool {
        self.hash().meets_difficulty(self.difficulty)
    }

    /// Precompute the encoding around the nonce for repeated hashing.
    pub fn template(&self) -> HeaderTemplate {
        let (prefix, suffix) = self
            .to_record()
            .split_at("nonce")
            .unwrap_or_default();
        HeaderTemplate { prefix, suffix }
    }
}

impl Canonical for BlockHeader {
    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set("difficulty", self.difficulty);
        record.set("height", self.height);
        record.set("miner", self.miner.clone());
        record.set("nonce", self.nonce);
        record.set("previous_block_header_hash", self.previous_hash);
        record.set("timestamp", self.timestamp);
        record.set("transactions_count", self.transactions_count);
        record.set("transactions_merkle_root", self.merkle_root);
        record
    }
}

/// A header encoding split around its nonce, so each candidate nonce costs
/// one string build and one digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    prefix: String,
    suffix: String,
}

impl HeaderTemplate {
    /// Hash of the header with the given nonce substituted.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut buf = String::with_capacity(self.prefix.len() + self.suffix.len() + 20);
        buf.push_str(&self.prefix);
        buf.push_str(&nonce.to_string());
        buf.push_str(&self.suffix);
        hash(buf.as_bytes())
    }
}

/// A sealed block: header plus the ordered transaction batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// List of transactions in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Get the block hash (hash of the header).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Get the block height.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.previous_hash.is_zero()
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Transaction hashes in block order.
    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Recompute the Merkle root over this block's transactions.
    pub fn compute_merkle_root(&self) -> Hash {
        merkle_root(&self.transaction_hashes())
    }

    /// Verify the merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        self.compute_merkle_root() == self.header.merkle_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> HexString {
        HexString::new(s).unwrap()
    }

    fn reference_header() -> BlockHeader {
        BlockHeader {
            height: 203,
            previous_hash: Hash::from_hex(
                "0xb2448304889df2935277464e90a73e53b9d2c5820c48de4a40d4fa5b844c7b57",
            )
            .unwrap(),
            merkle_root: Hash::from_hex(
                "0xddba0c2d7d38a9bc8ba357d1fcb4a4be339ab5fddf8cdcc4419970e4746d1f6e",
            )
            .unwrap(),
            timestamp: 1_697_412_660,
            nonce: 0,
            difficulty: 5,
            miner: hex("0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7"),
            transactions_count: 97,
        }
    }

    #[test]
    fn test_reference_header_hash() {
        assert_eq!(
            reference_header().hash().to_string(),
            "0x073c348de2486c616699fcd8267dc895f2d8b43355b126295da92df2961f8a87"
        );
    }

    #[test]
    fn test_header_encoding_field_order() {
        let encoded = reference_header().to_record().encode();
        assert!(encoded.starts_with("5,203,0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7,0,0xb244"));
        assert!(encoded.ends_with(",1697412660,97,0xddba0c2d7d38a9bc8ba357d1fcb4a4be339ab5fddf8cdcc4419970e4746d1f6e"));
    }

    #[test]
    fn test_template_matches_full_hash() {
        let mut header = reference_header();
        let template = header.template();
        for nonce in [0u64, 1, 9, 10, 12_345, u64::MAX] {
            header.nonce = nonce;
            assert_eq!(template.hash_with_nonce(nonce), header.hash());
        }
    }

    #[test]
    fn test_empty_block_merkle_root() {
        let mut header = reference_header();
        header.merkle_root = Hash::ZERO;
        header.transactions_count = 0;
        let block = Block::new(header, vec![]);
        assert!(block.verify_merkle_root());
        assert_eq!(block.tx_count(), 0);
    }

    #[test]
    fn test_block_with_transactions() {
        let txs = vec![
            Transaction::new(hex("0x01"), hex("0x02"), 10, 1, 0),
            Transaction::new(hex("0x03"), hex("0x04"), 20, 2, 0),
        ];
        let mut header = reference_header();
        header.merkle_root = merkle_root(&[txs[0].hash(), txs[1].hash()]);
        header.transactions_count = 2;
        let mut block = Block::new(header, txs);
        assert!(block.verify_merkle_root());

        block.transactions.swap(0, 1);
        // Pair hashing is order-insensitive within a pair.
        assert!(block.verify_merkle_root());

        block.transactions.pop();
        assert!(!block.verify_merkle_root());
    }

    #[test]
    fn test_header_json_field_names() {
        let json = serde_json::to_value(reference_header()).unwrap();
        assert!(json.get("previous_block_header_hash").is_some());
        assert!(json.get("transactions_merkle_root").is_some());
        let back: BlockHeader = serde_json::from_value(json).unwrap();
        assert_eq!(back, reference_header());
    }
}
