//! Pending transactions awaiting inclusion.
//!
//! Entries are keyed by transaction hash, so iteration order is hash order.
//! Entries leave the pool only when a block containing them is appended to
//! the chain.

use merklechain_core::{Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Entry};
use thiserror::Error;

/// Mempool errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    DuplicateTransaction(Hash),

    #[error("mempool holds its maximum of {0} transactions")]
    MempoolFull(usize),

    #[error("transaction {0} not found in mempool")]
    TransactionNotFound(Hash),

    #[error("mempool exhausted: {requested} transactions requested, {available} eligible")]
    Exhausted { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Mempool limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Optional capacity; once reached, further additions fail with
    /// [`MempoolError::MempoolFull`]. Unbounded when unset.
    pub max_transactions: Option<usize>,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: None,
        }
    }
}

/// The pool itself.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    config: MempoolConfig,
    transactions: BTreeMap<Hash, Transaction>,
}

impl Mempool {
    /// Empty pool with default limits.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.transactions.contains_key(tx_hash)
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.transactions.get(tx_hash)
    }

    /// Add a transaction to the mempool, returning its hash.
    pub fn add(&mut self, tx: Transaction) -> Result<Hash> {
        let tx_hash = tx.hash();

        let len = self.transactions.len();
        let full = self.config.max_transactions.filter(|&cap| len >= cap);
        match (self.transactions.entry(tx_hash), full) {
            (Entry::Occupied(_), _) => Err(MempoolError::DuplicateTransaction(tx_hash)),
            (Entry::Vacant(_), Some(capacity)) => Err(MempoolError::MempoolFull(capacity)),
            (Entry::Vacant(slot), None) => {
                slot.insert(tx);
                Ok(tx_hash)
            }
        }
    }

    /// Add many transactions, skipping exact duplicates. Returns how many
    /// were added.
    pub fn extend(&mut self, txs: impl IntoIterator<Item = Transaction>) -> Result<usize> {
        let mut added = 0;
        for tx in txs {
            match self.add(tx) {
                Ok(_) => added += 1,
                Err(MempoolError::DuplicateTransaction(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    /// Take one transaction out by hash.
    pub fn remove(&mut self, tx_hash: &Hash) -> Result<Transaction> {
        self.transactions
            .remove(tx_hash)
            .ok_or(MempoolError::TransactionNotFound(*tx_hash))
    }

    /// Remove multiple transactions; hashes not in the pool are ignored.
    pub fn remove_batch(&mut self, tx_hashes: &[Hash]) {
        for hash in tx_hashes {
            self.transactions.remove(hash);
        }
    }

    /// Iterate over `(hash, transaction)` pairs in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &Transaction)> {
        self.transactions.iter()
    }

    /// Get all transactions in the mempool, in hash order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.iter().map(|(_, tx)| tx.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }

    /// Snapshot of counts and fees.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            total_fees: self
                .transactions
                .values()
                .map(Transaction::transaction_fee)
                .fold(0u64, u64::saturating_add),
            capacity: self.config.max_transactions,
        }
    }
}

/// Counts reported by [`Mempool::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    /// Pending transactions.
    pub total_transactions: usize,
    /// Sum of pending fees.
    pub total_fees: u64,
    /// Configured capacity, if any.
    pub capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklechain_core::HexString;

    fn tx(fee: u64) -> Transaction {
        Transaction::new(
            HexString::new("0xaa").unwrap(),
            HexString::new("0xbb").unwrap(),
            1_000,
            fee,
            0,
        )
    }

    #[test]
    fn test_mempool_add_and_get() {
        let mut mempool = Mempool::new();
        let tx = tx(1);

        let tx_hash = mempool.add(tx.clone()).unwrap();
        assert_eq!(tx_hash, tx.hash());
        assert_eq!(mempool.len(), 1);
        assert!(mempool.contains(&tx_hash));
        assert_eq!(mempool.get(&tx_hash).unwrap(), &tx);
    }

    #[test]
    fn test_mempool_duplicate_rejected() {
        let mut mempool = Mempool::new();
        mempool.add(tx(1)).unwrap();
        assert!(matches!(
            mempool.add(tx(1)),
            Err(MempoolError::DuplicateTransaction(_))
        ));
    }

    #[test]
    fn test_mempool_extend_skips_duplicates() {
        let mut mempool = Mempool::new();
        let added = mempool.extend(vec![tx(1), tx(2), tx(1)]).unwrap();
        assert_eq!(added, 2);
        assert_eq!(mempool.len(), 2);
    }

    #[test]
    fn test_mempool_remove() {
        let mut mempool = Mempool::new();
        let tx = tx(1);
        let tx_hash = mempool.add(tx.clone()).unwrap();

        let removed = mempool.remove(&tx_hash).unwrap();
        assert_eq!(removed, tx);
        assert!(mempool.is_empty());
        assert!(matches!(
            mempool.remove(&tx_hash),
            Err(MempoolError::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_mempool_remove_batch_ignores_unknown() {
        let mut mempool = Mempool::new();
        let h1 = mempool.add(tx(1)).unwrap();
        mempool.add(tx(2)).unwrap();

        mempool.remove_batch(&[h1, Hash::from_bytes([9; 32])]);
        assert_eq!(mempool.len(), 1);
        assert!(!mempool.contains(&h1));
    }

    #[test]
    fn test_mempool_capacity_limit() {
        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: Some(2),
        });

        assert!(mempool.add(tx(1)).is_ok());
        assert!(mempool.add(tx(2)).is_ok());
        assert!(matches!(mempool.add(tx(3)), Err(MempoolError::MempoolFull(2))));
    }

    #[test]
    fn test_default_mempool_is_unbounded() {
        let mut mempool = Mempool::new();
        let count = 100_001u64;
        let added = mempool
            .extend((0..count).map(|i| {
                Transaction::new(
                    HexString::new("0xaa").unwrap(),
                    HexString::new("0xbb").unwrap(),
                    i,
                    1,
                    0,
                )
            }))
            .unwrap();
        assert_eq!(added, count as usize);
        assert_eq!(mempool.len(), count as usize);
    }

    #[test]
    fn test_mempool_iteration_is_hash_ordered() {
        let mut mempool = Mempool::new();
        mempool.extend((0..10).map(tx)).unwrap();
        let hashes: Vec<_> = mempool.iter().map(|(h, _)| *h).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
    }

    #[test]
    fn test_mempool_stats() {
        let mut mempool = Mempool::new();
        mempool.add(tx(3)).unwrap();
        mempool.add(tx(4)).unwrap();

        let stats = mempool.stats();
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.total_fees, 7);
        assert_eq!(stats.capacity, None);

        mempool.clear();
        assert_eq!(mempool.stats().total_transactions, 0);
    }
}
