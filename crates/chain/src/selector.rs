//! Transaction selection for the next block.

use crate::mempool::{Mempool, MempoolError};
use merklechain_core::{Hash, Transaction};

/// Picks the batch for a block: transactions unlocked before the block
/// timestamp, highest fee first, ties broken by ascending hash, capped at
/// `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSelector {
    limit: usize,
}

/// The outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
    /// The batch size that was asked for.
    pub requested: usize,
}

impl Selection {
    pub fn is_full(&self) -> bool {
        self.transactions.len() >= self.requested
    }

    /// Fail with [`MempoolError::Exhausted`] if fewer than the requested
    /// number of transactions were eligible.
    pub fn ensure_full(&self) -> Result<(), MempoolError> {
        if self.is_full() {
            Ok(())
        } else {
            Err(MempoolError::Exhausted {
                requested: self.requested,
                available: self.transactions.len(),
            })
        }
    }

    pub fn hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}

impl TransactionSelector {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Select from a mempool snapshot without modifying it.
    pub fn select(&self, mempool: &Mempool, timestamp: u64) -> Selection {
        let mut eligible: Vec<(&Hash, &Transaction)> = mempool
            .iter()
            .filter(|(_, tx)| tx.is_unlocked_at(timestamp))
            .collect();

        eligible.sort_by(|(ha, a), (hb, b)| {
            b.transaction_fee()
                .cmp(&a.transaction_fee())
                .then_with(|| ha.cmp(hb))
        });

        Selection {
            transactions: eligible
                .into_iter()
                .take(self.limit)
                .map(|(_, tx)| tx.clone())
                .collect(),
            requested: self.limit,
        }
    }
}
