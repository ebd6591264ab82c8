//! Block validation rules.
//!
//! This module checks a sealed block against its parent and the consensus
//! parameters before it may be appended to a chain.

use crate::params::ConsensusParams;
use merklechain_core::{Block, Hash, NULL_HASH};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block height mismatch (expected {expected}, got {got})")]
    InvalidHeight { expected: u64, got: u64 },

    #[error("previous hash mismatch (expected {expected}, got {got})")]
    Linkage { expected: Hash, got: Hash },

    #[error("timestamp mismatch (expected {expected}, got {got})")]
    Timestamp { expected: u64, got: u64 },

    #[error("merkle root mismatch (header {header}, computed {computed})")]
    MerkleRootMismatch { header: Hash, computed: Hash },

    #[error("header declares {declared} transactions, block holds {actual}")]
    TransactionCountMismatch { declared: u64, actual: usize },

    #[error("block holds {count} transactions, limit is {limit}")]
    TooManyTransactions { count: usize, limit: usize },

    #[error("duplicate transaction {0} in block")]
    DuplicateTransaction(Hash),

    #[error("transaction {hash} is locked until {lock_time}, block timestamp is {timestamp}")]
    TransactionLocked {
        hash: Hash,
        lock_time: u64,
        timestamp: u64,
    },

    #[error("difficulty {got} does not match schedule ({expected}) at height {height}")]
    DifficultyMismatch { height: u64, expected: u32, got: u32 },

    #[error("block hash {hash} has {zeros} leading zero digits, {required} required")]
    InsufficientWork { hash: Hash, zeros: u32, required: u32 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Block validator.
#[derive(Debug, Clone, Default)]
pub struct BlockValidator {
    params: ConsensusParams,
}

impl BlockValidator {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Validate block structure and contents.
    pub fn validate_block_structure(&self, block: &Block) -> Result<()> {
        let limit = self.params.max_transactions_per_block;
        if block.tx_count() > limit {
            return Err(ValidationError::TooManyTransactions {
                count: block.tx_count(),
                limit,
            });
        }

        if block.header.transactions_count != block.tx_count() as u64 {
            return Err(ValidationError::TransactionCountMismatch {
                declared: block.header.transactions_count,
                actual: block.tx_count(),
            });
        }

        let mut seen = HashSet::new();
        for tx in &block.transactions {
            let hash = tx.hash();
            if !seen.insert(hash) {
                return Err(ValidationError::DuplicateTransaction(hash));
            }
            if !tx.is_unlocked_at(block.header.timestamp) {
                return Err(ValidationError::TransactionLocked {
                    hash,
                    lock_time: tx.lock_time(),
                    timestamp: block.header.timestamp,
                });
            }
        }

        let computed = block.compute_merkle_root();
        if computed != block.header.merkle_root {
            return Err(ValidationError::MerkleRootMismatch {
                header: block.header.merkle_root,
                computed,
            });
        }

        Ok(())
    }

    /// Validate that the block extends `parent` (or starts a chain when
    /// `parent` is `None`): height, previous hash and timestamp.
    pub fn validate_block_extends_parent(&self, block: &Block, parent: Option<&Block>) -> Result<()> {
        let (height, previous_hash, timestamp) = match parent {
            Some(p) => (
                p.height() + 1,
                p.hash(),
                self.params.next_timestamp(Some(p.header.timestamp)),
            ),
            None => (0, NULL_HASH, self.params.next_timestamp(None)),
        };

        if block.header.height != height {
            return Err(ValidationError::InvalidHeight {
                expected: height,
                got: block.header.height,
            });
        }

        if block.header.previous_hash != previous_hash {
            return Err(ValidationError::Linkage {
                expected: previous_hash,
                got: block.header.previous_hash,
            });
        }

        if block.header.timestamp != timestamp {
            return Err(ValidationError::Timestamp {
                expected: timestamp,
                got: block.header.timestamp,
            });
        }

        Ok(())
    }

    /// Validate the difficulty schedule and the proof of work.
    pub fn validate_work(&self, block: &Block) -> Result<()> {
        let expected = self.params.difficulty_at(block.header.height);
        if block.header.difficulty != expected {
            return Err(ValidationError::DifficultyMismatch {
                height: block.header.height,
                expected,
                got: block.header.difficulty,
            });
        }

        let hash = block.hash();
        let zeros = hash.leading_zero_digits();
        if zeros < expected {
            return Err(ValidationError::InsufficientWork {
                hash,
                zeros,
                required: expected,
            });
        }

        Ok(())
    }

    /// Full block validation (parent + structure + work).
    pub fn validate_full(&self, block: &Block, parent: Option<&Block>) -> Result<()> {
        self.validate_block_extends_parent(block, parent)?;
        self.validate_block_structure(block)?;
        self.validate_work(block)?;
        Ok(())
    }
}
