//! Proof-of-work block sealing.
//!
//! A [`Candidate`] is an assembled block whose header nonce is still zero.
//! The [`Miner`] walks nonces upward from zero and seals the candidate with
//! the first nonce whose header hash has at least `difficulty` leading zero
//! hex digits. The search has no ceiling besides the nonce type itself.
//!
//! With more than one worker thread the nonce space is cut into consecutive
//! batches; each batch is searched in parallel with an ordered `find_first`,
//! which abandons work above a hit and always reports the smallest satisfying
//! nonce. Parallel and sequential mining therefore seal identical blocks.

use merklechain_core::{merkle_root, Block, BlockHeader, Hash, HeaderTemplate, HexString, Transaction};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while mining.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("no nonce satisfies difficulty {0}")]
    NonceSpaceExhausted(u32),

    #[error("failed to build mining thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, MiningError>;

/// Miner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Worker threads; 1 searches on the calling thread.
    pub threads: usize,
    /// Nonces handed to the worker pool per round.
    pub batch_size: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            batch_size: 1 << 16,
        }
    }
}

/// An unsealed block: header with nonce 0 plus its transaction batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl Candidate {
    /// Assemble a candidate, committing to `transactions` in the given order.
    pub fn assemble(
        height: u64,
        previous_hash: Hash,
        timestamp: u64,
        difficulty: u32,
        miner: HexString,
        transactions: Vec<Transaction>,
    ) -> Self {
        let tx_hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        let header = BlockHeader {
            height,
            previous_hash,
            merkle_root: merkle_root(&tx_hashes),
            timestamp,
            nonce: 0,
            difficulty,
            miner,
            transactions_count: transactions.len() as u64,
        };
        Self {
            header,
            transactions,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Attach a nonce found for this candidate.
    pub fn seal(self, nonce: u64) -> Block {
        let mut header = self.header;
        header.nonce = nonce;
        Block::new(header, self.transactions)
    }
}

/// Candidate nonces and their header hashes, in increasing nonce order.
///
/// Finite only because `u64` is; in practice the consumer stops at the first
/// hash that meets the target.
#[derive(Debug, Clone)]
pub struct NonceSearch {
    template: HeaderTemplate,
    next: Option<u64>,
}

impl NonceSearch {
    pub fn new(header: &BlockHeader, start: u64) -> Self {
        Self {
            template: header.template(),
            next: Some(start),
        }
    }
}

impl Iterator for NonceSearch {
    type Item = (u64, Hash);

    fn next(&mut self) -> Option<(u64, Hash)> {
        let nonce = self.next?;
        self.next = nonce.checked_add(1);
        Some((nonce, self.template.hash_with_nonce(nonce)))
    }
}

/// Proof-of-work miner.
#[derive(Debug, Clone)]
pub struct Miner {
    config: MinerConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for Miner {
    fn default() -> Self {
        Self::sequential()
    }
}

impl Miner {
    /// Create a miner; spawns a worker pool when `threads > 1`.
    pub fn new(config: MinerConfig) -> Result<Self> {
        let pool = if config.threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|i| format!("miner-{i}"))
                .build()?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    /// A miner that searches on the calling thread.
    pub fn sequential() -> Self {
        Self {
            config: MinerConfig::default(),
            pool: None,
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Seal a candidate with the smallest satisfying nonce.
    pub fn mine(&self, candidate: Candidate) -> Result<Block> {
        let (nonce, hash) = self.find_nonce(candidate.header())?;
        debug!(
            height = candidate.header().height,
            nonce,
            hash = %hash,
            "sealed block"
        );
        Ok(candidate.seal(nonce))
    }

    /// Find the smallest nonce for which `header` meets its difficulty.
    pub fn find_nonce(&self, header: &BlockHeader) -> Result<(u64, Hash)> {
        match &self.pool {
            Some(pool) => self.find_nonce_parallel(pool, header),
            None => NonceSearch::new(header, 0)
                .find(|(_, hash)| hash.meets_difficulty(header.difficulty))
                .ok_or(MiningError::NonceSpaceExhausted(header.difficulty)),
        }
    }

    fn find_nonce_parallel(
        &self,
        pool: &rayon::ThreadPool,
        header: &BlockHeader,
    ) -> Result<(u64, Hash)> {
        let template = header.template();
        let difficulty = header.difficulty;
        let batch = self.config.batch_size.max(1);
        let mut start = 0u64;

        loop {
            let end = start.saturating_add(batch - 1);
            let found = pool.install(|| {
                (start..=end)
                    .into_par_iter()
                    .find_first(|&nonce| template.hash_with_nonce(nonce).meets_difficulty(difficulty))
            });
            if let Some(nonce) = found {
                return Ok((nonce, template.hash_with_nonce(nonce)));
            }
            if end == u64::MAX {
                return Err(MiningError::NonceSpaceExhausted(difficulty));
            }
            start = end + 1;
        }
    }
}
