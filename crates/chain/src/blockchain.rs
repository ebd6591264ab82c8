//! Chain state: the append-only block sequence and its mempool.
//!
//! Blocks move from [`Candidate`] (assembled, nonce 0) to sealed [`Block`]
//! (mined) to appended (validated and linked here). Only appended blocks are
//! part of the chain, and only [`ChainState::append`] extends it.

use crate::mempool::{Mempool, MempoolConfig, MempoolError};
use crate::selector::{Selection, TransactionSelector};
use merklechain_consensus::{
    BlockValidator, Candidate, ConsensusParams, Miner, MinerConfig, MiningError, ValidationError,
};
use merklechain_core::{Block, Hash, HexString, MerkleError, Transaction, NULL_HASH};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Address credited in produced blocks unless configured otherwise.
/// Renders as `0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7`.
pub const DEFAULT_MINER: [u8; 20] = [
    0xdc, 0x45, 0x03, 0x8a, 0xee, 0x51, 0x44, 0xbb, 0xfa, 0x64, 0x19, 0x12, 0xea, 0xf3, 0x2e, 0xbf,
    0x2b, 0xad, 0x2b, 0xd7,
];

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("block {height} does not exist (chain height {chain_height})")]
    BlockNotFound { height: u64, chain_height: u64 },

    #[error("transaction index {index} does not exist in block {height}")]
    TransactionNotFound { height: u64, index: usize },

    #[error("transaction {hash} not found in block {height}")]
    TransactionHashNotFound { height: u64, hash: Hash },
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Block schedule and validation parameters.
    pub consensus: ConsensusParams,
    /// Address recorded as `miner` in produced blocks.
    pub miner: HexString,
    /// Nonce search settings.
    pub mining: MinerConfig,
    /// Mempool settings.
    pub mempool: MempoolConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusParams::default(),
            miner: HexString::from(DEFAULT_MINER),
            mining: MinerConfig::default(),
            mempool: MempoolConfig::default(),
        }
    }
}

/// The ledger: sealed blocks plus the pending-transaction pool.
#[derive(Debug, Clone)]
pub struct ChainState {
    config: ChainConfig,
    blocks: Vec<Block>,
    /// `hashes[i] == blocks[i].hash()`.
    hashes: Vec<Hash>,
    mempool: Mempool,
    validator: BlockValidator,
    selector: TransactionSelector,
    miner: Miner,
}

impl ChainState {
    /// Create an empty chain with an empty mempool.
    pub fn new(config: ChainConfig) -> Result<Self> {
        let mempool = Mempool::with_config(config.mempool.clone());
        Self::with_mempool(config, mempool)
    }

    /// Create an empty chain around an existing mempool.
    pub fn with_mempool(config: ChainConfig, mempool: Mempool) -> Result<Self> {
        let miner = Miner::new(config.mining.clone())?;
        Ok(Self {
            validator: BlockValidator::new(config.consensus.clone()),
            selector: TransactionSelector::new(config.consensus.max_transactions_per_block),
            miner,
            blocks: Vec::new(),
            hashes: Vec::new(),
            mempool,
            config,
        })
    }

    /// Rebuild a chain by appending previously sealed blocks in order.
    /// Every block is revalidated.
    pub fn from_blocks(
        config: ChainConfig,
        blocks: impl IntoIterator<Item = Block>,
        mempool: Mempool,
    ) -> Result<Self> {
        let mut chain = Self::with_mempool(config, mempool)?;
        for block in blocks {
            chain.append(block)?;
        }
        Ok(chain)
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Number of appended blocks; also the height the next block will take.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Hash of the latest block, or the null hash for an empty chain.
    pub fn tip_hash(&self) -> Hash {
        self.hashes.last().copied().unwrap_or(NULL_HASH)
    }

    /// The latest block.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Get a block by height.
    pub fn block_at(&self, height: u64) -> Result<&Block> {
        usize::try_from(height)
            .ok()
            .and_then(|i| self.blocks.get(i))
            .ok_or(ChainError::BlockNotFound {
                height,
                chain_height: self.height(),
            })
    }

    /// Hash of the block at `height`.
    pub fn hash_at(&self, height: u64) -> Result<Hash> {
        self.block_at(height)?;
        Ok(self.hashes[height as usize])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Add a pending transaction.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<Hash> {
        Ok(self.mempool.add(tx)?)
    }

    /// Validate and append a sealed block, then drop its transactions from
    /// the mempool. On error the chain and mempool are unchanged.
    pub fn append(&mut self, block: Block) -> Result<()> {
        self.validator.validate_full(&block, self.tip())?;

        let hash = block.hash();
        let tx_hashes = block.transaction_hashes();
        self.mempool.remove_batch(&tx_hashes);

        info!(
            height = block.height(),
            hash = %hash,
            transactions = tx_hashes.len(),
            nonce = block.header.nonce,
            "appended block"
        );

        self.blocks.push(block);
        self.hashes.push(hash);
        Ok(())
    }

    /// Transaction at `index` within the block at `height`.
    pub fn transaction_at(&self, height: u64, index: usize) -> Result<&Transaction> {
        self.block_at(height)?
            .transactions
            .get(index)
            .ok_or(ChainError::TransactionNotFound { height, index })
    }

    /// Hash of the transaction at `index` within the block at `height`.
    pub fn lookup_transaction(&self, height: u64, index: usize) -> Result<Hash> {
        Ok(self.transaction_at(height, index)?.hash())
    }

    /// Select the batch the next block would carry.
    pub fn select_next(&self) -> Selection {
        let timestamp = self.next_timestamp();
        self.selector.select(&self.mempool, timestamp)
    }

    fn next_timestamp(&self) -> u64 {
        let params = &self.config.consensus;
        params.next_timestamp(self.tip().map(|b| b.header.timestamp))
    }

    /// Assemble the next block from the mempool without mining it.
    pub fn next_candidate(&self) -> Candidate {
        let height = self.height();
        let selection = self.select_next();
        if let Err(short) = selection.ensure_full() {
            warn!(height, %short, "building a partial block");
        }
        Candidate::assemble(
            height,
            self.tip_hash(),
            self.next_timestamp(),
            self.config.consensus.difficulty_at(height),
            self.config.miner.clone(),
            selection.transactions,
        )
    }

    /// Assemble and mine the next block without appending it.
    pub fn mine_next(&self) -> Result<Block> {
        Ok(self.miner.mine(self.next_candidate())?)
    }

    /// Select, mine and append the next block. Returns the appended block.
    pub fn produce_block(&mut self) -> Result<Block> {
        let block = self.mine_next()?;
        self.append(block.clone())?;
        Ok(block)
    }

    /// Produce `count` blocks in sequence. Once the eligible mempool is
    /// drained, further blocks are empty.
    pub fn produce_blocks(&mut self, count: usize) -> Result<Vec<Block>> {
        (0..count).map(|_| self.produce_block()).collect()
    }

    /// Get chain statistics.
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            tip_hash: self.tip_hash(),
            tip_timestamp: self.tip().map(|b| b.header.timestamp),
            next_difficulty: self.config.consensus.difficulty_at(self.height()),
            confirmed_transactions: self.blocks.iter().map(Block::tx_count).sum(),
            pending_transactions: self.mempool.len(),
        }
    }
}

/// Chain statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Number of blocks.
    pub height: u64,
    /// Hash of the latest block.
    pub tip_hash: Hash,
    /// Timestamp of the latest block.
    pub tip_timestamp: Option<u64>,
    /// Difficulty the next block must meet.
    pub next_difficulty: u32,
    /// Transactions included in blocks.
    pub confirmed_transactions: usize,
    /// Transactions still pending.
    pub pending_transactions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: u64, fee: u64, lock_time: u64) -> Transaction {
        Transaction::new(
            HexString::new("0xaa").unwrap(),
            HexString::new("0xbb").unwrap(),
            amount,
            fee,
            lock_time,
        )
    }

    fn setup_chain(txs: impl IntoIterator<Item = Transaction>) -> ChainState {
        let mut chain = ChainState::new(ChainConfig::default()).unwrap();
        for tx in txs {
            chain.submit_transaction(tx).unwrap();
        }
        chain
    }

    #[test]
    fn test_default_miner_address() {
        assert_eq!(
            ChainConfig::default().miner.as_str(),
            "0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7"
        );
    }

    #[test]
    fn test_empty_chain() {
        let chain = setup_chain([]);
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.tip_hash(), NULL_HASH);
        assert!(matches!(
            chain.block_at(0),
            Err(ChainError::BlockNotFound { height: 0, chain_height: 0 })
        ));
    }

    #[test]
    fn test_produce_genesis() {
        let mut chain = setup_chain([tx(1, 10, 0)]);
        let genesis = chain.produce_block().unwrap();

        assert!(genesis.is_genesis());
        assert_eq!(genesis.header.timestamp, 1_697_412_600);
        assert_eq!(genesis.header.difficulty, 1);
        assert_eq!(genesis.tx_count(), 1);
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tip_hash(), genesis.hash());
        assert!(chain.mempool().is_empty());
    }

    #[test]
    fn test_produce_blocks_timestamps_and_links() {
        let mut chain = setup_chain((0..5).map(|i| tx(i, i, 0)));
        let blocks = chain.produce_blocks(4).unwrap();

        assert_eq!(chain.height(), 4);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.height(), i as u64);
            assert_eq!(block.header.timestamp, 1_697_412_600 + 10 * i as u64);
            if i > 0 {
                assert_eq!(block.header.previous_hash, blocks[i - 1].hash());
            }
        }
        // Everything fit into the genesis block; later blocks are empty.
        assert_eq!(blocks[0].tx_count(), 5);
        assert!(blocks[1..].iter().all(|b| b.transactions.is_empty()));
        assert_eq!(blocks[1].header.merkle_root, NULL_HASH);
    }

    #[test]
    fn test_block_capacity_spills_into_next_block() {
        let mut chain = setup_chain((0..130).map(|i| tx(i, i % 7, 0)));
        let blocks = chain.produce_blocks(2).unwrap();
        assert_eq!(blocks[0].tx_count(), 100);
        assert_eq!(blocks[1].tx_count(), 30);
        assert!(chain.mempool().is_empty());
    }

    #[test]
    fn test_locked_transactions_wait() {
        let genesis_ts = 1_697_412_600;
        // Eligible only from the third block (timestamp genesis + 20).
        let mut chain = setup_chain([tx(1, 1, genesis_ts + 10)]);
        let blocks = chain.produce_blocks(3).unwrap();
        assert_eq!(blocks[0].tx_count(), 0);
        assert_eq!(blocks[1].tx_count(), 0);
        assert_eq!(blocks[2].tx_count(), 1);
    }

    #[test]
    fn test_lookup_transaction() {
        let first = tx(1, 50, 0);
        let second = tx(2, 10, 0);
        let mut chain = setup_chain([second.clone(), first.clone()]);
        chain.produce_block().unwrap();

        assert_eq!(chain.lookup_transaction(0, 0).unwrap(), first.hash());
        assert_eq!(chain.lookup_transaction(0, 1).unwrap(), second.hash());
        assert!(matches!(
            chain.lookup_transaction(0, 2),
            Err(ChainError::TransactionNotFound { height: 0, index: 2 })
        ));
        assert!(matches!(
            chain.lookup_transaction(1, 0),
            Err(ChainError::BlockNotFound { .. })
        ));
    }

    #[test]
    fn test_append_rejects_bad_linkage_without_mutation() {
        let mut chain = setup_chain([tx(1, 1, 0)]);
        chain.produce_block().unwrap();
        chain.submit_transaction(tx(2, 2, 0)).unwrap();

        let mut candidate = chain.next_candidate();
        // Rebuild the candidate on a wrong parent.
        let header = candidate.header().clone();
        candidate = Candidate::assemble(
            header.height,
            Hash::from_bytes([7; 32]),
            header.timestamp,
            header.difficulty,
            header.miner.clone(),
            candidate.transactions().to_vec(),
        );
        let block = Miner::sequential().mine(candidate).unwrap();

        let before = chain.stats();
        assert!(matches!(
            chain.append(block),
            Err(ChainError::Validation(ValidationError::Linkage { .. }))
        ));
        assert_eq!(chain.stats(), before);
        assert_eq!(chain.mempool().len(), 1);
    }

    #[test]
    fn test_append_rejects_insufficient_work() {
        let mut chain = setup_chain([tx(1, 1, 0)]);
        let mut block = Miner::sequential().mine(chain.next_candidate()).unwrap();
        while block.header.meets_difficulty() {
            block.header.nonce += 1;
        }

        assert!(matches!(
            chain.append(block),
            Err(ChainError::Validation(ValidationError::InsufficientWork { .. }))
        ));
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.mempool().len(), 1);
    }

    #[test]
    fn test_append_rejects_merkle_mismatch() {
        let mut chain = setup_chain([tx(1, 1, 0), tx(2, 2, 0)]);
        let candidate = chain.next_candidate();
        let mut block = Miner::sequential().mine(candidate).unwrap();
        block.transactions.reverse();
        block.transactions.push(tx(3, 3, 0));
        block.header.transactions_count = 3;
        let (nonce, _) = Miner::sequential()
            .find_nonce(&merklechain_core::BlockHeader { nonce: 0, ..block.header.clone() })
            .unwrap();
        block.header.nonce = nonce;

        assert!(matches!(
            chain.append(block),
            Err(ChainError::Validation(ValidationError::MerkleRootMismatch { .. }))
        ));
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.mempool().len(), 2);
    }

    #[test]
    fn test_from_blocks_replays_chain() {
        let mut chain = setup_chain((0..3).map(|i| tx(i, i, 0)));
        chain.produce_blocks(3).unwrap();

        let rebuilt =
            ChainState::from_blocks(ChainConfig::default(), chain.blocks().to_vec(), Mempool::new()).unwrap();
        assert_eq!(rebuilt.height(), 3);
        assert_eq!(rebuilt.tip_hash(), chain.tip_hash());

        let mut tampered = chain.blocks().to_vec();
        tampered.remove(1);
        assert!(ChainState::from_blocks(ChainConfig::default(), tampered, Mempool::new()).is_err());
    }

    #[test]
    fn test_parallel_miner_produces_identical_chain() {
        let txs: Vec<_> = (0..8).map(|i| tx(i, i, 0)).collect();
        let mut sequential = setup_chain(txs.clone());

        let config = ChainConfig {
            mining: MinerConfig {
                threads: 3,
                batch_size: 16,
            },
            ..ChainConfig::default()
        };
        let mut parallel = ChainState::new(config).unwrap();
        for tx in txs {
            parallel.submit_transaction(tx).unwrap();
        }

        assert_eq!(
            sequential.produce_blocks(3).unwrap(),
            parallel.produce_blocks(3).unwrap()
        );
    }

    #[test]
    fn test_stats() {
        let mut chain = setup_chain([tx(1, 1, 0), tx(2, 2, u64::MAX)]);
        chain.produce_block().unwrap();
        let stats = chain.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.confirmed_transactions, 1);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.tip_timestamp, Some(1_697_412_600));
        assert_eq!(stats.next_difficulty, 1);
    }
}
