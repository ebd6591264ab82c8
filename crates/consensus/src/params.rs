//! Block schedule: timestamps and difficulty as pure functions of height.

use serde::{Deserialize, Serialize};

/// Timestamp of the genesis block.
pub const GENESIS_TIMESTAMP: u64 = 1_697_412_600;
/// Fixed spacing between consecutive block timestamps, in seconds.
pub const BLOCK_TIME: u64 = 10;
/// Maximum transactions per block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 100;
/// Difficulty never rises above this.
pub const MAX_DIFFICULTY: u32 = 6;
/// Blocks between difficulty increments.
pub const DIFFICULTY_INTERVAL: u64 = 50;

/// Step schedule: `min(max, base + height / interval)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultySchedule {
    /// Difficulty at genesis.
    pub base: u32,
    /// Number of blocks per step.
    pub interval: u64,
    /// Cap.
    pub max: u32,
}

impl Default for DifficultySchedule {
    fn default() -> Self {
        Self {
            base: 1,
            interval: DIFFICULTY_INTERVAL,
            max: MAX_DIFFICULTY,
        }
    }
}

impl DifficultySchedule {
    /// Difficulty required of the block at `height`.
    pub fn difficulty_at(&self, height: u64) -> u32 {
        let steps = height / self.interval.max(1);
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        self.base.saturating_add(steps).min(self.max).max(1)
    }
}

/// Consensus parameters shared by the miner, validator and chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Timestamp of the block at height 0.
    pub genesis_timestamp: u64,
    /// Increment between consecutive block timestamps.
    pub block_time: u64,
    /// Upper bound on transactions per block.
    pub max_transactions_per_block: usize,
    /// Difficulty schedule.
    pub difficulty: DifficultySchedule,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            genesis_timestamp: GENESIS_TIMESTAMP,
            block_time: BLOCK_TIME,
            max_transactions_per_block: MAX_TRANSACTIONS_PER_BLOCK,
            difficulty: DifficultySchedule::default(),
        }
    }
}

impl ConsensusParams {
    /// Difficulty required at `height`.
    pub fn difficulty_at(&self, height: u64) -> u32 {
        self.difficulty.difficulty_at(height)
    }

    /// Timestamp of the block following a parent with `parent_timestamp`,
    /// or the genesis timestamp when there is no parent.
    pub fn next_timestamp(&self, parent_timestamp: Option<u64>) -> u64 {
        match parent_timestamp {
            Some(ts) => ts.saturating_add(self.block_time),
            None => self.genesis_timestamp,
        }
    }

    /// Timestamp of the block at `height` on a chain that followed the schedule.
    pub fn timestamp_at(&self, height: u64) -> u64 {
        self.genesis_timestamp
            .saturating_add(height.saturating_mul(self.block_time))
    }
}
