//! A chain handle that can be shared between threads.
//!
//! Block production selects and mines under an upgradable read lock and
//! upgrades to the write lock only to append. Only one producer holds the
//! upgradable lock at a time and no writer can enter while it is held, so
//! the mined block still extends the tip when it is appended. Readers,
//! including proof generation, proceed during the nonce search and see the
//! chain as of one completed append.

use crate::blockchain::{ChainState, ChainStats, Result};
use crate::proof::{InclusionProof, ProofService, ProofVerdict};
use merklechain_core::{Block, Hash, Transaction};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedChain {
    inner: Arc<RwLock<ChainState>>,
}

impl SharedChain {
    pub fn new(chain: ChainState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    /// Borrow a consistent snapshot.
    pub fn read(&self) -> RwLockReadGuard<'_, ChainState> {
        self.inner.read()
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash> {
        self.inner.write().submit_transaction(tx)
    }

    pub fn append(&self, block: Block) -> Result<()> {
        self.inner.write().append(block)
    }

    pub fn produce_block(&self) -> Result<Block> {
        let chain = self.inner.upgradable_read();
        let block = chain.mine_next()?;
        RwLockUpgradableReadGuard::upgrade(chain).append(block.clone())?;
        Ok(block)
    }

    /// Produce `count` blocks, releasing the lock between blocks.
    pub fn produce_blocks(&self, count: usize) -> Result<Vec<Block>> {
        (0..count).map(|_| self.produce_block()).collect()
    }

    pub fn lookup_transaction(&self, height: u64, index: usize) -> Result<Hash> {
        self.inner.read().lookup_transaction(height, index)
    }

    pub fn generate_proof(&self, height: u64, tx_hash: &Hash) -> Result<InclusionProof> {
        let chain = self.inner.read();
        ProofService::new(&chain).generate(height, tx_hash)
    }

    pub fn verify_proof(&self, proof: &InclusionProof) -> ProofVerdict {
        let chain = self.inner.read();
        ProofService::new(&chain).verify_against(proof)
    }

    pub fn height(&self) -> u64 {
        self.inner.read().height()
    }

    pub fn tip_hash(&self) -> Hash {
        self.inner.read().tip_hash()
    }

    pub fn stats(&self) -> ChainStats {
        self.inner.read().stats()
    }

    /// Take the chain back if this is the last handle, otherwise clone it.
    pub fn into_inner(self) -> ChainState {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => lock.into_inner(),
            Err(shared) => shared.read().clone(),
        }
    }
}

impl From<ChainState> for SharedChain {
    fn from(chain: ChainState) -> Self {
        Self::new(chain)
    }
}
