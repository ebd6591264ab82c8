//! Inclusion proofs against sealed blocks.
//!
//! [`ProofService`] only reads the chain. A generated [`InclusionProof`]
//! can be checked on its own with [`InclusionProof::verify`], or against a
//! chain with [`ProofService::verify_against`], which also ties its root to
//! the block it names.

use crate::blockchain::{ChainError, ChainState, Result};
use merklechain_core::{fold_path, Hash, MerkleProof, MerkleTree, Transaction, NULL_HASH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A Merkle proof plus the position it claims within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Height of the block holding the transaction.
    pub block_height: u64,
    /// Hash of that block's header.
    pub block_hash: Hash,
    /// Position of the transaction in the block.
    pub transaction_index: usize,
    /// Number of transactions in the block.
    pub total_transactions: usize,
    /// Leaf, root and sibling path.
    #[serde(flatten)]
    pub proof: MerkleProof,
}

/// Why a proof was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofFailure {
    #[error("the null hash is not a transaction")]
    NullLeaf,

    #[error("transaction index {index} outside a block of {total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("path has {got} steps, a block of {total} needs {expected}")]
    PathLength { total: usize, expected: usize, got: usize },

    #[error("step {level} is on the wrong side for index {index}")]
    SideMismatch { level: usize, index: usize },

    #[error("step {level} pads an odd level with {sibling} instead of the null hash")]
    PaddingMismatch { level: usize, sibling: Hash },

    #[error("path folds to {computed}, proof claims {claimed}")]
    PathMismatch { computed: Hash, claimed: Hash },

    #[error("block {0} is not in the chain")]
    UnknownBlock(u64),

    #[error("proof root {claimed} differs from block merkle root {expected}")]
    BlockRootMismatch { expected: Hash, claimed: Hash },

    #[error("proof names block hash {claimed}, chain has {expected}")]
    BlockHashMismatch { expected: Hash, claimed: Hash },

    #[error("proof claims {claimed} transactions, block has {expected}")]
    TransactionCountMismatch { expected: usize, claimed: usize },

    #[error("leaf {claimed} is not transaction {index} of the block")]
    LeafMismatch { index: usize, claimed: Hash },
}

/// Outcome of checking a proof. Rejection is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofVerdict {
    Valid,
    Invalid(ProofFailure),
}

impl ProofVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ProofVerdict::Valid)
    }

    pub fn failure(&self) -> Option<&ProofFailure> {
        match self {
            ProofVerdict::Valid => None,
            ProofVerdict::Invalid(reason) => Some(reason),
        }
    }
}

impl From<std::result::Result<(), ProofFailure>> for ProofVerdict {
    fn from(result: std::result::Result<(), ProofFailure>) -> Self {
        match result {
            Ok(()) => ProofVerdict::Valid,
            Err(reason) => ProofVerdict::Invalid(reason),
        }
    }
}

/// Number of pairing levels above `leaves` leaves.
fn tree_depth(leaves: usize) -> usize {
    let mut width = leaves;
    let mut depth = 0;
    while width > 1 {
        width = width.div_ceil(2);
        depth += 1;
    }
    depth
}

impl InclusionProof {
    /// Check that the path has the shape the claimed position implies:
    /// its length, the side of every step, and null padding where a level
    /// ends on an unpaired node.
    pub fn check_shape(&self) -> std::result::Result<(), ProofFailure> {
        let total = self.total_transactions;
        let mut index = self.transaction_index;
        if index >= total {
            return Err(ProofFailure::IndexOutOfRange { index, total });
        }

        let expected = tree_depth(total);
        if self.proof.path.len() != expected {
            return Err(ProofFailure::PathLength {
                total,
                expected,
                got: self.proof.path.len(),
            });
        }

        let mut width = total;
        for (level, step) in self.proof.path.iter().enumerate() {
            if step.is_left != (index % 2 == 1) {
                return Err(ProofFailure::SideMismatch { level, index });
            }
            if !step.is_left && index + 1 == width && step.sibling != NULL_HASH {
                return Err(ProofFailure::PaddingMismatch {
                    level,
                    sibling: step.sibling,
                });
            }
            index /= 2;
            width = width.div_ceil(2);
        }
        Ok(())
    }

    fn check(&self) -> std::result::Result<(), ProofFailure> {
        if self.proof.leaf == NULL_HASH {
            return Err(ProofFailure::NullLeaf);
        }
        self.check_shape()?;

        let computed = fold_path(self.proof.leaf, &self.proof.path);
        if computed != self.proof.root {
            return Err(ProofFailure::PathMismatch {
                computed,
                claimed: self.proof.root,
            });
        }
        Ok(())
    }

    /// Verify the proof without the source block.
    pub fn verify(&self) -> ProofVerdict {
        self.check().into()
    }
}

/// Generates and checks inclusion proofs over a chain.
#[derive(Debug, Clone, Copy)]
pub struct ProofService<'a> {
    chain: &'a ChainState,
}

impl<'a> ProofService<'a> {
    pub fn new(chain: &'a ChainState) -> Self {
        Self { chain }
    }

    /// Prove that `tx_hash` is in the block at `height`.
    pub fn generate(&self, height: u64, tx_hash: &Hash) -> Result<InclusionProof> {
        let block = self.chain.block_at(height)?;
        let tree = MerkleTree::new(&block.transaction_hashes());
        let index = tree
            .position(tx_hash)
            .ok_or(ChainError::TransactionHashNotFound {
                height,
                hash: *tx_hash,
            })?;

        Ok(InclusionProof {
            block_height: height,
            block_hash: self.chain.hash_at(height)?,
            transaction_index: index,
            total_transactions: tree.leaf_count(),
            proof: tree.proof(index)?,
        })
    }

    /// Prove the transaction at `index` in the block at `height`.
    pub fn generate_at(&self, height: u64, index: usize) -> Result<InclusionProof> {
        let tx_hash = self.chain.lookup_transaction(height, index)?;
        self.generate(height, &tx_hash)
    }

    /// Verify a proof on its own.
    pub fn verify(proof: &InclusionProof) -> ProofVerdict {
        proof.verify()
    }

    /// Verify a proof and check that it commits to the block it names, at the
    /// position it claims.
    pub fn verify_against(&self, proof: &InclusionProof) -> ProofVerdict {
        self.check_against(proof).into()
    }

    fn check_against(&self, proof: &InclusionProof) -> std::result::Result<(), ProofFailure> {
        proof.check()?;

        let height = proof.block_height;
        let (block, block_hash) = self
            .chain
            .block_at(height)
            .ok()
            .zip(self.chain.hash_at(height).ok())
            .ok_or(ProofFailure::UnknownBlock(height))?;

        if block.header.merkle_root != proof.proof.root {
            return Err(ProofFailure::BlockRootMismatch {
                expected: block.header.merkle_root,
                claimed: proof.proof.root,
            });
        }
        if block_hash != proof.block_hash {
            return Err(ProofFailure::BlockHashMismatch {
                expected: block_hash,
                claimed: proof.block_hash,
            });
        }

        // The root alone does not pin the leaf to a transaction: an interior
        // node with a shorter path folds to the same root.
        if proof.total_transactions != block.tx_count() {
            return Err(ProofFailure::TransactionCountMismatch {
                expected: block.tx_count(),
                claimed: proof.total_transactions,
            });
        }
        let index = proof.transaction_index;
        if block.transactions.get(index).map(Transaction::hash) != Some(proof.proof.leaf) {
            return Err(ProofFailure::LeafMismatch {
                index,
                claimed: proof.proof.leaf,
            });
        }
        Ok(())
    }
}
