//! Merkle tree implementation for transaction roots and inclusion proofs.
//!
//! Pairs are combined as `H(min(a, b) || max(a, b))` over the 64-digit hex
//! renderings (without `0x`), so each pair is order-insensitive while the
//! tree as a whole still depends on leaf positions. A level with an odd
//! node count pairs its last node with the null hash. An empty leaf set has
//! the null hash as root; a single leaf is its own root.

use crate::hash::{hash_concat, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Padding node for odd levels and the root of an empty tree.
pub const NULL_HASH: Hash = Hash::ZERO;

/// Errors that can occur while building proofs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot prove inclusion in an empty tree")]
    EmptyTree,

    #[error("leaf {0} is not in the tree")]
    ProofNotFound(String),
}

/// Combine two sibling nodes into their parent.
pub fn combine(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    hash_concat(&[lo.to_hex().as_bytes(), hi.to_hex().as_bytes()])
}

/// Compute the merkle root of a list of hashes.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return NULL_HASH;
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();

    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }

    current_level[0]
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| combine(&pair[0], pair.get(1).unwrap_or(&NULL_HASH)))
        .collect()
}

/// One step of an inclusion proof: the node paired with the current node and
/// whether it sat to the left of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Hash,
    pub is_left: bool,
}

/// A self-contained inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    #[serde(rename = "leaf_hash")]
    pub leaf: Hash,
    /// The root the path is claimed to reach.
    pub root: Hash,
    /// Siblings from leaf level to root.
    pub path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Replay the path and compare against the claimed root.
    pub fn verify(&self) -> bool {
        verify_proof(self)
    }
}

/// Fold a leaf up a path of siblings.
pub fn fold_path<'a>(leaf: Hash, path: impl IntoIterator<Item = &'a ProofStep>) -> Hash {
    path.into_iter()
        .fold(leaf, |current, step| combine(&current, &step.sibling))
}

/// Verify a merkle proof against the root it carries.
///
/// The null hash is never accepted as a leaf, so a fabricated proof over an
/// empty tree cannot succeed.
pub fn verify_proof(proof: &MerkleProof) -> bool {
    if proof.leaf == NULL_HASH {
        return false;
    }
    fold_path(proof.leaf, &proof.path) == proof.root
}

/// A merkle tree for efficient proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first). Empty for an
    /// empty leaf set.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a merkle tree from a list of leaf hashes.
    pub fn new(leaves: &[Hash]) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = next_level(current);
            levels.push(next);
        }

        Self { levels }
    }

    /// Get the root of the merkle tree.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(NULL_HASH)
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn leaves(&self) -> &[Hash] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the first leaf equal to `leaf`.
    pub fn position(&self, leaf: &Hash) -> Option<usize> {
        self.leaves().iter().position(|h| h == leaf)
    }

    /// Lazily walk the sibling path of the leaf at `index`.
    pub fn path(&self, index: usize) -> Option<ProofPath<'_>> {
        (index < self.leaf_count()).then_some(ProofPath {
            levels: &self.levels,
            level: 0,
            index,
        })
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if self.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        let path = self
            .path(index)
            .ok_or_else(|| MerkleError::ProofNotFound(format!("#{index}")))?;
        Ok(MerkleProof {
            leaf: self.levels[0][index],
            root: self.root(),
            path: path.collect(),
        })
    }

    /// Generate a proof for the first occurrence of `leaf`.
    pub fn proof_for(&self, leaf: &Hash) -> Result<MerkleProof, MerkleError> {
        if self.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        let index = self
            .position(leaf)
            .ok_or_else(|| MerkleError::ProofNotFound(leaf.to_string()))?;
        self.proof(index)
    }

    /// Verify a merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.root == self.root() && verify_proof(proof)
    }
}

/// Iterator over the [`ProofStep`]s from a leaf to the root. Cloning it
/// replays the walk from the current position.
#[derive(Debug, Clone)]
pub struct ProofPath<'a> {
    levels: &'a [Vec<Hash>],
    level: usize,
    index: usize,
}

impl Iterator for ProofPath<'_> {
    type Item = ProofStep;

    fn next(&mut self) -> Option<ProofStep> {
        // The last level holds only the root.
        if self.level + 1 >= self.levels.len() {
            return None;
        }
        let nodes = &self.levels[self.level];
        let step = if self.index % 2 == 0 {
            ProofStep {
                sibling: nodes.get(self.index + 1).copied().unwrap_or(NULL_HASH),
                is_left: false,
            }
        } else {
            ProofStep {
                sibling: nodes[self.index - 1],
                is_left: true,
            }
        };
        self.level += 1;
        self.index /= 2;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.levels.len().saturating_sub(self.level + 1);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProofPath<'_> {}
