//! Core ledger primitives for merklechain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - SHA-256 hashing
//! - Canonical record encoding
//! - Transactions
//! - Blocks and block headers
//! - Merkle trees and inclusion proofs

pub mod block;
pub mod encoding;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockHeader, HeaderTemplate};
pub use encoding::{Canonical, EncodingError, FieldValue, HexString, Record};
pub use hash::{hash, hash_concat, Hash, HashParseError, H256};
pub use merkle::{combine, fold_path, merkle_root, verify_proof, MerkleError, MerkleProof, MerkleTree, ProofPath, ProofStep, NULL_HASH};
pub use transaction::Transaction;
