//! File storage for merklechain.
//!
//! This crate reads and writes the documents the CLI works with:
//! - Chain files: gzipped JSON array of blocks, each header carrying its hash
//! - Mempool files: gzipped JSON array of transactions
//! - Proof files: plain pretty-printed JSON
//!
//! Readers accept both gzipped and plain JSON. Stored header hashes are
//! recomputed on load; a mismatch is an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use merklechain_storage::{load_chain_or_empty, load_mempool, save_chain, save_mempool};
//! use std::path::Path;
//!
//! let blocks = load_chain_or_empty(Path::new("blockchain.json.gz")).unwrap();
//! let pending = load_mempool(Path::new("mempool.json.gz")).unwrap();
//!
//! save_chain(Path::new("blockchain-out.json.gz"), &blocks).unwrap();
//! save_mempool(Path::new("mempool-out.json.gz"), &pending).unwrap();
//! ```

pub mod codec;
pub mod document;
pub mod files;

// Re-export commonly used types
pub use codec::{read_json, write_json, Format, Result, StorageError};
pub use document::{StoredBlock, StoredHeader};
pub use files::{
    load_chain, load_chain_or_empty, load_mempool, load_proof, save_chain, save_mempool, save_proof,
};
