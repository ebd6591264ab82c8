//! Chain state for merklechain.
//!
//! This crate brings the core types and consensus rules together:
//! - **Mempool**: pending transactions keyed by hash
//! - **Selector**: fee-ordered, lock-time-aware batch selection
//! - **Chain state**: append-only block sequence with produce/append/lookup
//! - **Proofs**: inclusion proof generation and verification
//! - **Shared handle**: single-writer, many-reader access across threads
//!
//! # Example
//!
//! ```rust
//! use merklechain_chain::{ChainConfig, ChainState, ProofService};
//! use merklechain_core::{HexString, Transaction};
//!
//! let mut chain = ChainState::new(ChainConfig::default()).unwrap();
//! let tx = Transaction::new(
//!     HexString::new("0xaa").unwrap(),
//!     HexString::new("0xbb").unwrap(),
//!     100,
//!     5,
//!     0,
//! );
//! let tx_hash = chain.submit_transaction(tx).unwrap();
//!
//! let genesis = chain.produce_block().unwrap();
//! assert_eq!(genesis.header.timestamp, 1_697_412_600);
//!
//! let proof = ProofService::new(&chain).generate(0, &tx_hash).unwrap();
//! assert!(proof.verify().is_valid());
//! ```

pub mod blockchain;
pub mod mempool;
pub mod proof;
pub mod selector;
pub mod shared;

// Re-export commonly used types
pub use blockchain::{ChainConfig, ChainError, ChainState, ChainStats, DEFAULT_MINER};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use proof::{InclusionProof, ProofFailure, ProofService, ProofVerdict};
pub use selector::{Selection, TransactionSelector};
pub use shared::SharedChain;
