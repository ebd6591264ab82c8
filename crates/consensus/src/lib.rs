//! Proof-of-work consensus for merklechain.
//!
//! This crate provides:
//! - The block schedule (fixed timestamp spacing, stepped difficulty)
//! - Candidate assembly and deterministic nonce search
//! - Block validation (structure, merkle root, parent link, work)
//!
//! # Example
//!
//! ```rust
//! use merklechain_consensus::{BlockValidator, Candidate, ConsensusParams, Miner};
//! use merklechain_core::{HexString, NULL_HASH};
//!
//! let params = ConsensusParams::default();
//! let candidate = Candidate::assemble(
//!     0,
//!     NULL_HASH,
//!     params.next_timestamp(None),
//!     params.difficulty_at(0),
//!     HexString::new("0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7").unwrap(),
//!     vec![],
//! );
//! let genesis = Miner::sequential().mine(candidate).unwrap();
//!
//! BlockValidator::new(params).validate_full(&genesis, None).unwrap();
//! ```

pub mod params;
pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use params::{ConsensusParams, DifficultySchedule};
pub use pow::{Candidate, Miner, MinerConfig, MiningError, NonceSearch};
pub use validator::{BlockValidator, ValidationError};
