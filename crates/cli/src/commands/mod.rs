//! CLI commands module.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use merklechain_chain::{ChainConfig, ChainState, Mempool};
use merklechain_storage::{load_chain, read_json};
use std::path::{Path, PathBuf};

mod produce;
mod proof;
mod tx;

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to blockchain state file (blockchain.json.gz)
    #[arg(long, global = true)]
    pub blockchain_state: Option<PathBuf>,

    /// JSON file overriding the chain configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Produce new blocks from a mempool
    ProduceBlocks(produce::ProduceArgs),
    /// Print the hash of a transaction in a block
    GetTxHash(tx::GetTxHashArgs),
    /// Generate an inclusion proof for a transaction
    GenerateProof(proof::GenerateProofArgs),
    /// Verify an inclusion proof file
    VerifyProof(proof::VerifyProofArgs),
}

pub fn run(global: &GlobalArgs, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::ProduceBlocks(args) => produce::run(global, args),
        Commands::GetTxHash(args) => tx::run(global, args),
        Commands::GenerateProof(args) => proof::generate(global, args),
        Commands::VerifyProof(args) => proof::verify(global, args),
    }
}

impl GlobalArgs {
    /// Chain configuration: defaults, overridden by `--config` if given.
    pub fn chain_config(&self) -> Result<ChainConfig> {
        match &self.config {
            Some(path) => read_json(path)
                .with_context(|| format!("Failed to read config: {}", path.display())),
            None => Ok(ChainConfig::default()),
        }
    }

    /// The state file, for commands that cannot run without one.
    pub fn require_state(&self) -> Result<&Path> {
        self.blockchain_state
            .as_deref()
            .context("--blockchain-state is required for this command")
    }

    /// Load and revalidate the chain named by `--blockchain-state`.
    pub fn open_chain(&self) -> Result<ChainState> {
        let path = self.require_state()?;
        let blocks = load_chain(path)
            .with_context(|| format!("Failed to load blockchain: {}", path.display()))?;
        replay(self.chain_config()?, blocks, Mempool::new(), path)
    }
}

/// Rebuild a chain from stored blocks, checking every block on the way.
fn replay(
    config: ChainConfig,
    blocks: Vec<merklechain_core::Block>,
    mempool: Mempool,
    path: &Path,
) -> Result<ChainState> {
    ChainState::from_blocks(config, blocks, mempool)
        .with_context(|| format!("Invalid blockchain in {}", path.display()))
}
