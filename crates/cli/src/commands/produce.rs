//! Block production command.

use super::{replay, GlobalArgs};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use merklechain_chain::{ChainState, Mempool};
use merklechain_core::HexString;
use merklechain_storage::{load_chain_or_empty, load_mempool, save_chain, save_mempool};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct ProduceArgs {
    /// Path to mempool file
    #[arg(long)]
    mempool: PathBuf,

    /// Path to output blockchain file
    #[arg(long)]
    blockchain_output: PathBuf,

    /// Path to output mempool file
    #[arg(long)]
    mempool_output: PathBuf,

    /// Number of blocks to produce
    #[arg(short)]
    n: usize,

    /// Miner address recorded in produced blocks
    #[arg(long)]
    miner: Option<String>,

    /// Worker threads for the nonce search
    #[arg(long)]
    threads: Option<usize>,

    /// Stop instead of producing a block with fewer transactions than the limit
    #[arg(long)]
    require_full: bool,
}

pub fn run(global: &GlobalArgs, args: ProduceArgs) -> Result<()> {
    let mut config = global.chain_config()?;
    if let Some(miner) = &args.miner {
        config.miner = HexString::new(miner.as_str())
            .with_context(|| format!("Invalid miner address: {miner}"))?;
    }
    if let Some(threads) = args.threads {
        config.mining.threads = threads.max(1);
    }

    let blocks = match &global.blockchain_state {
        Some(path) => {
            println!("Loading blockchain from {}...", path.display());
            load_chain_or_empty(path)
                .with_context(|| format!("Failed to load blockchain: {}", path.display()))?
        }
        None => Vec::new(),
    };
    println!("Loaded {} blocks", blocks.len());

    println!("Loading mempool from {}...", args.mempool.display());
    let pending = load_mempool(&args.mempool)
        .with_context(|| format!("Failed to load mempool: {}", args.mempool.display()))?;
    println!("Loaded {} transactions", pending.len());

    let mut mempool = Mempool::with_config(config.mempool.clone());
    let added = mempool.extend(pending)?;
    info!(added, "mempool ready");

    let state_path = global
        .blockchain_state
        .as_deref()
        .unwrap_or(Path::new("<new chain>"));
    let mut chain = replay(config, blocks, mempool, state_path)?;

    println!();
    println!("{}", format!("Producing {} blocks...", args.n).bold().cyan());
    produce(&mut chain, args.n, args.require_full)?;

    println!();
    save_chain(&args.blockchain_output, chain.blocks()).with_context(|| {
        format!("Failed to save blockchain: {}", args.blockchain_output.display())
    })?;
    println!(
        "{}  Saved blockchain to {}",
        "✓".green().bold(),
        args.blockchain_output.display().to_string().bright_black()
    );

    save_mempool(&args.mempool_output, &chain.mempool().get_all()).with_context(|| {
        format!("Failed to save mempool: {}", args.mempool_output.display())
    })?;
    println!(
        "{}  Saved mempool to {} ({} pending)",
        "✓".green().bold(),
        args.mempool_output.display().to_string().bright_black(),
        chain.mempool().len()
    );

    println!();
    println!(
        "{}",
        format!("Successfully produced {} blocks!", args.n).green().bold()
    );
    Ok(())
}

fn produce(chain: &mut ChainState, count: usize, require_full: bool) -> Result<()> {
    for _ in 0..count {
        if require_full {
            chain
                .select_next()
                .ensure_full()
                .with_context(|| format!("Cannot fill block {}", chain.height()))?;
        }
        let block = chain.produce_block()?;
        println!(
            "  {} {} {} {}",
            format!("#{}", block.height()).bright_black(),
            block.hash().to_string().bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black(),
            format!("nonce {}", block.header.nonce).bright_black()
        );
    }
    Ok(())
}
