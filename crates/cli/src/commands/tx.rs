//! Transaction lookup command.

use super::GlobalArgs;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct GetTxHashArgs {
    /// Block height
    block_height: u64,

    /// Transaction index within the block
    tx_index: usize,
}

/// Prints only the hash, so the output can be piped into `generate-proof`.
pub fn run(global: &GlobalArgs, args: GetTxHashArgs) -> Result<()> {
    let chain = global.open_chain()?;
    let hash = chain.lookup_transaction(args.block_height, args.tx_index)?;
    println!("{hash}");
    Ok(())
}
