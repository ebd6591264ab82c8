//! Loading and saving chain, mempool and proof files.

use crate::codec::{read_json, write_json, Format, Result};
use crate::document::StoredBlock;
use merklechain_core::{Block, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Load every block of a chain file, checking each stored header hash.
pub fn load_chain(path: &Path) -> Result<Vec<Block>> {
    let stored: Vec<StoredBlock> = read_json(path)?;
    let blocks = stored
        .into_iter()
        .map(StoredBlock::into_block)
        .collect::<Result<Vec<_>>>()?;
    debug!(path = %path.display(), blocks = blocks.len(), "loaded chain");
    Ok(blocks)
}

/// Like [`load_chain`], but a missing file is an empty chain.
pub fn load_chain_or_empty(path: &Path) -> Result<Vec<Block>> {
    match load_chain(path) {
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "no chain file, starting empty");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Save a chain as gzipped JSON.
pub fn save_chain(path: &Path, blocks: &[Block]) -> Result<()> {
    let stored: Vec<StoredBlock> = blocks.iter().map(StoredBlock::from).collect();
    write_json(path, &stored, Format::Gzip)?;
    debug!(path = %path.display(), blocks = blocks.len(), "saved chain");
    Ok(())
}

/// Load pending transactions.
pub fn load_mempool(path: &Path) -> Result<Vec<Transaction>> {
    let txs: Vec<Transaction> = read_json(path)?;
    debug!(path = %path.display(), transactions = txs.len(), "loaded mempool");
    Ok(txs)
}

/// Save pending transactions as gzipped JSON.
pub fn save_mempool(path: &Path, txs: &[Transaction]) -> Result<()> {
    write_json(path, txs, Format::Gzip)?;
    debug!(path = %path.display(), transactions = txs.len(), "saved mempool");
    Ok(())
}

/// Load a proof document.
pub fn load_proof<P: DeserializeOwned>(path: &Path) -> Result<P> {
    read_json(path)
}

/// Save a proof document as plain, pretty-printed JSON.
pub fn save_proof<P: Serialize>(path: &Path, proof: &P) -> Result<()> {
    write_json(path, proof, Format::Plain)
}
