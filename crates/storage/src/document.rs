//! Persisted block layout.
//!
//! A stored header is the header record plus its `hash`. The hash is
//! derived data: it is written for readers of the file and checked, never
//! trusted, on load.

use crate::codec::{Result, StorageError};
use merklechain_core::{Block, BlockHeader, Hash, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHeader {
    #[serde(flatten)]
    pub header: BlockHeader,
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub header: StoredHeader,
    pub transactions: Vec<Transaction>,
}

impl From<&Block> for StoredBlock {
    fn from(block: &Block) -> Self {
        Self {
            header: StoredHeader {
                header: block.header.clone(),
                hash: block.hash(),
            },
            transactions: block.transactions.clone(),
        }
    }
}

impl StoredBlock {
    /// Recover the block, rejecting a stored hash that disagrees with the
    /// header it is stored with.
    pub fn into_block(self) -> Result<Block> {
        let StoredHeader { header, hash } = self.header;
        let computed = header.hash();
        if computed != hash {
            return Err(StorageError::HashMismatch {
                height: header.height,
                stored: hash,
                computed,
            });
        }
        Ok(Block::new(header, self.transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklechain_core::{HexString, NULL_HASH};

    fn block() -> Block {
        let tx = Transaction::new(
            HexString::new("0xaa").unwrap(),
            HexString::new("0xbb").unwrap(),
            100,
            5,
            1_697_412_600,
        );
        let header = BlockHeader {
            height: 0,
            previous_hash: NULL_HASH,
            merkle_root: tx.hash(),
            timestamp: 1_697_412_600,
            nonce: 3,
            difficulty: 1,
            miner: HexString::new("0xdc45038aee5144bbfa641912eaf32ebf2bad2bd7").unwrap(),
            transactions_count: 1,
        };
        Block::new(header, vec![tx])
    }

    #[test]
    fn test_stored_layout() {
        let block = block();
        let value = serde_json::to_value(StoredBlock::from(&block)).unwrap();
        let header = &value["header"];

        assert_eq!(header["hash"], block.hash().to_string());
        assert_eq!(header["previous_block_header_hash"], NULL_HASH.to_string());
        assert_eq!(header["transactions_merkle_root"], block.header.merkle_root.to_string());
        assert_eq!(header["transactions_count"], 1);
        assert_eq!(value["transactions"][0]["transaction_fee"], 5);
    }

    #[test]
    fn test_roundtrip_checks_hash() {
        let block = block();
        let stored = StoredBlock::from(&block);
        assert_eq!(stored.clone().into_block().unwrap(), block);

        let mut tampered = stored;
        tampered.header.header.nonce += 1;
        assert!(matches!(
            tampered.into_block(),
            Err(StorageError::HashMismatch { height: 0, .. })
        ));
    }
}
