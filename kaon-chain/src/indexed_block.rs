use std::fmt;
use kaon_primitives::hash::H256;
use crate::block::Block;
use crate::indexed_header::IndexedBlockHeader;
use crate::indexed_transaction::IndexedTransaction;
use crate::validation::{BlockError, BlockValidation};

/// A block together with its cached header hash, per-transaction hashes,
/// and the mutable validation metadata the block/transaction organizers
/// attach while it moves through check/accept/connect.
pub struct IndexedBlock {
    pub header: IndexedBlockHeader,
    pub transactions: Vec<IndexedTransaction>,
    pub validation: BlockValidation,
}

impl IndexedBlock {
    pub fn new(header: IndexedBlockHeader, transactions: Vec<IndexedTransaction>) -> Self {
        IndexedBlock {
            header,
            transactions,
            validation: BlockValidation::default(),
        }
    }

    pub fn from_raw(block: Block) -> Self {
        let header = IndexedBlockHeader::from_raw(block.header);
        let transactions = block
            .transactions
            .into_iter()
            .map(IndexedTransaction::from_raw)
            .collect();
        IndexedBlock::new(header, transactions)
    }

    pub fn hash(&self) -> &H256 {
        &self.header.hash
    }

    pub fn previous_block_hash(&self) -> &H256 {
        &self.header.raw.previous_header_hash
    }

    pub fn merkle_root(&self) -> H256 {
        let hashes: Vec<_> = self.transactions.iter().map(|tx| tx.hash.clone()).collect();
        crate::merkle_root::merkle_root(&hashes)
    }

    pub fn size(&self) -> usize {
        let raw: Block = self.to_raw();
        raw.serialized_size()
    }

    pub fn to_raw(&self) -> Block {
        Block {
            header: self.header.raw.clone(),
            transactions: self.transactions.iter().map(|tx| tx.raw.clone()).collect(),
        }
    }

    /// Context-free check: non-empty, coinbase first and only, no
    /// duplicate txids, merkle root matches. Grounded on
    /// `zebra-verification/src/verify_block.rs`'s `BlockVerifier`.
    pub fn check(&self) -> Result<(), BlockError> {
        if self.transactions.is_empty() {
            return Err(BlockError::Failed("empty block".into()));
        }
        if !self.transactions[0].raw.is_coinbase() {
            return Err(BlockError::Failed("first transaction is not coinbase".into()));
        }
        if self.transactions.iter().skip(1).any(|tx| tx.raw.is_coinbase()) {
            return Err(BlockError::Failed("misplaced coinbase".into()));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.transactions.len());
        for tx in &self.transactions {
            if !seen.insert(tx.hash.clone()) {
                return Err(BlockError::Failed("duplicated transaction".into()));
            }
        }
        if self.merkle_root() != self.header.raw.merkle_root_hash {
            return Err(BlockError::Failed("merkle root mismatch".into()));
        }
        Ok(())
    }

    pub fn total_inputs(&self, include_coinbase: bool) -> usize {
        self.transactions
            .iter()
            .skip(if include_coinbase { 0 } else { 1 })
            .map(|tx| tx.raw.inputs.len())
            .sum()
    }
}

impl fmt::Debug for IndexedBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexedBlock")
            .field("hash", &self.header.hash.to_reversed_str())
            .field("transactions", &self.transactions.len())
            .finish()
    }
}

impl From<Block> for IndexedBlock {
    fn from(block: Block) -> Self {
        IndexedBlock::from_raw(block)
    }
}
