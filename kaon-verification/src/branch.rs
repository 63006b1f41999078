//! The branch model (spec.md §4.2, C2), grounded on
//! `original_source/src/pools/branch.cpp`.

use std::collections::HashMap;
use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_chain::{IndexedBlock, OutPoint, TransactionOutput};
use kaon_primitives::compact::Compact;
use kaon_primitives::uint::U256;

use crate::error::Error;

/// A point→output overlay for one block's own transactions, used to
/// resolve prevouts created inside the branch without re-scanning every
/// transaction linearly (spec.md §3 Branch invariants; `branch.cpp`'s
/// `create_local_utxo_set`).
pub fn create_local_utxo_set(block: &IndexedBlock) -> HashMap<OutPoint, TransactionOutput> {
    let mut map = HashMap::new();
    for tx in &block.transactions {
        for (index, output) in tx.raw.outputs.iter().enumerate() {
            map.insert(
                OutPoint {
                    hash: tx.hash,
                    index: index as u32,
                },
                output.clone(),
            );
        }
    }
    map
}

/// `{fork_height, blocks[]}` with `blocks[0]` the first above the fork
/// point (spec.md §3 "Branch."). An empty branch is the mempool's virtual
/// tip ("current chain top").
#[derive(Clone, Default)]
pub struct Branch {
    fork_height: u32,
    blocks: Vec<Arc<IndexedBlock>>,
}

impl Branch {
    pub fn new(fork_height: u32) -> Self {
        Branch {
            fork_height,
            blocks: Vec::new(),
        }
    }

    pub fn set_height(&mut self, height: u32) {
        self.fork_height = height;
    }

    pub fn height(&self) -> u32 {
        self.fork_height
    }

    pub fn empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Arc<IndexedBlock>] {
        &self.blocks
    }

    pub fn top(&self) -> Option<&Arc<IndexedBlock>> {
        self.blocks.last()
    }

    pub fn top_height(&self) -> u32 {
        self.fork_height + self.blocks.len() as u32
    }

    /// The hash new blocks above this branch must link to: either the
    /// branch's own front block's parent hash, or (empty branch) the null
    /// hash (meaning "the fork point itself", per `branch.cpp::hash`).
    pub fn hash(&self) -> H256 {
        self.blocks
            .first()
            .map(|b| *b.previous_block_hash())
            .unwrap_or_default()
    }

    /// Appends to the *front* of the branch (the branch grows upward from
    /// the fork point; `blocks[0]` is always the oldest). Fails if `block`
    /// does not link to the current front.
    pub fn push_front(&mut self, block: Arc<IndexedBlock>) -> bool {
        let linked = match self.blocks.first() {
            None => true,
            Some(front) => front.previous_block_hash() == block.hash(),
        };
        if linked {
            self.blocks.insert(0, block);
        }
        linked
    }

    /// Total proof-of-work across the branch, Bitcoin's `chainwork`
    /// accumulation: for each header, `(!target / (target + 1)) + 1`.
    pub fn work(&self) -> U256 {
        let mut total = U256::zero();
        for block in &self.blocks {
            total = total + proof_of_work(block.header.raw.bits);
        }
        total
    }

    fn index_of(&self, height: u32) -> Option<usize> {
        if height <= self.fork_height {
            return None;
        }
        Some((height - self.fork_height - 1) as usize)
    }

    pub fn height_at(&self, index: usize) -> u32 {
        self.fork_height + index as u32 + 1
    }

    pub fn get_bits(&self, height: u32) -> Option<Compact> {
        let index = self.index_of(height)?;
        self.blocks.get(index).map(|b| b.header.raw.bits)
    }

    pub fn get_version(&self, height: u32) -> Option<u32> {
        let index = self.index_of(height)?;
        self.blocks.get(index).map(|b| b.header.raw.version)
    }

    pub fn get_timestamp(&self, height: u32) -> Option<u32> {
        let index = self.index_of(height)?;
        self.blocks.get(index).map(|b| b.header.raw.time)
    }

    pub fn get_block_hash(&self, height: u32) -> Option<H256> {
        let index = self.index_of(height)?;
        self.blocks.get(index).map(|b| *b.hash())
    }

    fn median_time_past_at(&self, index: usize) -> u32 {
        self.blocks[index].validation.median_time_past
    }

    /// Whether `outpoint` is already spent by a non-top block within this
    /// branch (BIP30-style internal double spend check). Grounded on
    /// `branch.cpp::populate_spent`: the top block is excluded from the
    /// scan under the assumption that `IndexedBlock::check` already
    /// rejects internal double spends within a single block.
    pub fn populate_spent(&self, outpoint: &OutPoint) -> (bool, bool) {
        if self.blocks.len() < 2 {
            return (false, false);
        }
        let spent = self.blocks[..self.blocks.len() - 1].iter().any(|block| {
            block.transactions.iter().skip(1).any(|tx| {
                tx.raw
                    .inputs
                    .iter()
                    .any(|input| &input.previous_output == outpoint)
            })
        });
        (spent, spent)
    }

    /// Resolve `outpoint` against the branch's own blocks, most-recent
    /// first (BIP30 ordering), optionally via a precomputed per-block
    /// local UTXO overlay. Returns `(height, median_time_past, output,
    /// is_coinbase)` on a hit.
    pub fn populate_prevout(
        &self,
        outpoint: &OutPoint,
        overlay: Option<&[HashMap<OutPoint, TransactionOutput>]>,
    ) -> Option<(u32, u32, TransactionOutput, bool)> {
        if outpoint.is_null() {
            return None;
        }

        let count = self.blocks.len();
        for forward in 0..count {
            let index = count - forward - 1;
            if let Some(overlay) = overlay {
                if let Some(output) = overlay[index].get(outpoint) {
                    let coinbase = self.blocks[index]
                        .transactions
                        .first()
                        .map(|tx| tx.hash == outpoint.hash)
                        .unwrap_or(false);
                    return Some((
                        self.height_at(index),
                        self.median_time_past_at(index),
                        output.clone(),
                        coinbase,
                    ));
                }
            } else {
                let txs = &self.blocks[index].transactions;
                for tx in txs {
                    if tx.hash == outpoint.hash {
                        if let Some(output) = tx.raw.outputs.get(outpoint.index as usize) {
                            let coinbase = txs.first().map(|t| t.hash == tx.hash).unwrap_or(false);
                            return Some((
                                self.height_at(index),
                                self.median_time_past_at(index),
                                output.clone(),
                                coinbase,
                            ));
                        }
                    }
                }
            }
        }
        None
    }

    pub fn fork_point(&self) -> (u32, H256) {
        (self.fork_height, self.hash())
    }

    /// Internal double-spend check across every non-coinbase transaction
    /// in the branch (spec.md §4.7 step 6), used when the winning branch
    /// spans more than one block.
    pub fn has_internal_double_spend(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        for block in &self.blocks {
            for tx in block.transactions.iter().skip(1) {
                for input in &tx.raw.inputs {
                    if !seen.insert(input.previous_output.clone()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn non_coinbase_input_count(&self) -> usize {
        self.blocks.iter().map(|b| b.total_inputs(false)).sum()
    }
}

/// Bitcoin's standard `chainwork` contribution of a single header:
/// `(~target / (target + 1)) + 1`, saturating to zero work for an
/// unparseable (negative/overflowed) `bits` value.
pub fn proof_of_work(bits: Compact) -> U256 {
    match bits.to_u256() {
        Ok(target) if !target.is_zero() => {
            let max = !U256::zero();
            max / (target + U256::one()) + U256::one()
        }
        _ => U256::zero(),
    }
}

/// Thin wrapper so callers that only have a fork-height-qualifying error
/// can surface it through this crate's `Error` type.
pub fn header_unavailable() -> Error {
    Error::HeaderUnavailable
}
