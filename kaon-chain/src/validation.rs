//! Mutable validation metadata attached to blocks and transactions as they
//! move through check/accept/connect (spec.md §3, "Block."/"Transaction.").
//!
//! The reference implementation stores these as plain mutable members on
//! the block/transaction object (single-threaded-per-object access once a
//! branch tip is being validated). The Rust port keeps the same shape but
//! wraps it behind a small struct so ownership is explicit; callers that
//! need to share it across validation buckets put the owning
//! `IndexedBlock`/`IndexedTransaction` behind an `Arc`.

use kaon_primitives::compact::Compact;
use crate::transaction::TransactionOutput;

/// Resolved previous-output state for one transaction input.
#[derive(Debug, Clone, Default)]
pub struct PrevoutValidation {
    pub output: Option<TransactionOutput>,
    pub height: Option<u32>,
    pub median_time_past: u32,
    pub coinbase: bool,
    pub spent: bool,
    pub confirmed: bool,
    pub from_mempool: bool,
}

impl PrevoutValidation {
    pub fn is_valid(&self) -> bool {
        self.output.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionValidation {
    /// Per-input resolved prevout state, parallel to `Transaction::inputs`.
    pub prevouts: Vec<PrevoutValidation>,
    /// Already admitted to the mempool in its current form.
    pub validated: bool,
    /// Pool-validated under the currently active fork set (cache hit fast
    /// path for `validate_block::connect_inputs`).
    pub current: bool,
    /// Dry-run: validate without admitting (RPC-style `transaction_validate`).
    pub simulate: bool,
    /// Cached sigop/sigcheck count.
    pub sigops: usize,
}

#[derive(Debug, Clone)]
pub enum BlockError {
    None,
    Failed(String),
}

impl Default for BlockError {
    fn default() -> Self {
        BlockError::None
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockValidation {
    pub height: Option<u32>,
    pub median_time_past: u32,
    pub error: BlockError,
    pub simulate: bool,
    pub cache_efficiency: f32,
    /// Active rule-fork bitmask as of this block's chain state (bits map
    /// 1:1 onto `kaon_verification::RuleFork`; kept as a plain mask here so
    /// `kaon-chain` does not depend on `kaon-verification`).
    pub enabled_forks: u32,
    pub bits: Compact,
}
