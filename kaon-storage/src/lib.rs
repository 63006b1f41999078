//! The persistent block/transaction store contract (spec.md §6).
//!
//! This crate is deliberately interface-only: the key-value/indexed
//! database that backs a real node is explicitly out of scope (spec.md
//! §1). `kaon-verification`, `kaon-mempool` and `kaon-blockchain` take a
//! `SharedStore` and call through it; nothing here ships a backing
//! implementation. Grounded on `zebra-storage`/`storage`'s
//! `Store`/`SharedStore` split (both of which are themselves
//! near-empty stubs in this pack) and on the method surface the
//! reference implementation's `fast_chain`/`safe_chain` interfaces
//! expose to the pools/validators that call through them.

mod error;
mod fork_point;
mod utxo_entry;

use std::collections::HashMap;
use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_chain::{BlockHeader, IndexedBlock, IndexedTransaction, OutPoint};
use kaon_primitives::compact::Compact;
use kaon_primitives::uint::U256;

pub use crate::error::Error;
pub use crate::fork_point::ForkPoint;
pub use crate::utxo_entry::UtxoEntry;

/// A thread-safe handle to the store, shared by the chain facade (C9) and
/// both organizers (C7/C8).
pub type SharedStore = Arc<dyn Store>;

/// The store contract the consensus core requires (spec.md §6). Every
/// method is a read unless named otherwise; reads use whatever internal
/// concurrency control the implementation provides (spec.md §5 models
/// this as a sequential-lock, but that detail is the implementation's to
/// choose — this trait only specifies the observable contract).
pub trait Store: Send + Sync {
    /// Height of the current persistent-chain top, or `None` for an empty
    /// chain (genesis not yet written).
    fn get_last_height(&self) -> Option<u32>;

    /// Full header at `height` on the persistent chain.
    fn get_header(&self, height: u32) -> Option<BlockHeader>;

    /// `nBits` of the header at `height`.
    fn get_bits(&self, height: u32) -> Option<Compact>;

    /// Signaled version of the header at `height`.
    fn get_version(&self, height: u32) -> Option<u32>;

    /// Timestamp of the header at `height`.
    fn get_timestamp(&self, height: u32) -> Option<u32>;

    /// Hash of the block at `height`.
    fn get_block_hash(&self, height: u32) -> Option<H256>;

    /// Height of the block identified by `hash`, if it is on the
    /// persistent chain.
    fn get_height(&self, hash: &H256) -> Option<u32>;

    /// Resolve `outpoint` against chain history as of `branch_height`
    /// (the fork point a candidate branch is built on). `require_confirmed`
    /// asks the store to reject an output that is itself still
    /// unconfirmed (relevant only to stores that also track a mempool
    /// view internally; the in-core mempool is handled separately by
    /// `kaon-mempool`).
    fn get_output(
        &self,
        outpoint: &OutPoint,
        branch_height: u32,
        require_confirmed: bool,
    ) -> Option<UtxoEntry>;

    /// UTXO-set-optimized variant of `get_output`: does not resolve a
    /// spent-but-still-known output, only a currently-unspent one.
    fn get_utxo(&self, outpoint: &OutPoint, branch_height: u32) -> Option<UtxoEntry>;

    /// The UTXO delta between chain heights `first` (inclusive) and `top`
    /// (inclusive) — the "reorg subset" §4.4 overlays onto branch
    /// prevout resolution so that a branch which reorgs blocks out can
    /// still resolve prevouts created in those soon-to-be-rolled-back
    /// blocks.
    fn get_utxo_pool_from(&self, first: u32, top: u32) -> HashMap<OutPoint, UtxoEntry>;

    /// Sum of proof-of-work starting at `from_height`, stopping early
    /// once the running total exceeds `ceiling` (spec.md §4.7 step 5:
    /// this lets the organizer avoid scanning an entire competing chain
    /// segment once competitiveness is already decided).
    fn get_branch_work(&self, ceiling: U256, from_height: u32) -> U256;

    /// Whether a block with this hash already exists on the persistent
    /// chain (used to reject a would-be duplicate before it is treated
    /// as an orphan).
    fn get_block_exists(&self, hash: &H256) -> bool;

    /// Atomically replace the chain suffix above `fork_point` with
    /// `incoming`, returning the blocks that were rolled off the top in
    /// `outgoing` (highest-to-lowest is the implementation's choice to
    /// document; `kaon-blockchain` does not depend on the order beyond
    /// "all of them, exactly once"). Any failure here is unrecoverable
    /// store corruption (spec.md §7) — callers log it fatal and do not
    /// retry.
    fn reorganize(
        &self,
        fork_point: ForkPoint,
        incoming: &[Arc<IndexedBlock>],
        outgoing: &mut Vec<Arc<IndexedBlock>>,
    ) -> Result<(), Error>;

    /// Append a validated loose transaction to the store's unconfirmed
    /// index (distinct from `kaon-mempool`'s in-memory admission, which
    /// happens first).
    fn push(&self, tx: &IndexedTransaction) -> Result<(), Error>;

    /// Asynchronously prune store-side bookkeeping kept only to support
    /// reorg (e.g. spend-height markers for rolled-back blocks) once it
    /// has aged out past the reorganization limit. Fire-and-forget by
    /// contract; failures are the store's own concern, not surfaced here.
    fn prune_reorg_async(&self);
}
