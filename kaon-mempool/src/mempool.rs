//! The indexed-DAG mempool and block-template engine (spec.md §4.6, C6),
//! grounded on
//! `original_source/include/kth/blockchain/mining/{mempool_v2,partially_indexed}.hpp`.
//!
//! The Open Question on internal re-sort mechanics (spec.md §9) is
//! resolved here as documented in DESIGN.md: external behavior (which
//! packages end up templated, at what accumulated fee, in what final
//! order) follows the v2 semantics; the *internal* bookkeeping is a
//! plain remove-then-reinsert-at-sorted-position, not the six-region
//! displacement algebra of either legacy implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_chain::{IndexedTransaction, OutPoint, Transaction, TransactionOutput};
use kaon_verification::ConsensusParams;

use crate::ds_proof::DoubleSpendProof;
use crate::error::Error;
use crate::node::MempoolNode;

/// One line of the exported template: the transaction itself plus the
/// per-transaction accounting the caller needs to assemble a candidate
/// block (spec.md §4.6 "Template export").
#[derive(Clone)]
pub struct TemplateEntry {
    pub tx: Arc<IndexedTransaction>,
    pub fee: u64,
    pub size: usize,
    pub sigops: usize,
}

/// The snapshot `get_block_template` hands back: ordered entries plus the
/// accumulated fee total.
pub struct BlockTemplate {
    pub entries: Vec<TemplateEntry>,
    pub total_fee: u64,
}

/// Secondary transaction ordering applied only at export time (spec.md
/// §3 "Candidate ordering"): lexicographic-on-txid for one network
/// family, topological left-of-parent for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOrder {
    Ctor,
    Ltor,
}

pub struct Mempool {
    all: Vec<MempoolNode>,
    txid_index: HashMap<H256, usize>,
    outpoint_index: HashMap<OutPoint, usize>,
    local_utxo: HashMap<OutPoint, TransactionOutput>,
    candidates: Vec<usize>,
    template_fee: u64,
    template_size: usize,
    template_sigops: usize,
    ds_proofs: HashMap<H256, DoubleSpendProof>,
    max_template_size: usize,
    max_mempool_size: usize,
}

impl Mempool {
    pub fn new(params: &ConsensusParams) -> Self {
        Mempool {
            all: Vec::new(),
            txid_index: HashMap::new(),
            outpoint_index: HashMap::new(),
            local_utxo: HashMap::new(),
            candidates: Vec::new(),
            template_fee: 0,
            template_size: 0,
            template_sigops: 0,
            ds_proofs: HashMap::new(),
            max_template_size: params.max_template_size_bytes,
            max_mempool_size: params.max_mempool_size(),
        }
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn contains(&self, txid: &H256) -> bool {
        self.txid_index.contains_key(txid)
    }

    pub fn local_utxo(&self) -> &HashMap<OutPoint, TransactionOutput> {
        &self.local_utxo
    }

    /// Dynamic sigop ceiling as a function of accumulated template size,
    /// matching the density rule `kaon-verification::block_validator`
    /// applies at connect time (one sigcheck per 141 bytes, floored).
    fn sigops_limit(size: usize) -> usize {
        (size / 141).max(166)
    }

    fn fits(&self, extra_size: usize, extra_sigops: usize) -> bool {
        let size = self.template_size + extra_size;
        size <= self.max_template_size && self.template_sigops + extra_sigops <= Self::sigops_limit(size)
    }

    /// Admission (spec.md §4.6 `add(tx)`), steps 1-6.
    pub fn add(&mut self, tx: Arc<IndexedTransaction>, fee: u64, sigops: usize) -> Result<usize, Error> {
        if self.txid_index.contains_key(&tx.hash) {
            return Err(Error::DuplicateTransaction);
        }
        if self.total_size() + tx.raw.serialized_size() > self.max_mempool_size {
            return Err(Error::LowBenefitTransaction);
        }
        for input in &tx.raw.inputs {
            if self.outpoint_index.contains_key(&input.previous_output) {
                return Err(Error::DoubleSpendMempool);
            }
        }

        let size = tx.raw.serialized_size();
        let mut parents = Vec::new();
        for input in &tx.raw.inputs {
            if let Some(&parent_index) = self.txid_index.get(&input.previous_output.hash) {
                if !parents.contains(&parent_index) {
                    parents.push(parent_index);
                }
            }
        }
        let ancestors = self.ancestor_closure(&parents);

        let index = self.all.len();
        let mut node = MempoolNode::new(tx.clone(), fee, size, sigops);
        node.parents = parents.clone();
        self.all.push(node);
        for &p in &parents {
            self.all[p].children.push(index);
        }

        for (i, output) in tx.raw.outputs.iter().enumerate() {
            self.local_utxo.insert(
                OutPoint {
                    hash: tx.hash,
                    index: i as u32,
                },
                output.clone(),
            );
        }
        for input in &tx.raw.inputs {
            self.outpoint_index.insert(input.previous_output.clone(), index);
        }
        self.txid_index.insert(tx.hash, index);

        self.try_insert_template(index, &ancestors);
        Ok(index)
    }

    fn total_size(&self) -> usize {
        self.all.iter().map(|n| n.size).sum()
    }

    /// Transitive closure over `parents` edges, ascending by index. Index
    /// order already is a valid topological order: a node's parent always
    /// exists (and so has a lower index) before the node itself is added.
    fn ancestor_closure(&self, direct_parents: &[usize]) -> Vec<usize> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack: Vec<usize> = direct_parents.to_vec();
        while let Some(index) = stack.pop() {
            if seen.insert(index) {
                stack.extend(self.all[index].parents.iter().copied());
            }
        }
        let mut ancestors: Vec<usize> = seen.into_iter().collect();
        ancestors.sort_unstable();
        ancestors
    }

    fn package_members(&self, index: usize, ancestors: &[usize]) -> Vec<usize> {
        let mut members: Vec<usize> = ancestors
            .iter()
            .copied()
            .filter(|&a| self.all[a].candidate_index.is_none())
            .collect();
        members.push(index);
        members.sort_unstable();
        members.dedup();
        members
    }

    fn aggregate(&self, members: &[usize]) -> (u64, usize, usize) {
        members.iter().fold((0u64, 0usize, 0usize), |(fee, size, sigops), &m| {
            let node = &self.all[m];
            (fee + node.fee, size + node.size, sigops + node.sigops)
        })
    }

    /// Template insertion (spec.md §4.6 "Template insertion").
    fn try_insert_template(&mut self, index: usize, ancestors: &[usize]) {
        let members = self.package_members(index, ancestors);
        let (fee, size, sigops) = self.aggregate(&members);

        if self.fits(size, sigops) {
            self.insert_package(&members, fee, size, sigops);
            return;
        }

        let benefit = fee as f64 / (size.max(1)) as f64;
        if let Some(evictions) = self.plan_eviction(size, sigops, benefit) {
            self.apply_evictions(&evictions);
            self.insert_package(&members, fee, size, sigops);
        }
        // Otherwise the package's benefit does not clear the eviction
        // bar: the transaction stays in `all[]`, untemplated (spec.md
        // §4.6 step 6's "remains in all[] but is not included").
    }

    fn insert_package(&mut self, members: &[usize], package_fee: u64, package_size: usize, package_sigops: usize) {
        let mut outside_ancestors: HashSet<usize> = HashSet::new();
        for &m in members {
            self.all[m].children_fees = self.all[m].fee;
            self.all[m].children_size = self.all[m].size;
            self.all[m].children_sigops = self.all[m].sigops;

            let position = self.sorted_insert_position(self.all[m].benefit());
            self.candidates.insert(position, m);

            self.template_fee += self.all[m].fee;
            self.template_size += self.all[m].size;
            self.template_sigops += self.all[m].sigops;

            for &p in self.all[m].parents.clone().iter() {
                if !members.contains(&p) {
                    outside_ancestors.insert(p);
                }
            }
        }
        self.reindex_candidate_positions();
        self.propagate_delta(&outside_ancestors, package_fee, package_size, package_sigops, true);
    }

    fn sorted_insert_position(&self, benefit: f64) -> usize {
        // `candidates` is kept sorted descending by benefit; ties keep
        // existing order (spec.md §4.6's stable tie-break) by inserting
        // after every existing entry of equal benefit.
        self.candidates
            .partition_point(|&idx| self.all[idx].benefit() >= benefit)
    }

    fn reindex_candidate_positions(&mut self) {
        for (position, &idx) in self.candidates.iter().enumerate() {
            self.all[idx].candidate_index = Some(position);
        }
    }

    /// Resort a single node after its `children_fees/size` changed,
    /// implementing the "simplified remove-then-reinsert" resolution of
    /// the Open Question (DESIGN.md).
    fn resort_candidate(&mut self, index: usize) {
        if let Some(position) = self.candidates.iter().position(|&i| i == index) {
            self.candidates.remove(position);
            let benefit = self.all[index].benefit();
            let new_position = self
                .candidates
                .partition_point(|&idx| self.all[idx].benefit() >= benefit);
            self.candidates.insert(new_position, index);
            self.reindex_candidate_positions();
        }
    }

    /// Walk transitively up through in-template ancestors, folding
    /// `(fee, size, sigops)` into each one's aggregate counters (positive
    /// on insertion, negative on eviction) and re-sorting it.
    fn propagate_delta(&mut self, start: &HashSet<usize>, fee: u64, size: usize, sigops: usize, add: bool) {
        let mut frontier: Vec<usize> = start.iter().copied().collect();
        let mut visited: HashSet<usize> = HashSet::new();
        while let Some(anc) = frontier.pop() {
            if !visited.insert(anc) {
                continue;
            }
            if add {
                self.all[anc].children_fees += fee;
                self.all[anc].children_size += size;
                self.all[anc].children_sigops += sigops;
            } else {
                self.all[anc].children_fees = self.all[anc].children_fees.saturating_sub(fee);
                self.all[anc].children_size = self.all[anc].children_size.saturating_sub(size);
                self.all[anc].children_sigops = self.all[anc].children_sigops.saturating_sub(sigops);
            }
            self.resort_candidate(anc);
            for &p in self.all[anc].parents.clone().iter() {
                if self.all[p].candidate_index.is_some() {
                    frontier.push(p);
                }
            }
        }
    }

    /// All in-template descendants of `root` reachable through `children`
    /// edges, `root` included (the "entire candidate descendent sub-DAG"
    /// spec.md §4.6 evicts together).
    fn candidate_subtree(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        let mut seen = HashSet::new();
        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            out.push(index);
            for &c in &self.all[index].children {
                if self.all[c].candidate_index.is_some() {
                    stack.push(c);
                }
            }
        }
        out
    }

    /// Walk the template tail (worst benefit first), accumulating whole
    /// candidate subtrees until either enough room is freed or the
    /// cumulative evicted benefit would exceed the incoming package's
    /// (spec.md §4.6 "Template insertion", the eviction branch).
    fn plan_eviction(&self, needed_size: usize, needed_sigops: usize, package_benefit: f64) -> Option<Vec<usize>> {
        let mut to_evict: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut freed_size = 0usize;
        let mut freed_sigops = 0usize;
        let mut evicted_benefit_sum = 0.0f64;

        for &candidate in self.candidates.iter().rev() {
            if seen.contains(&candidate) {
                continue;
            }
            let subtree = self.candidate_subtree(candidate);
            if subtree.iter().any(|s| seen.contains(s)) {
                continue;
            }
            let (sub_fee, sub_size, sub_sigops) = self.aggregate(&subtree);
            evicted_benefit_sum += sub_fee as f64 / (sub_size.max(1)) as f64;
            if evicted_benefit_sum > package_benefit {
                return None;
            }
            for &s in &subtree {
                seen.insert(s);
            }
            to_evict.extend(subtree);
            freed_size += sub_size;
            freed_sigops += sub_sigops;

            let remaining_size = self.template_size.saturating_sub(freed_size) + needed_size;
            let remaining_sigops = self.template_sigops.saturating_sub(freed_sigops) + needed_sigops;
            if remaining_size <= self.max_template_size && remaining_sigops <= Self::sigops_limit(remaining_size) {
                return Some(to_evict);
            }
        }
        None
    }

    fn apply_evictions(&mut self, to_evict: &[usize]) {
        let evict_set: HashSet<usize> = to_evict.iter().copied().collect();

        for &n in to_evict {
            let outside: HashSet<usize> = self.all[n]
                .parents
                .iter()
                .copied()
                .filter(|p| !evict_set.contains(p) && self.all[*p].candidate_index.is_some())
                .collect();
            if !outside.is_empty() {
                let (fee, size, sigops) = (self.all[n].fee, self.all[n].size, self.all[n].sigops);
                self.propagate_delta(&outside, fee, size, sigops, false);
            }
        }

        for &n in to_evict {
            self.template_fee = self.template_fee.saturating_sub(self.all[n].fee);
            self.template_size = self.template_size.saturating_sub(self.all[n].size);
            self.template_sigops = self.template_sigops.saturating_sub(self.all[n].sigops);
            self.all[n].children_fees = 0;
            self.all[n].children_size = 0;
            self.all[n].children_sigops = 0;
            self.all[n].candidate_index = None;
        }
        self.candidates.retain(|idx| !evict_set.contains(idx));
        self.reindex_candidate_positions();
    }

    /// Block arrival (spec.md §4.6 `remove(mined_txs[])`), steps 1-4.
    pub fn remove(&mut self, mined: &[Transaction]) {
        let mut to_delete: HashSet<usize> = HashSet::new();

        for tx in mined {
            let txid = tx.hash();
            if let Some(&index) = self.txid_index.get(&txid) {
                to_delete.insert(index);
            } else {
                for input in &tx.inputs {
                    if let Some(&consumer) = self.outpoint_index.get(&input.previous_output) {
                        for s in self.candidate_subtree(consumer) {
                            to_delete.insert(s);
                        }
                        to_delete.insert(consumer);
                        for d in self.descendant_closure(consumer) {
                            to_delete.insert(d);
                        }
                    }
                }
            }
        }
        // A mined tx's own children lose the parent edge rather than
        // being deleted themselves (spec.md step 1); they simply become
        // roots of the surviving graph.
        for &index in &to_delete {
            for &child in self.all[index].children.clone().iter() {
                if !to_delete.contains(&child) {
                    self.all[child].parents.retain(|&p| p != index);
                }
            }
        }

        self.delete_and_reindex(&to_delete);
        self.rebuild_template();
    }

    fn descendant_closure(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        let mut seen = HashSet::new();
        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            out.push(index);
            stack.extend(self.all[index].children.iter().copied());
        }
        out
    }

    /// Delete `to_delete` in descending index order, remapping every
    /// surviving edge and index (spec.md step 3).
    fn delete_and_reindex(&mut self, to_delete: &HashSet<usize>) {
        if to_delete.is_empty() {
            return;
        }
        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut surviving: Vec<MempoolNode> = Vec::with_capacity(self.all.len());

        let old_all = std::mem::take(&mut self.all);
        for (old_index, node) in old_all.into_iter().enumerate() {
            if to_delete.contains(&old_index) {
                continue;
            }
            old_to_new.insert(old_index, surviving.len());
            surviving.push(node);
        }

        for node in &mut surviving {
            node.parents = node
                .parents
                .iter()
                .filter_map(|p| old_to_new.get(p).copied())
                .collect();
            node.children = node
                .children
                .iter()
                .filter_map(|c| old_to_new.get(c).copied())
                .collect();
            node.candidate_index = None;
            node.children_fees = 0;
            node.children_size = 0;
            node.children_sigops = 0;
        }

        self.txid_index = surviving
            .iter()
            .enumerate()
            .map(|(i, n)| (n.tx.hash, i))
            .collect();
        self.outpoint_index = self
            .outpoint_index
            .iter()
            .filter_map(|(point, &old)| old_to_new.get(&old).map(|&new| (point.clone(), new)))
            .collect();
        self.local_utxo
            .retain(|point, _| self.txid_index.contains_key(&point.hash));

        self.all = surviving;
        self.candidates.clear();
        self.template_fee = 0;
        self.template_size = 0;
        self.template_sigops = 0;
    }

    /// Rebuild the template from scratch in surviving-index order (spec.md
    /// step 4): equivalent to replaying `try_insert_template` for every
    /// node, since index order is still a valid topological order.
    fn rebuild_template(&mut self) {
        for index in 0..self.all.len() {
            let ancestors = self.ancestor_closure(&self.all[index].parents.clone());
            self.try_insert_template(index, &ancestors);
        }
    }

    /// Template export (spec.md §4.6 `get_block_template()`). The
    /// high-priority-critical-section / snapshot-then-sort-outside-lock
    /// structure described there is a concurrency detail owned by the
    /// chain facade (C9) that calls this; here it is a pure function of
    /// the current candidate list.
    pub fn get_block_template(&self, order: TemplateOrder) -> BlockTemplate {
        let mut entries: Vec<TemplateEntry> = self
            .candidates
            .iter()
            .map(|&index| {
                let node = &self.all[index];
                TemplateEntry {
                    tx: node.tx.clone(),
                    fee: node.fee,
                    size: node.size,
                    sigops: node.sigops,
                }
            })
            .collect();

        match order {
            TemplateOrder::Ctor => entries.sort_by(|a, b| a.tx.hash.cmp(&b.tx.hash)),
            TemplateOrder::Ltor => self.topological_sort_left_of_parent(&mut entries),
        }

        let total_fee = entries.iter().map(|e| e.fee).sum();
        BlockTemplate { entries, total_fee }
    }

    /// Stable sort that keeps the existing (fee-benefit) order wherever
    /// topology allows, moving a transaction only as far left as its
    /// latest-appearing in-template ancestor requires (spec.md §3
    /// "Candidate ordering": "topological left-of-parent placement").
    fn topological_sort_left_of_parent(&self, entries: &mut Vec<TemplateEntry>) {
        let position: HashMap<H256, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.tx.hash, i))
            .collect();
        let mut order: Vec<usize> = (0..entries.len()).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..order.len() {
                let entry_index = order[i];
                let tx = &entries[entry_index].tx;
                let mut min_parent_position = 0usize;
                for input in &tx.raw.inputs {
                    if let Some(&parent_original_index) = position.get(&input.previous_output.hash) {
                        let parent_current_position =
                            order.iter().position(|&o| o == parent_original_index).unwrap_or(0);
                        min_parent_position = min_parent_position.max(parent_current_position + 1);
                    }
                }
                if min_parent_position > i {
                    let moved = order.remove(i);
                    let target = min_parent_position.min(order.len());
                    order.insert(target, moved);
                    changed = true;
                }
            }
        }
        let reordered: Vec<TemplateEntry> = order.into_iter().map(|i| entries[i].clone()).collect();
        *entries = reordered;
    }

    pub fn insert_ds_proof(&mut self, proof: DoubleSpendProof) -> H256 {
        let hash = proof.hash();
        self.ds_proofs.insert(hash, proof);
        hash
    }

    pub fn get_ds_proof(&self, hash: &H256) -> Option<&DoubleSpendProof> {
        self.ds_proofs.get(hash)
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn template_totals(&self) -> (u64, usize, usize) {
        (self.template_fee, self.template_size, self.template_sigops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaon_chain::{IndexedTransaction, Transaction, TransactionInput, TransactionOutput};
    use kaon_primitives::bytes::Bytes;

    fn tx_spending(parent: Option<H256>, seed: u8, value_out: u64) -> Arc<IndexedTransaction> {
        let inputs = match parent {
            Some(hash) => vec![TransactionInput {
                previous_output: OutPoint { hash, index: 0 },
                script_sig: Bytes::new(),
                sequence: 0,
            }],
            None => {
                let mut bytes = [0u8; 32];
                bytes[0] = seed;
                vec![TransactionInput {
                    previous_output: OutPoint { hash: H256::from(bytes), index: 0 },
                    script_sig: Bytes::new(),
                    sequence: 0,
                }]
            }
        };
        let raw = Transaction {
            version: 1,
            inputs,
            outputs: vec![TransactionOutput { value: value_out, script_pubkey: Bytes::new() }],
            lock_time: 0,
        };
        Arc::new(IndexedTransaction::from_raw(raw))
    }

    #[test]
    fn add_rejects_duplicate_txid() {
        let params = ConsensusParams::default();
        let mut mempool = Mempool::new(&params);
        let tx = tx_spending(None, 1, 1000);
        mempool.add(tx.clone(), 10, 0).unwrap();
        assert_eq!(mempool.add(tx, 10, 0), Err(Error::DuplicateTransaction));
    }

    #[test]
    fn add_rejects_mempool_double_spend() {
        let params = ConsensusParams::default();
        let mut mempool = Mempool::new(&params);
        let root = H256::from([7u8; 32]);
        let input = TransactionInput {
            previous_output: OutPoint { hash: root, index: 0 },
            script_sig: Bytes::new(),
            sequence: 0,
        };
        let tx1 = Arc::new(IndexedTransaction::from_raw(Transaction {
            version: 1,
            inputs: vec![input.clone()],
            outputs: vec![TransactionOutput { value: 100, script_pubkey: Bytes::new() }],
            lock_time: 0,
        }));
        let tx2 = Arc::new(IndexedTransaction::from_raw(Transaction {
            version: 1,
            inputs: vec![input],
            outputs: vec![TransactionOutput { value: 200, script_pubkey: Bytes::new() }],
            lock_time: 1,
        }));
        mempool.add(tx1, 10, 0).unwrap();
        assert_eq!(mempool.add(tx2, 10, 0), Err(Error::DoubleSpendMempool));
    }

    #[test]
    fn child_admission_raises_parent_aggregate_benefit() {
        let params = ConsensusParams::default();
        let mut mempool = Mempool::new(&params);

        let parent = tx_spending(None, 1, 100_000);
        mempool.add(parent.clone(), 100, 0).unwrap();
        let parent_index = mempool.txid_index[&parent.hash];
        assert_eq!(mempool.all[parent_index].benefit(), 100.0 / mempool.all[parent_index].size as f64);

        let child = tx_spending(Some(parent.hash), 0, 90_000);
        mempool.add(child, 50, 0).unwrap();

        let total = mempool.all[parent_index].children_fees;
        assert_eq!(total, 150);
    }

    #[test]
    fn remove_clears_mined_transaction_and_rebuilds_template() {
        let params = ConsensusParams::default();
        let mut mempool = Mempool::new(&params);
        let tx = tx_spending(None, 1, 1000);
        mempool.add(tx.clone(), 10, 0).unwrap();
        assert_eq!(mempool.len(), 1);

        mempool.remove(&[tx.raw.clone()]);
        assert_eq!(mempool.len(), 0);
        assert!(!mempool.contains(&tx.hash));
    }

    #[test]
    fn ctor_export_orders_by_txid() {
        let params = ConsensusParams::default();
        let mut mempool = Mempool::new(&params);
        let tx_a = tx_spending(None, 1, 1000);
        let tx_b = tx_spending(None, 2, 2000);
        mempool.add(tx_a.clone(), 10, 0).unwrap();
        mempool.add(tx_b.clone(), 10, 0).unwrap();

        let template = mempool.get_block_template(TemplateOrder::Ctor);
        assert_eq!(template.entries.len(), 2);
        assert!(template.entries[0].tx.hash <= template.entries[1].tx.hash);
    }
}
