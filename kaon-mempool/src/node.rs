use std::sync::Arc;

use kaon_chain::IndexedTransaction;

/// One node of the mempool's indexed DAG (spec.md §3 "Mempool node").
/// `children_fees/size/sigops` aggregate the node's own totals plus every
/// in-template descendant reachable transitively through `children`
/// (the invariant §8 calls "mempool package accounting"); they are
/// meaningful only while `candidate_index.is_some()`.
pub struct MempoolNode {
    pub tx: Arc<IndexedTransaction>,
    pub fee: u64,
    pub size: usize,
    pub sigops: usize,
    pub output_count: usize,
    pub parents: Vec<usize>,
    pub children: Vec<usize>,
    pub children_fees: u64,
    pub children_size: usize,
    pub children_sigops: usize,
    pub candidate_index: Option<usize>,
}

impl MempoolNode {
    pub fn new(tx: Arc<IndexedTransaction>, fee: u64, size: usize, sigops: usize) -> Self {
        let output_count = tx.raw.outputs.len();
        MempoolNode {
            tx,
            fee,
            size,
            sigops,
            output_count,
            parents: Vec::new(),
            children: Vec::new(),
            children_fees: 0,
            children_size: 0,
            children_sigops: 0,
            candidate_index: None,
        }
    }

    /// Package benefit used as the candidate sort key: fee density of the
    /// node together with everything templated beneath it.
    pub fn benefit(&self) -> f64 {
        if self.children_size == 0 {
            return 0.0;
        }
        self.children_fees as f64 / self.children_size as f64
    }
}
