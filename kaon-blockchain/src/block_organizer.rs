//! The block organizer (spec.md §4.7, C7), grounded on
//! `original_source/src/pools/block_organizer.cpp`. Coordinates C4
//! validation, forest-path selection against the block pool (C3), the
//! atomic store swap, pool bookkeeping and mempool reconciliation.

use std::sync::Arc;

use kaon_chain::IndexedBlock;
use kaon_script::SharedScriptVerifier;
use kaon_storage::{ForkPoint, SharedStore};
use kaon_verification::{BlockValidator, ChainStatePopulator, ConsensusParams};
use kaon_mempool::Mempool;

use crate::block_pool::{BlockPool, PathOutcome};
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::oneshot;
use crate::priority_mutex::PriorityMutex;
use crate::fork_flags;

/// The result of a successful `organize(block)` (spec.md §4.7 step 9's
/// notification payload).
pub struct BlockOrganizeOutcome {
    pub fork_height: u32,
    pub incoming: Vec<Arc<IndexedBlock>>,
    pub outgoing: Vec<Arc<IndexedBlock>>,
}

pub struct BlockOrganizer {
    store: SharedStore,
    script_verifier: SharedScriptVerifier,
    params: ConsensusParams,
    pool: Arc<BlockPool>,
    dispatcher: Arc<Dispatcher>,
}

impl BlockOrganizer {
    pub fn new(
        store: SharedStore,
        script_verifier: SharedScriptVerifier,
        params: ConsensusParams,
        pool: Arc<BlockPool>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        BlockOrganizer {
            store,
            script_verifier,
            params,
            pool,
            dispatcher,
        }
    }

    pub fn pool(&self) -> &BlockPool {
        &self.pool
    }

    /// `organize(block)` (spec.md §4.7, steps 1-8; step 9's subscriber
    /// notification is the facade's concern since this type has no
    /// subscriber list of its own).
    pub fn organize(
        &self,
        block: Arc<IndexedBlock>,
        mempool: &PriorityMutex<Mempool>,
    ) -> Result<BlockOrganizeOutcome, Error> {
        self.dispatcher.stop_flag().check()?;

        // Step 1: context-free check, dispatched to a worker and awaited
        // on a one-shot signal, under the priority mutex's high-priority
        // acquisition so a flood of transaction admissions cannot delay it.
        {
            let _priority = mempool.lock_high_priority();
            self.run_check(&block)?;
        }

        // Step 2: resolve the forest path ending at this block.
        let branch = match self.pool.get_path(block.hash(), self.store.as_ref()) {
            PathOutcome::Empty => return Err(Error::DuplicateBlock),
            PathOutcome::Orphan => {
                self.pool.add(block.clone(), self.store.as_ref());
                return Err(Error::OrphanBlock);
            }
            PathOutcome::Branch(branch) => branch,
        };

        // Step 3: accept, then connect. `BlockValidator::accept` already
        // performs the branch-wide internal double-spend check (spec.md
        // §4.7 step 6) as part of its own contract, so there is nothing
        // left for this method to re-check once `accept` has succeeded.
        let chain_state =
            ChainStatePopulator::new(self.store.as_ref(), &self.params).populate(branch.top_height(), &branch)?;
        let validator = BlockValidator::new(self.store.as_ref(), self.script_verifier.as_ref(), &self.params);
        let acceptance = validator.accept(&block, &chain_state, &branch)?;
        let flags = fork_flags(chain_state.enabled_forks);
        validator.connect(&block, &acceptance, flags)?;

        // Step 4: timing/MTP metadata for the branch top is already
        // carried on `chain_state` (height, median_time_past); the caller
        // attaches it to the stored block once `reorganize` below commits.

        // Step 5: work-threshold comparison.
        let branch_work = branch.work();
        let (fork_height, fork_hash) = branch.fork_point();
        let threshold = self.store.get_branch_work(branch_work, fork_height);
        if branch_work <= threshold {
            self.pool.add(block.clone(), self.store.as_ref());
            return Err(Error::InsufficientWork);
        }

        // Step 7: atomic reorganize.
        let fork_point = ForkPoint {
            height: fork_height,
            hash: fork_hash,
        };
        let incoming: Vec<Arc<IndexedBlock>> = branch.blocks().to_vec();
        let mut outgoing: Vec<Arc<IndexedBlock>> = Vec::new();
        self.store
            .reorganize(fork_point, &incoming, &mut outgoing)
            .map_err(Error::from)?;

        // Step 8: pool and mempool reconciliation.
        self.pool.remove(&incoming, self.store.as_ref());
        self.pool.add_outgoing(&outgoing, self.store.as_ref());
        let top_height = fork_height + incoming.len() as u32;
        self.pool.prune(top_height, self.params.reorganization_limit);

        {
            let mut mempool = mempool.lock_high_priority();
            let mined: Vec<kaon_chain::Transaction> = incoming
                .iter()
                .flat_map(|b| b.transactions.iter().map(|tx| tx.raw.clone()))
                .collect();
            mempool.remove(&mined);

            // Re-admit transactions from the rolled-back chain whose
            // prevouts still resolve; a transaction that no longer fits
            // (now confirmed elsewhere, or double-spent by the winning
            // branch) is simply dropped, per spec.md §4.7 step 8.
            for outgoing_block in &outgoing {
                for tx in outgoing_block.transactions.iter().skip(1) {
                    let size = tx.raw.serialized_size();
                    let fee = tx.raw.minimum_fee(self.params.byte_fee_satoshis, self.params.sigop_fee_satoshis, 0);
                    let _ = mempool.add(Arc::new(tx.clone()), fee, 0).map_err(Error::from);
                    let _ = size;
                }
            }
        }

        Ok(BlockOrganizeOutcome {
            fork_height,
            incoming,
            outgoing,
        })
    }

    /// Run `BlockValidator::check` on the priority pool, returning the
    /// result through a one-shot channel (spec.md §9's "typed oneshot with
    /// exactly-one-send/one-receive semantics").
    fn run_check(&self, block: &Arc<IndexedBlock>) -> Result<(), Error> {
        let (sender, receiver) = oneshot::channel();
        let store = self.store.clone();
        let script_verifier = self.script_verifier.clone();
        let params = self.params.clone();
        let block = block.clone();
        self.dispatcher.parallel(move || {
            let validator = BlockValidator::new(store.as_ref(), script_verifier.as_ref(), &params);
            sender.send(validator.check(&block).map_err(Error::from));
        });
        receiver.recv()
    }
}
