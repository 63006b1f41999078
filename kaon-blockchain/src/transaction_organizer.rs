//! The transaction organizer (spec.md §4.8, C8), grounded on
//! `original_source/src/pools/transaction_organizer.cpp`. Coordinates C5
//! validation against the mempool's virtual chain tip, mempool admission
//! (C6) and double-spend-proof admission.

use std::sync::Arc;

use kaon_chain::IndexedTransaction;
use kaon_mempool::{DoubleSpendProof, Mempool};
use kaon_script::SharedScriptVerifier;
use kaon_storage::SharedStore;
use kaon_verification::branch::Branch;
use kaon_verification::{ChainStatePopulator, ConsensusParams, TransactionValidator};

use crate::error::Error;
use crate::fork_flags;
use crate::priority_mutex::PriorityMutex;

pub struct TransactionOrganizer {
    store: SharedStore,
    script_verifier: SharedScriptVerifier,
    params: ConsensusParams,
}

impl TransactionOrganizer {
    pub fn new(store: SharedStore, script_verifier: SharedScriptVerifier, params: ConsensusParams) -> Self {
        TransactionOrganizer {
            store,
            script_verifier,
            params,
        }
    }

    /// `organize(tx)` (spec.md §4.8): check/accept/connect against the
    /// mempool's virtual chain tip, then admit to the mempool and push to
    /// the store's unconfirmed index. Runs entirely under the priority
    /// mutex's low-priority acquisition (spec.md §4.8 step 1), so any
    /// queued block organization goes first.
    pub fn organize(
        &self,
        tx: Arc<IndexedTransaction>,
        mempool: &PriorityMutex<Mempool>,
    ) -> Result<(), Error> {
        let mut mempool = mempool.lock_low_priority();

        let chain_state = ChainStatePopulator::new(self.store.as_ref(), &self.params).populate_top()?;
        let branch = Branch::new(chain_state.height.saturating_sub(1));
        let validator = TransactionValidator::new(self.store.as_ref(), self.script_verifier.as_ref(), &self.params);

        validator.check(&tx.raw)?;
        let local_utxo = mempool.local_utxo().clone();
        let acceptance = validator.accept(&tx.raw, &chain_state, &branch, None, Some(&local_utxo))?;
        let flags = fork_flags(chain_state.enabled_forks);
        let connection = validator.connect(&tx.raw, &acceptance, flags)?;

        mempool.add(tx.clone(), connection.fee, connection.sigchecks as usize)?;

        self.store.push(&tx).map_err(Error::from)?;

        Ok(())
    }

    /// Straight-through DSProof admission (spec.md §4.6 "Double-spend
    /// proofs"), under the same low-priority section as transaction
    /// admission.
    pub fn organize_ds_proof(
        &self,
        proof: DoubleSpendProof,
        mempool: &PriorityMutex<Mempool>,
    ) -> kaon_chain::hash::H256 {
        let mut mempool = mempool.lock_low_priority();
        mempool.insert_ds_proof(proof)
    }
}
