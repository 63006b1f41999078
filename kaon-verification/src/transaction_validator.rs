//! Single-transaction check/accept/connect (spec.md §4.5, C5), grounded on
//! `original_source/src/validate/validate_transaction.cpp`.
//!
//! The reference implementation stores accept/connect results back onto
//! the transaction object it was handed. Sharing a transaction across
//! concurrent validation buckets (spec.md §5) rules that out here without
//! a lock this crate has no reason to need, so `accept`/`connect` return
//! owned result structs instead; callers (the mempool, the organizers)
//! fold them into the `IndexedTransaction` they keep.

use std::collections::HashMap;

use kaon_chain::{OutPoint, Transaction, TransactionOutput};
use kaon_chain::validation::PrevoutValidation;
use kaon_script::{ScriptFlags, ScriptVerifier, VerifyContext};
use kaon_storage::Store;

use crate::branch::Branch;
use crate::chain_state::ChainState;
use crate::error::Error;
use crate::params::ConsensusParams;

/// The coinbase maturity rule: a coinbase output cannot be spent until
/// this many confirmations have accumulated (spec.md §4.5's "coinbase
/// maturity" edge case).
pub const COINBASE_MATURITY: u32 = 100;

/// Result of `accept`: resolved prevout state for every input, parallel
/// to `Transaction::inputs`.
#[derive(Debug, Clone, Default)]
pub struct TransactionAcceptance {
    pub prevouts: Vec<PrevoutValidation>,
}

/// Result of `connect`: the fee and sigcheck count a caller folds into
/// block-level accounting (spec.md §4.4's "Accumulate sigchecks across
/// the entire block").
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionConnection {
    pub fee: u64,
    pub sigchecks: u32,
}

pub struct TransactionValidator<'a> {
    store: &'a dyn Store,
    script_verifier: &'a dyn ScriptVerifier,
    params: &'a ConsensusParams,
}

impl<'a> TransactionValidator<'a> {
    pub fn new(store: &'a dyn Store, script_verifier: &'a dyn ScriptVerifier, params: &'a ConsensusParams) -> Self {
        TransactionValidator {
            store,
            script_verifier,
            params,
        }
    }

    /// Context-free structural checks (spec.md §4.5 Check): non-empty
    /// input/output lists, no duplicated inputs within the transaction,
    /// total output value does not overflow, coinbase script length
    /// within bounds.
    pub fn check(&self, tx: &Transaction) -> Result<(), Error> {
        if tx.inputs.is_empty() {
            return Err(Error::InvalidTransaction("no inputs"));
        }
        if tx.outputs.is_empty() {
            return Err(Error::InvalidTransaction("no outputs"));
        }

        if tx.is_coinbase() {
            let script_len = tx.inputs[0].script_sig.len();
            if script_len < 2 || script_len > 100 {
                return Err(Error::InvalidTransaction("coinbase script out of bounds"));
            }
        } else {
            let mut seen = std::collections::HashSet::with_capacity(tx.inputs.len());
            for input in &tx.inputs {
                if input.previous_output.is_null() {
                    return Err(Error::InvalidTransaction("null prevout in non-coinbase spend"));
                }
                if !seen.insert(&input.previous_output) {
                    return Err(Error::InvalidTransaction("duplicate input"));
                }
            }
        }

        let mut total = 0u64;
        for output in &tx.outputs {
            total = total
                .checked_add(output.value)
                .ok_or(Error::InvalidTransaction("output value overflow"))?;
        }
        if total > 21_000_000 * 100_000_000 {
            return Err(Error::InvalidTransaction("output value exceeds money supply"));
        }

        Ok(())
    }

    /// Resolve every input's prevout against the branch overlay first,
    /// then the persistent store, then (if given) a mempool-local view
    /// (spec.md §4.2's layered resolution order), and apply the
    /// contextual checks that only need the resolved prevouts: coinbase
    /// maturity, internal-branch double spend, final-in-block lock time.
    pub fn accept(
        &self,
        tx: &Transaction,
        chain_state: &ChainState,
        branch: &Branch,
        branch_overlay: Option<&[HashMap<OutPoint, TransactionOutput>]>,
        mempool_view: Option<&HashMap<OutPoint, TransactionOutput>>,
    ) -> Result<TransactionAcceptance, Error> {
        if tx.is_coinbase() {
            return Ok(TransactionAcceptance {
                prevouts: vec![PrevoutValidation::default()],
            });
        }

        if !tx.is_final_in_block(chain_state.height, chain_state.self_timestamp) {
            return Err(Error::InvalidTransaction("non-final transaction"));
        }

        let mut prevouts = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let outpoint = &input.previous_output;

            if let Some((height, mtp, output, coinbase)) = branch.populate_prevout(outpoint, branch_overlay) {
                let (spent, confirmed) = branch.populate_spent(outpoint);
                if spent {
                    return Err(Error::DoubleSpend);
                }
                prevouts.push(PrevoutValidation {
                    output: Some(output),
                    height: Some(height),
                    median_time_past: mtp,
                    coinbase,
                    spent: false,
                    confirmed,
                    from_mempool: false,
                });
                continue;
            }

            if let Some(entry) = self.store.get_utxo(outpoint, branch.height()) {
                if coinbase_immature(entry.height, chain_state.height) {
                    return Err(Error::InvalidTransaction("immature coinbase spend"));
                }
                prevouts.push(PrevoutValidation {
                    output: Some(entry.output),
                    height: Some(entry.height),
                    median_time_past: entry.median_time_past,
                    coinbase: entry.coinbase,
                    spent: false,
                    confirmed: true,
                    from_mempool: false,
                });
                continue;
            }

            if let Some(output) = mempool_view.and_then(|view| view.get(outpoint)) {
                prevouts.push(PrevoutValidation {
                    output: Some(output.clone()),
                    height: None,
                    median_time_past: chain_state.median_time_past,
                    coinbase: false,
                    spent: false,
                    confirmed: false,
                    from_mempool: true,
                });
                continue;
            }

            return Err(Error::MissingPreviousOutput);
        }

        Ok(TransactionAcceptance { prevouts })
    }

    /// Run the script verifier over every non-coinbase input and total
    /// the fee, the subtraction the reference implementation performs in
    /// `validate_transaction.cpp::check_signature_operations` immediately
    /// after script success (spec.md §4.5 Connect).
    pub fn connect(
        &self,
        tx: &Transaction,
        acceptance: &TransactionAcceptance,
        flags: ScriptFlags,
    ) -> Result<TransactionConnection, Error> {
        if tx.is_coinbase() {
            return Ok(TransactionConnection {
                fee: 0,
                sigchecks: 0,
            });
        }

        let mut total_in = 0u64;
        let mut sigchecks = 0u32;
        for (index, input) in tx.inputs.iter().enumerate() {
            let prevout = acceptance
                .prevouts
                .get(index)
                .and_then(|p| p.output.as_ref())
                .ok_or(Error::MissingPreviousOutput)?;

            let ctx = VerifyContext {
                transaction: tx,
                input_index: index,
                prevout_script: &prevout.script_pubkey,
                prevout_value: prevout.value,
                flags,
            };
            sigchecks += self.script_verifier.verify(&ctx)?;
            total_in = total_in
                .checked_add(prevout.value)
                .ok_or(Error::InvalidTransaction("input value overflow"))?;
            let _ = input;
        }

        let total_out = tx.total_spends();
        let fee = total_in
            .checked_sub(total_out)
            .ok_or(Error::InvalidTransaction("spend exceeds input value"))?;

        if self.params.minimum_output_satoshis > 0 && tx.is_dusty(self.params.minimum_output_satoshis) {
            return Err(Error::DustyTransaction);
        }

        // Minimum relay fee (spec.md §4.5: "size * byte_fee + sigops *
        // sigop_fee, floor of 1 satoshi if fee is configured").
        let required = tx.minimum_fee(self.params.byte_fee_satoshis, self.params.sigop_fee_satoshis, sigchecks as usize);
        if required > 0 && fee < required {
            return Err(Error::InsufficientFee);
        }

        Ok(TransactionConnection { fee, sigchecks })
    }
}

fn coinbase_immature(output_height: u32, spending_height: u32) -> bool {
    spending_height < output_height + COINBASE_MATURITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaon_chain::{OutPoint, TransactionInput, TransactionOutput};
    use kaon_primitives::bytes::Bytes;
    use kaon_script::NoopScriptVerifier;
    use kaon_storage::UtxoEntry;
    use std::sync::Mutex;

    struct FakeStore {
        utxos: Mutex<HashMap<OutPoint, UtxoEntry>>,
    }

    impl Store for FakeStore {
        fn get_last_height(&self) -> Option<u32> {
            None
        }
        fn get_header(&self, _h: u32) -> Option<kaon_chain::BlockHeader> {
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
        fn get_block_hash(&self, _h: u32) -> Option<kaon_chain::hash::H256> {
            None
        }
        fn get_height(&self, _hash: &kaon_chain::hash::H256) -> Option<u32> {
            None
        }
        fn get_output(&self, outpoint: &OutPoint, _branch_height: u32, _require_confirmed: bool) -> Option<UtxoEntry> {
            self.utxos.lock().unwrap().get(outpoint).cloned()
        }
        fn get_utxo(&self, outpoint: &OutPoint, _branch_height: u32) -> Option<UtxoEntry> {
            self.utxos.lock().unwrap().get(outpoint).cloned()
        }
        fn get_utxo_pool_from(&self, _first: u32, _top: u32) -> HashMap<OutPoint, UtxoEntry> {
            HashMap::new()
        }
        fn get_branch_work(
            &self,
            _ceiling: kaon_primitives::uint::U256,
            _from_height: u32,
        ) -> kaon_primitives::uint::U256 {
            kaon_primitives::uint::U256::zero()
        }
        fn get_block_exists(&self, _hash: &kaon_chain::hash::H256) -> bool {
            false
        }
        fn reorganize(
            &self,
            _fork_point: kaon_storage::ForkPoint,
            _incoming: &[std::sync::Arc<kaon_chain::IndexedBlock>],
            _outgoing: &mut Vec<std::sync::Arc<kaon_chain::IndexedBlock>>,
        ) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn push(&self, _tx: &kaon_chain::IndexedTransaction) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn prune_reorg_async(&self) {}
    }

    fn chain_state(height: u32) -> ChainState {
        ChainState {
            height,
            enabled_forks: crate::params::RuleFork::empty(),
            bits: kaon_primitives::compact::Compact::max_value(),
            median_time_past: 1_600_000_000,
            recent_bits: Vec::new(),
            recent_versions: Vec::new(),
            recent_timestamps: Vec::new(),
            self_version: 1,
            self_timestamp: 1_600_000_000,
            asert_anchor: None,
            allow_collisions_hash: None,
        }
    }

    #[test]
    fn check_rejects_null_prevout_on_non_coinbase() {
        let store = FakeStore { utxos: Mutex::new(HashMap::new()) };
        let params = ConsensusParams::default();
        let verifier = NoopScriptVerifier;
        let validator = TransactionValidator::new(&store, &verifier, &params);

        let tx = Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Bytes::new(),
                sequence: 0,
            }],
            outputs: vec![TransactionOutput { value: 1000, script_pubkey: Bytes::new() }],
            lock_time: 0,
        };
        assert!(matches!(validator.check(&tx), Err(Error::InvalidTransaction(_))));
    }

    #[test]
    fn accept_rejects_immature_coinbase_spend() {
        let outpoint = OutPoint { hash: Default::default(), index: 0 };
        let mut utxos = HashMap::new();
        utxos.insert(
            outpoint.clone(),
            UtxoEntry {
                output: TransactionOutput { value: 5_000_000_000, script_pubkey: Bytes::new() },
                height: 100,
                median_time_past: 1_600_000_000,
                coinbase: true,
            },
        );
        let store = FakeStore { utxos: Mutex::new(utxos) };
        let params = ConsensusParams::default();
        let verifier = NoopScriptVerifier;
        let validator = TransactionValidator::new(&store, &verifier, &params);

        let tx = Transaction {
            version: 1,
            inputs: vec![TransactionInput { previous_output: outpoint, script_sig: Bytes::new(), sequence: 0 }],
            outputs: vec![TransactionOutput { value: 4_000_000_000, script_pubkey: Bytes::new() }],
            lock_time: 0,
        };
        let state = chain_state(150);
        let branch = Branch::new(149);
        let result = validator.accept(&tx, &state, &branch, None, None);
        assert!(matches!(result, Err(Error::InvalidTransaction(_))));
    }

    #[test]
    fn connect_computes_fee_from_resolved_prevouts() {
        let store = FakeStore { utxos: Mutex::new(HashMap::new()) };
        let params = ConsensusParams::default();
        let verifier = NoopScriptVerifier;
        let validator = TransactionValidator::new(&store, &verifier, &params);

        let tx = Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                previous_output: OutPoint { hash: Default::default(), index: 0 },
                script_sig: Bytes::new(),
                sequence: 0,
            }],
            outputs: vec![TransactionOutput { value: 900, script_pubkey: Bytes::new() }],
            lock_time: 0,
        };
        let acceptance = TransactionAcceptance {
            prevouts: vec![PrevoutValidation {
                output: Some(TransactionOutput { value: 1_000, script_pubkey: Bytes::new() }),
                height: Some(10),
                median_time_past: 0,
                coinbase: false,
                spent: false,
                confirmed: true,
                from_mempool: false,
            }],
        };
        let connection = validator.connect(&tx, &acceptance, ScriptFlags::empty()).unwrap();
        assert_eq!(connection.fee, 100);
    }
}
