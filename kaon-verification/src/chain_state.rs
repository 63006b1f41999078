//! Chain-state populator (spec.md §4.1, C1), grounded on
//! `original_source/src/populate/populate_chain_state.cpp`.

use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_primitives::compact::Compact;
use kaon_storage::Store;

use crate::branch::Branch;
use crate::error::Error;
use crate::params::{AsertAnchor, ConsensusParams, RuleFork};

/// The immutable per-height record validators consult (spec.md §3
/// "ChainState."). Once built it is never mutated; building the record
/// for the next height constructs a new one rather than editing this one.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub height: u32,
    pub enabled_forks: RuleFork,
    /// Retarget `nBits` applicable at this height.
    pub bits: Compact,
    pub median_time_past: u32,
    /// Small ordered window of the most recent `nBits` values, most
    /// distant first, used by retarget algorithms that look back further
    /// than one header.
    pub recent_bits: Vec<Compact>,
    /// Small ordered window of the most recent signaled versions, used
    /// for version-bit (BIP9-style) tally.
    pub recent_versions: Vec<u32>,
    /// Small ordered window of the most recent timestamps (MTP input).
    pub recent_timestamps: Vec<u32>,
    /// The version/timestamp "this block would signal/stamp right now"
    /// — `now()`/signal-version for the mempool's virtual tip, or the
    /// branch top's actual values otherwise (spec.md §4.1 tie-break).
    pub self_version: u32,
    pub self_timestamp: u32,
    pub asert_anchor: Option<AsertAnchor>,
    pub allow_collisions_hash: Option<H256>,
}

impl ChainState {
    pub fn is_enabled(&self, fork: RuleFork) -> bool {
        self.enabled_forks.contains(fork)
    }

    pub fn is_under_checkpoint(&self, params: &ConsensusParams) -> bool {
        params
            .checkpoints
            .iter()
            .any(|c| c.height >= self.height)
    }

    /// Bitcoin's classic median-of-eleven; callers that want MTP for a
    /// different window size pass a shorter/longer `recent_timestamps`.
    pub fn compute_median_time_past(timestamps: &[u32]) -> u32 {
        if timestamps.is_empty() {
            return 0;
        }
        let mut sorted = timestamps.to_vec();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }
}

/// Builds `ChainState` for a requested height, optionally on a branch
/// (spec.md §4.1). Database access is limited to what `Store` exposes;
/// entries at or below the branch's fork point come from the store,
/// entries above it come from the branch overlay.
pub struct ChainStatePopulator<'a> {
    store: &'a dyn Store,
    params: &'a ConsensusParams,
}

impl<'a> ChainStatePopulator<'a> {
    pub fn new(store: &'a dyn Store, params: &'a ConsensusParams) -> Self {
        ChainStatePopulator { store, params }
    }

    fn get_bits(&self, height: u32, branch: &Branch) -> Option<Compact> {
        branch.get_bits(height).or_else(|| self.store.get_bits(height))
    }

    fn get_version(&self, height: u32, branch: &Branch) -> Option<u32> {
        branch
            .get_version(height)
            .or_else(|| self.store.get_version(height))
    }

    fn get_timestamp(&self, height: u32, branch: &Branch) -> Option<u32> {
        branch
            .get_timestamp(height)
            .or_else(|| self.store.get_timestamp(height))
    }

    fn get_block_hash(&self, height: u32, branch: &Branch) -> Option<H256> {
        branch
            .get_block_hash(height)
            .or_else(|| self.store.get_block_hash(height))
    }

    /// Populate a window of `count` values ending (inclusive) at `high`,
    /// trying the branch overlay before falling back to the store for
    /// each entry (spec.md §4.1's "population map" algorithm).
    fn populate_window<T>(
        &self,
        count: usize,
        high: u32,
        branch: &Branch,
        get: impl Fn(&Self, u32, &Branch) -> Option<T>,
    ) -> Result<Vec<T>, Error> {
        if count == 0 || high < count as u32 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(count);
        let mut height = high - count as u32;
        for _ in 0..count {
            height += 1;
            out.push(get(self, height, branch).ok_or(Error::HeaderUnavailable)?);
        }
        Ok(out)
    }

    /// Signal version used for the mempool's virtual tip: every enabled
    /// fork's highest version bit, OR'd together (a stand-in for a real
    /// BIP9 bit-assignment table, which `kth::domain` does not expose to
    /// this pack).
    fn signal_version(&self) -> u32 {
        0x2000_0000 | self.params.enabled_forks.bits()
    }

    /// Resolve which forks are active as of `height`/`median_time_past`,
    /// per spec.md §4.1's activation-ordering paragraph: height-gated
    /// forks are preferred once their activation height is known,
    /// timestamp-gated (historical) forks fall back to MTP.
    fn enabled_forks(&self, height: u32, median_time_past: u32) -> RuleFork {
        let mut forks = RuleFork::empty();
        for activation in &self.params.fork_activations {
            if activation.is_active(height, median_time_past) {
                forks |= activation.fork;
            }
        }
        forks & self.params.enabled_forks
    }

    /// Build the immutable `ChainState` for `height` on `branch` (an
    /// empty branch means the mempool's virtual tip).
    pub fn populate(&self, height: u32, branch: &Branch) -> Result<Arc<ChainState>, Error> {
        let is_virtual_tip = branch.empty();

        let mtp_window = self.params.mtp_window;
        let recent_timestamps =
            self.populate_window(mtp_window, height.saturating_sub(1), branch, Self::get_timestamp)?;
        let median_time_past = ChainState::compute_median_time_past(&recent_timestamps);

        let version_window = self.params.version_tally_window;
        let recent_versions = self.populate_window(
            version_window.min(height as usize),
            height.saturating_sub(1),
            branch,
            Self::get_version,
        )?;

        let retarget_window = self.params.retarget_span.min(height as usize);
        let recent_bits =
            self.populate_window(retarget_window, height.saturating_sub(1), branch, Self::get_bits)?;

        let bits = if is_virtual_tip {
            recent_bits.last().copied().unwrap_or(Compact::max_value())
        } else {
            self.get_bits(height, branch).ok_or(Error::HeaderUnavailable)?
        };

        let self_version = if is_virtual_tip {
            self.signal_version()
        } else {
            self.get_version(height, branch).ok_or(Error::HeaderUnavailable)?
        };

        let self_timestamp = if is_virtual_tip {
            crate::now()
        } else {
            self.get_timestamp(height, branch).ok_or(Error::HeaderUnavailable)?
        };

        let allow_collisions_hash = if is_virtual_tip {
            None
        } else {
            self.params
                .fork_activations
                .iter()
                .find(|a| a.fork.contains(RuleFork::ALLOW_COLLISIONS))
                .and_then(|a| a.height)
                .and_then(|h| self.get_block_hash(h, branch))
        };

        let enabled_forks = self.enabled_forks(height, median_time_past);

        let asert_anchor = if enabled_forks.contains(RuleFork::BCH_DAA) {
            self.params.asert_anchor
        } else {
            None
        };

        Ok(Arc::new(ChainState {
            height,
            enabled_forks,
            bits,
            median_time_past,
            recent_bits,
            recent_versions,
            recent_timestamps,
            self_version,
            self_timestamp,
            asert_anchor,
            allow_collisions_hash,
        }))
    }

    /// Build the state for the height immediately above the store's
    /// current top (i.e. "the next block to be mined/validated"), used
    /// when there is no candidate branch yet (e.g. the mempool's virtual
    /// tip).
    pub fn populate_top(&self) -> Result<Arc<ChainState>, Error> {
        let top = self.store.get_last_height().ok_or(Error::LastHeightUnavailable)?;
        self.populate(top + 1, &Branch::new(top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::Branch;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        bits: Mutex<HashMap<u32, Compact>>,
        timestamps: Mutex<HashMap<u32, u32>>,
        versions: Mutex<HashMap<u32, u32>>,
        last_height: Option<u32>,
    }

    impl kaon_storage::Store for FakeStore {
        fn get_last_height(&self) -> Option<u32> {
            self.last_height
        }
        fn get_header(&self, _h: u32) -> Option<kaon_chain::BlockHeader> {
            None
        }
        fn get_bits(&self, h: u32) -> Option<Compact> {
            self.bits.lock().unwrap().get(&h).copied()
        }
        fn get_version(&self, h: u32) -> Option<u32> {
            self.versions.lock().unwrap().get(&h).copied()
        }
        fn get_timestamp(&self, h: u32) -> Option<u32> {
            self.timestamps.lock().unwrap().get(&h).copied()
        }
        fn get_block_hash(&self, _h: u32) -> Option<H256> {
            None
        }
        fn get_height(&self, _hash: &H256) -> Option<u32> {
            None
        }
        fn get_output(
            &self,
            _o: &kaon_chain::OutPoint,
            _branch_height: u32,
            _require_confirmed: bool,
        ) -> Option<kaon_storage::UtxoEntry> {
            None
        }
        fn get_utxo(&self, _o: &kaon_chain::OutPoint, _branch_height: u32) -> Option<kaon_storage::UtxoEntry> {
            None
        }
        fn get_utxo_pool_from(
            &self,
            _first: u32,
            _top: u32,
        ) -> HashMap<kaon_chain::OutPoint, kaon_storage::UtxoEntry> {
            HashMap::new()
        }
        fn get_branch_work(&self, _ceiling: kaon_primitives::uint::U256, _from_height: u32) -> kaon_primitives::uint::U256 {
            kaon_primitives::uint::U256::zero()
        }
        fn get_block_exists(&self, _hash: &H256) -> bool {
            false
        }
        fn reorganize(
            &self,
            _fork_point: kaon_storage::ForkPoint,
            _incoming: &[Arc<kaon_chain::IndexedBlock>],
            _outgoing: &mut Vec<Arc<kaon_chain::IndexedBlock>>,
        ) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn push(&self, _tx: &kaon_chain::IndexedTransaction) -> Result<(), kaon_storage::Error> {
            Ok(())
        }
        fn prune_reorg_async(&self) {}
    }

    #[test]
    fn populate_falls_back_to_store_below_fork_point() {
        let mut bits = HashMap::new();
        let mut timestamps = HashMap::new();
        let mut versions = HashMap::new();
        for h in 1..=20u32 {
            bits.insert(h, Compact::max_value());
            timestamps.insert(h, 1_600_000_000 + h);
            versions.insert(h, 0x2000_0000);
        }
        let store = FakeStore {
            bits: Mutex::new(bits),
            timestamps: Mutex::new(timestamps),
            versions: Mutex::new(versions),
            last_height: Some(20),
        };
        let params = ConsensusParams {
            mtp_window: 5,
            version_tally_window: 5,
            retarget_span: 5,
            ..ConsensusParams::default()
        };
        let populator = ChainStatePopulator::new(&store, &params);
        let branch = Branch::new(20);
        let state = populator.populate(21, &branch).unwrap();
        assert_eq!(state.height, 21);
        assert_eq!(state.recent_timestamps.len(), 5);
    }

    #[test]
    fn virtual_tip_uses_now_and_signal_version() {
        let store = FakeStore {
            bits: Mutex::new(HashMap::new()),
            timestamps: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
            last_height: Some(0),
        };
        let params = ConsensusParams {
            mtp_window: 0,
            version_tally_window: 0,
            retarget_span: 0,
            ..ConsensusParams::default()
        };
        let populator = ChainStatePopulator::new(&store, &params);
        let branch = Branch::new(0);
        let state = populator.populate(1, &branch).unwrap();
        assert_eq!(state.self_version & 0x2000_0000, 0x2000_0000);
    }
}
