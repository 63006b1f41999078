//! The block pool (C3), block/transaction organizers (C7/C8) and chain
//! facade (C9) — spec.md §4.3, §4.7-§4.9. This crate is the one place the
//! whole consensus core is wired together: it owns the thread pools, the
//! priority mutex guarding the mempool, and the block pool forest, and
//! drives `kaon-verification`'s validators and `kaon-mempool`'s admission
//! logic from the two organizer workflows.

pub mod block_organizer;
pub mod block_pool;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod oneshot;
pub mod priority_mutex;
pub mod seqlock;
pub mod transaction_organizer;

pub use crate::block_organizer::{BlockOrganizeOutcome, BlockOrganizer};
pub use crate::block_pool::{BlockPool, PathOutcome};
pub use crate::dispatcher::{Dispatcher, StopFlag};
pub use crate::error::{Error, ErrorKind};
pub use crate::facade::{ChainFacade, NotifyCode};
pub use crate::priority_mutex::{PriorityMutex, PriorityMutexGuard};
pub use crate::seqlock::Seqlock;
pub use crate::transaction_organizer::TransactionOrganizer;

use kaon_script::ScriptFlags;
use kaon_verification::RuleFork;

/// Maps the active rule-fork bitmask onto the script verifier's own
/// fork-flag bitmask (spec.md §4.4 Connect: "invoke the external script
/// verifier with ... fork_flags"). The two crates keep independent
/// bitmasks by design (`kaon-script`'s is the external verifier's
/// contract; `kaon-verification`'s is this consensus core's own
/// activation bookkeeping), so this is the single translation point
/// between them.
pub fn fork_flags(forks: RuleFork) -> ScriptFlags {
    let mut flags = ScriptFlags::empty();
    if forks.contains(RuleFork::BIP16) {
        flags |= ScriptFlags::VERIFY_P2SH;
    }
    if forks.contains(RuleFork::BIP66) {
        flags |= ScriptFlags::VERIFY_DERSIG;
    }
    if forks.contains(RuleFork::BIP65) {
        flags |= ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY;
    }
    if forks.contains(RuleFork::BIP112) {
        flags |= ScriptFlags::VERIFY_CHECKSEQUENCEVERIFY;
    }
    if forks.contains(RuleFork::BIP141) {
        flags |= ScriptFlags::VERIFY_WITNESS;
    }
    if forks.contains(RuleFork::BIP147) {
        flags |= ScriptFlags::VERIFY_NULLDUMMY;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_flags_translates_known_bits() {
        let forks = RuleFork::BIP16 | RuleFork::BIP65;
        let flags = fork_flags(forks);
        assert!(flags.contains(ScriptFlags::VERIFY_P2SH));
        assert!(flags.contains(ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY));
        assert!(!flags.contains(ScriptFlags::VERIFY_WITNESS));
    }
}
