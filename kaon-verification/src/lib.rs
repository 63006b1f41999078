//! Chain-state population and validation (spec.md §4.1-§4.5): the
//! chain-state populator (C1), branch model (C2), whole-block validator
//! (C4) and single-transaction validator (C5) that the organizers in
//! `kaon-blockchain` drive.

pub mod branch;
pub mod block_validator;
pub mod chain_state;
pub mod error;
pub mod params;
pub mod transaction_validator;

pub use crate::block_validator::{BlockAcceptance, BlockConnection, BlockValidator};
pub use crate::branch::{proof_of_work, Branch};
pub use crate::chain_state::{ChainState, ChainStatePopulator};
pub use crate::error::{Error, ErrorKind};
pub use crate::params::{
    AblaConfig, AblaState, AsertAnchor, Checkpoint, ConsensusParams, ForkActivation, Network, RuleFork,
};
pub use crate::transaction_validator::{TransactionAcceptance, TransactionConnection, TransactionValidator};

/// Wall-clock seconds since the Unix epoch, the one place this crate
/// touches real time (the virtual mempool tip's "self timestamp", spec.md
/// §4.1). Kept as a single indirection so callers that need determinism
/// in tests can avoid it entirely by always validating against a
/// non-empty branch.
pub fn now() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
