//! Script evaluation contract (spec.md §6): "an external library returning
//! a verdict + sigcheck count given a transaction, input index, prevout,
//! and fork bitmask." Deliberately interface-only — script interpretation
//! itself is out of scope (spec.md §1); `zebra-script`/`script` in this
//! pack are themselves stubs with no interpreter wired up, so there is
//! nothing to port. `kaon-verification`'s connect phase (C4/C5) is the
//! sole consumer of `ScriptVerifier`.

mod error;
mod flags;

use std::sync::Arc;

use kaon_chain::Transaction;

pub use crate::error::ScriptError;
pub use crate::flags::ScriptFlags;

/// A thread-safe handle to the script verifier, shared across validation
/// buckets (spec.md §4.4 Connect: one call per non-coinbase input).
pub type SharedScriptVerifier = Arc<dyn ScriptVerifier>;

/// Everything `ScriptVerifier::verify` needs to evaluate a single input,
/// grounded on `validate_input.cpp`'s `verify_script` call signature.
pub struct VerifyContext<'a> {
    pub transaction: &'a Transaction,
    pub input_index: usize,
    pub prevout_script: &'a [u8],
    pub prevout_value: u64,
    pub flags: ScriptFlags,
}

/// The external script evaluator. Implementations are expected to be
/// pure functions of their inputs (no access to chain state beyond what
/// `VerifyContext` carries) so that buckets can call them concurrently
/// without synchronization.
pub trait ScriptVerifier: Send + Sync {
    /// Evaluate the script pair for one input. On success, returns the
    /// sigcheck count attributable to this input (spec.md §4.4: "Accumulate
    /// sigchecks across the entire block").
    fn verify(&self, ctx: &VerifyContext) -> Result<u32, ScriptError>;
}

/// A verifier that accepts every input unconditionally, crediting zero
/// sigchecks. Useful for wiring up the organizer/mempool in tests that
/// are not exercising script semantics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScriptVerifier;

impl ScriptVerifier for NoopScriptVerifier {
    fn verify(&self, _ctx: &VerifyContext) -> Result<u32, ScriptError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaon_chain::Transaction;

    #[test]
    fn noop_verifier_always_succeeds() {
        let tx = Transaction::default();
        let ctx = VerifyContext {
            transaction: &tx,
            input_index: 0,
            prevout_script: &[],
            prevout_value: 0,
            flags: ScriptFlags::empty(),
        };
        assert_eq!(NoopScriptVerifier.verify(&ctx).unwrap(), 0);
    }
}
