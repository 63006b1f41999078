#[macro_use]
extern crate log;
extern crate env_logger;

extern crate kaon_blockchain;
extern crate kaon_verification;

use std::sync::Arc;

use kaon_blockchain::ChainFacade;
use kaon_verification::ConsensusParams;

/// Thread-pool sizing (spec.md §5 "a general pool and a priority pool").
/// Picking twice the CPU count for the general pool and half for the
/// priority pool mirrors the ratio `original_source/src/init.cpp` uses for
/// script-check vs. validation worker counts.
fn thread_counts() -> (usize, usize) {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    (cpus * 2, (cpus / 2).max(1))
}

/// Wires a [`ChainFacade`] over a caller-supplied `Store`/`ScriptVerifier`
/// pair. This crate does not ship a persistence backend or a script
/// interpreter (both are pluggable per spec.md §6); a concrete embedder
/// constructs those and passes them here, then drives `organize_block`/
/// `organize_transaction` from its own network or RPC front end. CLI and
/// config-file parsing are out of scope, so this entry point only
/// demonstrates the wiring.
fn bootstrap(
    store: kaon_storage::SharedStore,
    script_verifier: kaon_script::SharedScriptVerifier,
    params: ConsensusParams,
) -> Result<Arc<ChainFacade>, kaon_blockchain::Error> {
    let (general_threads, priority_threads) = thread_counts();
    let facade = ChainFacade::new(store, script_verifier, params, general_threads, priority_threads)?;
    facade.start();
    Ok(facade)
}

fn main() {
    env_logger::init();
    info!("kaon consensus core built; awaiting a Store and ScriptVerifier from an embedder");
    let _ = bootstrap;
}
