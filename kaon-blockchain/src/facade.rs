//! The chain facade (spec.md §4.9, C9): the single typed entry point for
//! the outside world. Owns the thread pools, the priority mutex, the
//! block pool, a shared chain-state snapshot, and the two organizers;
//! mediates subscriptions; `start/stop/close` cascade per spec.md §5.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kaon_chain::hash::H256;
use kaon_chain::{BlockHeader, IndexedBlock, IndexedTransaction};
use kaon_mempool::{BlockTemplate, DoubleSpendProof, Mempool, TemplateOrder};
use kaon_script::SharedScriptVerifier;
use kaon_storage::SharedStore;
use kaon_verification::{ChainState, ChainStatePopulator, ConsensusParams};
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::block_organizer::BlockOrganizer;
use crate::block_pool::BlockPool;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::priority_mutex::PriorityMutex;
use crate::seqlock::Seqlock;
use crate::transaction_organizer::TransactionOrganizer;

/// The outcome code a subscriber is notified with (spec.md §6 "Subscriber
/// surface": "handler invoked with `(code, ...)`"). Subscribers observe
/// only successful commits in steady state (spec.md §7); `ServiceStopped`
/// is the one failure code ever delivered, released en masse by `stop()`.
#[derive(Debug, Clone)]
pub enum NotifyCode {
    Ok,
    ServiceStopped,
}

type BlockchainHandler = Box<dyn Fn(NotifyCode, u32, &[Arc<IndexedBlock>], &[Arc<IndexedBlock>]) + Send + Sync>;
type TransactionHandler = Box<dyn Fn(NotifyCode, &Arc<IndexedTransaction>) + Send + Sync>;
type DsProofHandler = Box<dyn Fn(NotifyCode, &DoubleSpendProof) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    blockchain: Vec<BlockchainHandler>,
    transaction: Vec<TransactionHandler>,
    ds_proof: Vec<DsProofHandler>,
}

pub struct ChainFacade {
    store: SharedStore,
    params: ConsensusParams,
    dispatcher: Arc<Dispatcher>,
    pool: Arc<BlockPool>,
    mempool: Arc<PriorityMutex<Mempool>>,
    block_organizer: BlockOrganizer,
    transaction_organizer: TransactionOrganizer,
    /// Cached current `ChainState`, refreshed after every commit (spec.md
    /// §4.9: "a snapshot of current chain state (under a separate shared
    /// lock)").
    chain_state: Seqlock<Arc<ChainState>>,
    /// Fast-path "is this hash already our tip" check (spec.md §4.9
    /// "the last-block atomic pointer"), read far more often than it
    /// changes.
    last_block_hash: Seqlock<Option<H256>>,
    subscribers: Mutex<Subscribers>,
    stopped: AtomicBool,
}

impl ChainFacade {
    pub fn new(
        store: SharedStore,
        script_verifier: SharedScriptVerifier,
        params: ConsensusParams,
        general_threads: usize,
        priority_threads: usize,
    ) -> Result<Arc<Self>, Error> {
        let dispatcher = Arc::new(Dispatcher::new(general_threads, priority_threads));
        let pool = Arc::new(BlockPool::new());
        let mempool = Arc::new(PriorityMutex::new(Mempool::new(&params)));

        let block_organizer = BlockOrganizer::new(
            store.clone(),
            script_verifier.clone(),
            params.clone(),
            pool.clone(),
            dispatcher.clone(),
        );
        let transaction_organizer =
            TransactionOrganizer::new(store.clone(), script_verifier.clone(), params.clone());

        let chain_state = ChainStatePopulator::new(store.as_ref(), &params).populate_top()?;
        let last_block_hash = store.get_last_height().and_then(|h| store.get_block_hash(h));

        Ok(Arc::new(ChainFacade {
            store,
            params,
            dispatcher,
            pool,
            mempool,
            block_organizer,
            transaction_organizer,
            chain_state: Seqlock::new(chain_state),
            last_block_hash: Seqlock::new(last_block_hash),
            subscribers: Mutex::new(Subscribers::default()),
            stopped: AtomicBool::new(false),
        }))
    }

    pub fn start(&self) {
        info!("chain facade starting");
    }

    /// Sets the cooperative stop flag and releases every subscriber with
    /// `ServiceStopped` (spec.md §5 "Cancellation").
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.dispatcher.stop_flag().stop();
        let subscribers = self.subscribers.lock();
        for handler in &subscribers.blockchain {
            handler(NotifyCode::ServiceStopped, 0, &[], &[]);
        }
        info!("chain facade stopped");
    }

    /// `stop()` plus joining every pool thread and releasing the store
    /// (spec.md §5). The thread pools here are dropped with the facade
    /// itself (`rayon::ThreadPool::drop` already blocks until idle), so
    /// the only additional work is the stop cascade.
    pub fn close(&self) {
        self.stop();
        info!("chain facade closed");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // --- writes (delegate to an organizer) -------------------------------

    pub fn organize_block(&self, block: Arc<IndexedBlock>) -> Result<(), Error> {
        self.dispatcher.stop_flag().check()?;

        match self.block_organizer.organize(block, &self.mempool) {
            Ok(outcome) => {
                if let Ok(state) = ChainStatePopulator::new(self.store.as_ref(), &self.params).populate_top() {
                    self.chain_state.store(state);
                }
                self.last_block_hash.store(outcome.incoming.last().map(|b| *b.hash()));
                self.notify_blockchain(NotifyCode::Ok, outcome.fork_height, &outcome.incoming, &outcome.outgoing);
                Ok(())
            }
            Err(err) => {
                if err.is_store_corruption() {
                    error!("store reorganize failed, treating as fatal corruption: {}", err);
                } else {
                    warn!("organize(block) rejected: {}", err);
                }
                Err(err)
            }
        }
    }

    pub fn organize_transaction(&self, tx: Arc<IndexedTransaction>) -> Result<(), Error> {
        self.dispatcher.stop_flag().check()?;

        match self.transaction_organizer.organize(tx.clone(), &self.mempool) {
            Ok(()) => {
                self.notify_transaction(NotifyCode::Ok, &tx);
                Ok(())
            }
            Err(err) => {
                warn!("organize(tx) rejected: {}", err);
                Err(err)
            }
        }
    }

    pub fn organize_ds_proof(&self, proof: DoubleSpendProof) -> H256 {
        let hash = self.transaction_organizer.organize_ds_proof(proof.clone(), &self.mempool);
        self.notify_ds_proof(NotifyCode::Ok, &proof);
        hash
    }

    // --- subscriptions ----------------------------------------------------

    pub fn subscribe_blockchain(&self, handler: BlockchainHandler) {
        self.subscribers.lock().blockchain.push(handler);
    }

    pub fn subscribe_transaction(&self, handler: TransactionHandler) {
        self.subscribers.lock().transaction.push(handler);
    }

    pub fn subscribe_ds_proof(&self, handler: DsProofHandler) {
        self.subscribers.lock().ds_proof.push(handler);
    }

    fn notify_blockchain(&self, code: NotifyCode, fork_height: u32, incoming: &[Arc<IndexedBlock>], outgoing: &[Arc<IndexedBlock>]) {
        let subscribers = self.subscribers.lock();
        for handler in &subscribers.blockchain {
            handler(code.clone(), fork_height, incoming, outgoing);
        }
    }

    fn notify_transaction(&self, code: NotifyCode, tx: &Arc<IndexedTransaction>) {
        let subscribers = self.subscribers.lock();
        for handler in &subscribers.transaction {
            handler(code.clone(), tx);
        }
    }

    fn notify_ds_proof(&self, code: NotifyCode, proof: &DoubleSpendProof) {
        let subscribers = self.subscribers.lock();
        for handler in &subscribers.ds_proof {
            handler(code.clone(), proof);
        }
    }

    // --- fetch surface: thin dispatch onto the store, seqlock-retried for
    // the facade's own cached snapshots (spec.md §4.9, §6) --------------

    pub fn fetch_last_height(&self) -> Option<u32> {
        self.store.get_last_height()
    }

    pub fn fetch_block_header(&self, height: u32) -> Option<BlockHeader> {
        self.store.get_header(height)
    }

    pub fn fetch_block_hash(&self, height: u32) -> Option<H256> {
        self.store.get_block_hash(height)
    }

    pub fn fetch_height(&self, hash: &H256) -> Option<u32> {
        self.store.get_height(hash)
    }

    /// Fast-path "is this the current tip" check without touching the
    /// store at all.
    pub fn is_current_tip(&self, hash: &H256) -> bool {
        self.last_block_hash.load().as_ref() == Some(hash)
    }

    pub fn fetch_chain_state(&self) -> Arc<ChainState> {
        self.chain_state.load()
    }

    pub fn fetch_template(&self, order: TemplateOrder) -> BlockTemplate {
        self.mempool.lock_high_priority().get_block_template(order)
    }

    pub fn fetch_mempool_contains(&self, txid: &H256) -> bool {
        self.mempool.lock_low_priority().contains(txid)
    }

    pub fn fetch_ds_proof(&self, hash: &H256) -> Option<DoubleSpendProof> {
        self.mempool.lock_low_priority().get_ds_proof(hash).cloned()
    }

    /// Removes inventory hashes already known to the block pool (spec.md
    /// §4.3 `filter`), used by peers deciding what to still request —
    /// P2P transport itself is out of scope, but the pool-side primitive
    /// the facade exposes to it is not.
    pub fn filter_known_blocks(&self, hashes: &mut Vec<H256>) {
        self.pool.filter(hashes);
    }
}
