//! A single-cell, exactly-one-send/one-receive channel (spec.md §5
//! "Coroutine-style suspension", §9 "do not conflate with multi-producer
//! channels"). Grounded on `sync/src/local_node.rs`'s
//! `TransactionAcceptSinkData`, which implements the same
//! `Mutex<Option<T>> + Condvar` pair the teacher workspace already uses to
//! make an asynchronous accept path present as a blocking call.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct Inner<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

/// The receiving half. Dropping it without a matching `send` is only
/// reachable if the sender panics first; `recv` would then block forever,
/// which is why organizer call sites always pair a `send` with the worker
/// closure's return path, success or failure.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

/// The sending half, clonable only in the sense that it shares the same
/// cell; calling `send` a second time silently overwrites the first value
/// rather than panicking, since the one-shot discipline here is enforced
/// by construction (one sender, created alongside one receiver) rather
/// than by a type-level "already consumed" guard.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
}

/// Build a fresh one-shot pair.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Inner {
        slot: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        Sender {
            inner: inner.clone(),
        },
        Receiver { inner },
    )
}

impl<T> Sender<T> {
    /// Deposit the result and wake the waiting receiver.
    pub fn send(self, value: T) {
        let mut slot = self.inner.slot.lock();
        *slot = Some(value);
        self.inner.ready.notify_one();
    }
}

impl<T> Receiver<T> {
    /// Block until `send` has been called, then take the value.
    pub fn recv(self) -> T {
        let mut slot = self.inner.slot.lock();
        while slot.is_none() {
            self.inner.ready.wait(&mut slot);
        }
        slot.take().expect("wait returns only after send sets the slot")
    }
}
