//! Sequential-lock store reads (spec.md §5 "Shared resource policy": "the
//! persistent store is accessed without an internal mutex; its reads use a
//! sequential-lock pattern"). The store implementation itself is outside
//! this crate's scope (spec.md §1), but the chain facade (C9) is the one
//! place this crate *reads through* the store repeatedly under
//! concurrent mutation from the organizers, so the retry wrapper lives
//! here rather than being assumed of every `Store` implementor.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// Wraps a value that is cheap to clone and updated infrequently relative
/// to how often it is read (the last-block snapshot, the current
/// `ChainState`). Readers take a version snapshot, clone the payload, and
/// retry if a writer raced them — never blocking a writer behind a slow
/// reader.
pub struct Seqlock<T> {
    version: AtomicUsize,
    payload: RwLock<T>,
}

impl<T: Clone> Seqlock<T> {
    pub fn new(value: T) -> Self {
        Seqlock {
            version: AtomicUsize::new(0),
            payload: RwLock::new(value),
        }
    }

    /// Read the current value, retrying if a concurrent `store` changed
    /// it mid-read. `T: Clone` is cheap here by design (spec.md §9: "model
    /// as a value type behind a shared, read-only reference").
    pub fn load(&self) -> T {
        loop {
            let before = self.version.load(Ordering::Acquire);
            let value = self.payload.read().clone();
            let after = self.version.load(Ordering::Acquire);
            if before == after && before % 2 == 0 {
                return value;
            }
        }
    }

    /// Replace the value, bumping the version so in-flight readers notice
    /// and retry.
    pub fn store(&self, value: T) {
        self.version.fetch_add(1, Ordering::AcqRel);
        *self.payload.write() = value;
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reflects_latest_store() {
        let seq = Seqlock::new(1u32);
        assert_eq!(seq.load(), 1);
        seq.store(2);
        assert_eq!(seq.load(), 2);
    }
}
