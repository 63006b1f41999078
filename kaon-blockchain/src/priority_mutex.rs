//! The priority mutex (spec.md §5 "Priority mutex", §9: "implement as two
//! condition variables plus a high-priority waiter count; exclusive
//! acquirers enter only when the high-priority count is zero (for
//! low-priority) or unconditionally (for high-priority)"). Guards the
//! mempool (spec.md §5: "the mempool is entirely serialized by the
//! priority mutex") so that block organization (§4.7) and template export
//! (§4.6) are never starved by a flood of low-priority transaction
//! admissions.

use parking_lot::{Condvar, Mutex, MutexGuard};

struct State {
    locked: bool,
    high_priority_waiters: usize,
}

pub struct PriorityMutex<T> {
    state: Mutex<State>,
    low_priority_released: Condvar,
    high_priority_released: Condvar,
    data: Mutex<T>,
}

/// Held while the lock is acquired; releases on drop regardless of which
/// acquisition mode was used. Derefs straight through to `T`: the
/// scheduling state and the payload are separate locks internally, but a
/// holder of this guard already has exclusive access to the payload, so
/// taking the inner `Mutex` here never contends.
pub struct PriorityMutexGuard<'a, T> {
    mutex: &'a PriorityMutex<T>,
    data: Option<MutexGuard<'a, T>>,
}

impl<T> PriorityMutex<T> {
    pub fn new(value: T) -> Self {
        PriorityMutex {
            state: Mutex::new(State {
                locked: false,
                high_priority_waiters: 0,
            }),
            low_priority_released: Condvar::new(),
            high_priority_released: Condvar::new(),
            data: Mutex::new(value),
        }
    }

    /// High-priority acquisition (block organization, template export):
    /// overtakes any queued low-priority waiters, blocking only on
    /// another high-priority holder.
    pub fn lock_high_priority(&self) -> PriorityMutexGuard<'_, T> {
        let mut state = self.state.lock();
        state.high_priority_waiters += 1;
        while state.locked {
            self.high_priority_released.wait(&mut state);
        }
        state.locked = true;
        state.high_priority_waiters -= 1;
        drop(state);
        PriorityMutexGuard {
            mutex: self,
            data: Some(self.data.lock()),
        }
    }

    /// Low-priority acquisition (transaction admission): waits for both
    /// the lock itself and for every currently-queued high-priority
    /// acquirer to have gone first.
    pub fn lock_low_priority(&self) -> PriorityMutexGuard<'_, T> {
        let mut state = self.state.lock();
        while state.locked || state.high_priority_waiters > 0 {
            self.low_priority_released.wait(&mut state);
        }
        state.locked = true;
        drop(state);
        PriorityMutexGuard {
            mutex: self,
            data: Some(self.data.lock()),
        }
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        state.locked = false;
        if state.high_priority_waiters > 0 {
            self.high_priority_released.notify_one();
        } else {
            self.low_priority_released.notify_all();
        }
    }
}

impl<'a, T> std::ops::Deref for PriorityMutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data.as_ref().expect("data guard held until drop")
    }
}

impl<'a, T> std::ops::DerefMut for PriorityMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data.as_mut().expect("data guard held until drop")
    }
}

impl<'a, T> Drop for PriorityMutexGuard<'a, T> {
    fn drop(&mut self) {
        self.data.take();
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_priority_acquirer_sees_mutations_from_high_priority() {
        let mutex = PriorityMutex::new(0u32);
        {
            let mut guard = mutex.lock_high_priority();
            *guard += 1;
        }
        {
            let guard = mutex.lock_low_priority();
            assert_eq!(*guard, 1);
        }
    }
}
