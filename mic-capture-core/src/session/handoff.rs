//! Timed hand-back of resources owned by a worker thread.
//!
//! `JoinHandle::join` cannot time out, so a worker deposits what it owns
//! here on exit and the waiting side gives up after a deadline. Once the
//! waiter has given up the slot is marked abandoned and the worker keeps
//! its resources and must release them itself.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

enum Slot<T> {
    Pending,
    Done(T),
    Abandoned,
}

pub struct Handoff<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        }
    }

    /// Deposit the worker's resources.
    ///
    /// Returns them back as `Some` if the waiter already gave up.
    pub fn complete(&self, value: T) -> Option<T> {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Abandoned) {
            return Some(value);
        }
        *slot = Slot::Done(value);
        self.ready.notify_all();
        None
    }

    /// Wait up to `timeout` for the worker to deposit its resources.
    ///
    /// Returns `None` on timeout, after which the slot is abandoned.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Pending) {
                Slot::Done(value) => return Some(value),
                Slot::Abandoned => {
                    *slot = Slot::Abandoned;
                    return None;
                }
                Slot::Pending => {}
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return match std::mem::replace(&mut *slot, Slot::Abandoned) {
                    Slot::Done(value) => Some(value),
                    _ => None,
                };
            }
        }
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}
