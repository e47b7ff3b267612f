//! One-shot wake signal.

use std::sync::{Condvar, Mutex};

/// A binary wake flag with condvar parking.
///
/// `raise` while the waiter is busy coalesces into a single pending wake —
/// wakes are never queued. This mirrors the hardware-timer notification the
/// poll loop runs on: a tick that fires while the previous one is still being
/// serviced is absorbed, not deferred.
pub struct Signal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Set the pending wake and notify the waiter.
    pub fn raise(&self) {
        let mut raised = self.raised.lock().unwrap();
        *raised = true;
        self.condvar.notify_one();
    }

    /// Block until a wake is pending, then consume it.
    pub fn wait(&self) {
        let mut raised = self.raised.lock().unwrap();
        while !*raised {
            raised = self.condvar.wait(raised).unwrap();
        }
        *raised = false;
    }

    /// Consume a pending wake without blocking. Returns whether one was set.
    pub fn try_take(&self) -> bool {
        let mut raised = self.raised.lock().unwrap();
        std::mem::replace(&mut *raised, false)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
