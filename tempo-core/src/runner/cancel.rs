use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cooperative cancellation flag shared between a runner and whoever controls it.
///
/// Cancelling wakes every pending [`sleep`](Self::sleep) and propagates to linked
/// child tokens.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<Vec<CancelToken>>,
    wake: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let children = {
            let mut children = self.inner.lock.lock();
            self.inner.cancelled.store(true, Ordering::Release);
            self.inner.wake.notify_all();
            std::mem::take(&mut *children)
        };
        for child in children {
            child.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Cancels `child` whenever this token is cancelled (immediately if it already is).
    pub fn link(&self, child: CancelToken) {
        {
            let mut children = self.inner.lock.lock();
            if !self.is_cancelled() {
                children.push(child);
                return;
            }
        }
        child.cancel();
    }

    /// Blocks for `duration`. Returns `false` if cancelled before it elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        match Instant::now().checked_add(duration) {
            Some(deadline) => self.sleep_until(deadline),
            None => {
                let mut guard = self.inner.lock.lock();
                while !self.is_cancelled() {
                    self.inner.wake.wait(&mut guard);
                }
                false
            }
        }
    }

    /// Blocks until `deadline`. Returns `false` if cancelled first.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        let mut guard = self.inner.lock.lock();
        loop {
            if self.is_cancelled() {
                return false;
            }
            if Instant::now() >= deadline {
                return true;
            }
            self.inner.wake.wait_until(&mut guard, deadline);
        }
    }
}
