use std::sync::atomic::{AtomicU64, Ordering};

/// Remaining invocations shared by every runner of a count-based run.
#[derive(Debug)]
pub struct InvocationBudget {
    total: u64,
    remaining: AtomicU64,
}

impl InvocationBudget {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            remaining: AtomicU64::new(total),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Takes one invocation out of the budget and returns its 0-based index,
    /// or `None` once the budget is exhausted.
    pub fn claim(&self) -> Option<u64> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|before| self.total - before)
    }
}
