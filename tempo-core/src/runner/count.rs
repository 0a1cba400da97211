use std::sync::Arc;
use std::time::Duration;

use super::{CancelToken, InvocationBudget, InvocationRunner};
use crate::error::Result;
use crate::timer::WaitTimer;
use crate::tracker::PerformanceTracker;

/// Performs invocations until the shared budget runs dry.
pub struct CountRunner {
    tracker: Arc<PerformanceTracker>,
    budget: Arc<InvocationBudget>,
    wait_timer: WaitTimer,
    cancel: CancelToken,
}

impl CountRunner {
    pub fn new(tracker: Arc<PerformanceTracker>, budget: Arc<InvocationBudget>) -> Self {
        let wait_timer = tracker.config().wait_timer;
        Self {
            tracker,
            budget,
            wait_timer,
            cancel: CancelToken::new(),
        }
    }
}

impl InvocationRunner for CountRunner {
    fn run(&mut self) -> Result<()> {
        let mut performed = 0u64;
        while !self.cancel.is_cancelled() && self.budget.claim().is_some() {
            self.tracker.invoke()?;

            let wait = self.wait_timer.next_wait_millis(performed);
            performed += 1;
            if wait > 0 && !self.cancel.sleep(Duration::from_millis(wait)) {
                break;
            }
        }

        tracing::debug!(
            id = %self.tracker.id(),
            performed,
            cancelled = self.cancel.is_cancelled(),
            "count runner finished"
        );
        Ok(())
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}
