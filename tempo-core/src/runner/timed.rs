use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CancelToken, InvocationRunner};
use crate::error::Result;
use crate::timer::WaitTimer;
use crate::tracker::PerformanceTracker;

/// Performs invocations until its own run length has elapsed.
///
/// The deadline is fixed when `run` starts and compared against at each loop
/// head, so the last invocation may overrun it by at most its own latency.
pub struct TimedRunner {
    tracker: Arc<PerformanceTracker>,
    duration: Duration,
    wait_timer: WaitTimer,
    cancel: CancelToken,
}

impl TimedRunner {
    pub fn new(tracker: Arc<PerformanceTracker>, duration: Duration) -> Self {
        let wait_timer = tracker.config().wait_timer;
        Self {
            tracker,
            duration,
            wait_timer,
            cancel: CancelToken::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl InvocationRunner for TimedRunner {
    fn run(&mut self) -> Result<()> {
        let started = Instant::now();
        let deadline = started.checked_add(self.duration);
        let open = |now: Instant| deadline.is_none_or(|d| now < d);

        let mut performed = 0u64;
        while !self.cancel.is_cancelled() && open(Instant::now()) {
            self.tracker.invoke()?;

            let wait = self.wait_timer.next_wait_millis(performed);
            performed += 1;
            if wait == 0 {
                continue;
            }
            let resume = Instant::now().checked_add(Duration::from_millis(wait));
            let until = match (resume, deadline) {
                (Some(r), Some(d)) => r.min(d),
                (Some(r), None) => r,
                (None, Some(d)) => d,
                (None, None) => break,
            };
            if !self.cancel.sleep_until(until) {
                break;
            }
        }

        tracing::debug!(
            id = %self.tracker.id(),
            performed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            cancelled = self.cancel.is_cancelled(),
            "timed runner finished"
        );
        Ok(())
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}
