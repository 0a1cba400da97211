use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::timer::WaitTimer;

/// How a run decides it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// A total invocation budget shared by every thread.
    Invocations(u64),
    /// Run at full concurrency for this long.
    Duration(Duration),
}

/// Immutable run parameters.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Total invocations across all threads. Ignored when `duration` is set.
    pub invocations: Option<u64>,
    /// Time to run at full concurrency. Wins over `invocations` when non-zero.
    pub duration: Option<Duration>,
    pub threads: u64,
    /// Delay between starting each additional thread.
    pub ramp_up: Duration,
    /// Invocations starting earlier than this after the first one are not measured.
    pub warm_up: Duration,
    /// Abort on the first invocation exceeding the `max` requirement.
    pub cancel_on_violation: bool,
    pub wait_timer: WaitTimer,
    /// The first clock is authoritative for requirement checks.
    pub clocks: Vec<Arc<dyn Clock>>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            invocations: Some(1),
            duration: None,
            threads: 1,
            ramp_up: Duration::ZERO,
            warm_up: Duration::ZERO,
            cancel_on_violation: false,
            wait_timer: WaitTimer::None,
            clocks: vec![Arc::new(SystemClock::new())],
        }
    }
}

impl ExecutionConfig {
    pub fn with_invocations(invocations: u64) -> Self {
        Self {
            invocations: Some(invocations),
            ..Self::default()
        }
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            invocations: None,
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Resolves the run shape. A non-zero duration takes precedence.
    pub fn workload(&self) -> Result<Workload> {
        if let Some(duration) = self.duration
            && !duration.is_zero()
        {
            return Ok(Workload::Duration(duration));
        }
        self.invocations
            .map(Workload::Invocations)
            .ok_or(Error::MissingWorkload)
    }

    /// Checks everything that can be checked before a worker starts.
    pub fn validate(&self) -> Result<Workload> {
        if self.threads == 0 {
            return Err(Error::InvalidThreads);
        }
        if self.clocks.is_empty() {
            return Err(Error::NoClocks);
        }
        self.workload()
    }
}
