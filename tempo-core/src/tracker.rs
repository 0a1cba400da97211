use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tempo_metrics::{DEFAULT_MAX_TRACKED_MILLIS, LatencyCounter};

use crate::config::ExecutionConfig;
use crate::error::{Error, Result};
use crate::invoker::Invoker;
use crate::report::ReportSink;
use crate::requirement::{PerformanceRequirement, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingPhase {
    NotStarted,
    Tracking,
    Stopped,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    NotStarted,
    Tracking(Arc<[LatencyCounter]>),
    Stopped(Arc<[LatencyCounter]>),
}

#[derive(Debug, Default)]
struct State {
    phase: Phase,
    // Real-time offset at which measurement may begin; fixed by the first invocation.
    warm_up_done_at: Option<u64>,
}

/// Wraps an [`Invoker`], times every call, and decides which calls count.
///
/// Shared by all worker threads of a run. Every phase change and every sample
/// append happens under one lock, so the warm-up transition is taken exactly once
/// no matter how many threads race for it.
pub struct PerformanceTracker {
    invoker: Arc<dyn Invoker>,
    config: ExecutionConfig,
    requirement: Option<PerformanceRequirement>,
    report: Arc<dyn ReportSink>,
    origin: Instant,
    state: Mutex<State>,
}

impl PerformanceTracker {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        config: ExecutionConfig,
        requirement: Option<PerformanceRequirement>,
        report: Arc<dyn ReportSink>,
    ) -> Result<Self> {
        if config.clocks.is_empty() {
            return Err(Error::NoClocks);
        }
        Ok(Self {
            invoker,
            config,
            requirement,
            report,
            origin: Instant::now(),
            state: Mutex::new(State::default()),
        })
    }

    pub fn id(&self) -> &str {
        self.invoker.id()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn requirement(&self) -> Option<&PerformanceRequirement> {
        self.requirement.as_ref()
    }

    pub fn phase(&self) -> TrackingPhase {
        match self.state.lock().phase {
            Phase::NotStarted => TrackingPhase::NotStarted,
            Phase::Tracking(_) => TrackingPhase::Tracking,
            Phase::Stopped(_) => TrackingPhase::Stopped,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.phase() == TrackingPhase::Tracking
    }

    /// One counter per configured clock, in clock order. `None` before tracking starts.
    pub fn counters(&self) -> Option<Arc<[LatencyCounter]>> {
        match &self.state.lock().phase {
            Phase::NotStarted => None,
            Phase::Tracking(c) | Phase::Stopped(c) => Some(c.clone()),
        }
    }

    /// Milliseconds since the tracker was created.
    pub fn real_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Performs and times one invocation.
    pub fn invoke(&self) -> Result<()> {
        let call_start = self.real_millis();
        let measured = self.check_state(call_start);

        let clocks = &self.config.clocks;
        let starts: Vec<u64> = clocks.iter().map(|c| c.now_millis()).collect();
        let outcome = self.invoker.invoke();
        let latencies: Vec<u64> = clocks
            .iter()
            .zip(&starts)
            .map(|(c, start)| c.now_millis().saturating_sub(*start))
            .collect();

        outcome.map_err(|source| Error::Invocation {
            id: self.id().to_string(),
            source,
        })?;

        let latency = latencies.first().copied().unwrap_or_default();
        let tracked = measured && self.record(&latencies);
        self.report.invoked(self.id(), latency, call_start);

        if tracked
            && self.config.cancel_on_violation
            && let Some(violation) = self
                .requirement
                .as_ref()
                .and_then(|r| r.check_latency(self.id(), latency))
        {
            tracing::warn!(id = %self.id(), latency_ms = latency, "cancelling run on requirement violation");
            self.report.fail(&violation.to_string());
            return Err(Error::Violation(violation));
        }

        Ok(())
    }

    /// Takes the warm-up transition if due. Returns whether a call starting at
    /// `call_start` is measured.
    fn check_state(&self, call_start: u64) -> bool {
        let mut state = self.state.lock();
        let warm_up_ms = self.config.warm_up.as_millis() as u64;
        let done_at = *state
            .warm_up_done_at
            .get_or_insert_with(|| call_start.saturating_add(warm_up_ms));

        if !self.config.warm_up.is_zero() && call_start < done_at {
            return false;
        }
        if matches!(state.phase, Phase::NotStarted) {
            state.phase = Phase::Tracking(self.start_counters());
        }
        true
    }

    fn start_counters(&self) -> Arc<[LatencyCounter]> {
        self.report.starting(self.id());

        let max_tracked = self
            .requirement
            .as_ref()
            .and_then(|r| r.max)
            .map_or(DEFAULT_MAX_TRACKED_MILLIS, |max| {
                max.max(DEFAULT_MAX_TRACKED_MILLIS)
            });

        let counters: Arc<[LatencyCounter]> = self
            .config
            .clocks
            .iter()
            .map(|clock| LatencyCounter::new(self.id(), clock.name(), max_tracked))
            .collect();
        for counter in counters.iter() {
            counter.start();
        }

        tracing::debug!(id = %self.id(), clocks = counters.len(), "tracking started");
        counters
    }

    fn record(&self, latencies: &[u64]) -> bool {
        let state = self.state.lock();
        let Phase::Tracking(counters) = &state.phase else {
            return false;
        };
        for (counter, latency) in counters.iter().zip(latencies) {
            counter.add_sample(*latency);
        }
        true
    }

    /// Closes the measurement window and evaluates the requirement against the
    /// primary counter. Every breach is reported to the sink and returned.
    pub fn stop_tracking(&self) -> Result<Vec<Violation>> {
        let counters = {
            let mut state = self.state.lock();
            let Phase::Tracking(counters) = &state.phase else {
                return Err(Error::NotTracking);
            };
            let counters = counters.clone();
            state.phase = Phase::Stopped(counters.clone());
            counters
        };

        for counter in counters.iter() {
            counter.stop()?;
        }

        let Some(main) = counters.first() else {
            return Ok(Vec::new());
        };

        let summary = main.summary();
        tracing::info!(
            id = %self.id(),
            clock = main.clock_name(),
            samples = summary.count,
            elapsed_ms = summary.duration.as_millis() as u64,
            min_ms = ?summary.min,
            max_ms = ?summary.max,
            mean_ms = ?summary.mean,
            p90_ms = ?summary.p90,
            throughput = ?summary.throughput,
            "tracking stopped"
        );

        self.report
            .completed(self.id(), &counters, &self.config, self.requirement.as_ref());

        let violations = self
            .requirement
            .as_ref()
            .map(|r| r.evaluate(self.id(), main))
            .unwrap_or_default();
        for violation in &violations {
            tracing::warn!(id = %self.id(), "{violation}");
            self.report.fail(&violation.to_string());
        }

        Ok(violations)
    }

    /// Drops the counters and returns to the initial phase.
    pub fn clear(&self) {
        *self.state.lock() = State::default();
    }
}
