use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Per-millisecond tracking ceiling used when the caller has no better bound (60s).
pub const DEFAULT_MAX_TRACKED_MILLIS: u64 = 60_000;

// Larger bounds fall back to this; slower samples land in the tail bucket.
const MAX_TRACKED_CEILING: u64 = 600_000;

#[derive(Debug, Clone, Copy)]
enum Window {
    Idle,
    Running {
        started: Instant,
        started_at: SystemTime,
    },
    Stopped {
        started: Instant,
        started_at: SystemTime,
        stopped: Instant,
    },
}

impl Window {
    fn elapsed(&self) -> Duration {
        match *self {
            Window::Idle => Duration::ZERO,
            Window::Running { started, .. } => started.elapsed(),
            Window::Stopped {
                started, stopped, ..
            } => stopped.saturating_duration_since(started),
        }
    }

    fn started_at(&self) -> Option<SystemTime> {
        match *self {
            Window::Idle => None,
            Window::Running { started_at, .. } | Window::Stopped { started_at, .. } => {
                Some(started_at)
            }
        }
    }
}

#[derive(Debug)]
struct State {
    // counts[ms] = samples of exactly `ms` milliseconds, up to the bound.
    counts: Vec<u64>,
    // Samples above the bound; they form the top bucket.
    saturated: u64,
    count: u64,
    total: u64,
    min: u64,
    max: u64,
    window: Window,
}

impl State {
    fn percentile(&self, percentile: u8) -> Option<u64> {
        if self.count == 0 {
            return None;
        }
        if percentile == 0 {
            return Some(self.min);
        }

        // Nearest rank: the smallest value covering at least p% of the samples.
        let p = u64::from(percentile.min(100));
        let rank = (self.count.saturating_mul(p)).div_ceil(100).max(1);

        let mut seen = 0u64;
        let first = usize::try_from(self.min).unwrap_or(usize::MAX);
        for (millis, count) in self.counts.iter().enumerate().skip(first) {
            seen = seen.saturating_add(*count);
            if seen >= rank {
                return Some(millis as u64);
            }
        }

        // Rank falls into the saturated bucket.
        Some(self.max)
    }

    fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / self.count as f64)
    }

    fn throughput(&self) -> Option<u64> {
        let elapsed_ms = self.window.elapsed().as_millis() as u64;
        (elapsed_ms > 0).then(|| self.count.saturating_mul(1000) / elapsed_ms)
    }
}

/// Point-in-time view of a [`LatencyCounter`], taken under a single lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub mean: Option<f64>,
    pub p50: Option<u64>,
    pub p90: Option<u64>,
    pub p95: Option<u64>,
    pub p99: Option<u64>,
    pub duration: Duration,
    pub throughput: Option<u64>,
}

/// Thread-safe latency accumulator for one invocation target measured by one clock.
///
/// Samples are whole milliseconds. Values above `max_tracked` are kept in a
/// saturated tail bucket: they still count towards `min`/`max`/`average`, and a
/// percentile whose rank lands in the tail reports the observed maximum.
///
/// `start`/`stop` bound the measurement window used by [`duration`](Self::duration)
/// and [`throughput`](Self::throughput). Sampling does not require a running window.
#[derive(Debug)]
pub struct LatencyCounter {
    name: Arc<str>,
    clock: Arc<str>,
    max_tracked: u64,
    state: Mutex<State>,
}

impl LatencyCounter {
    pub fn new(name: impl Into<Arc<str>>, clock: impl Into<Arc<str>>, max_tracked: u64) -> Self {
        let max_tracked = max_tracked.clamp(2, MAX_TRACKED_CEILING);
        Self {
            name: name.into(),
            clock: clock.into(),
            max_tracked,
            state: Mutex::new(State {
                counts: vec![0; max_tracked as usize + 1],
                saturated: 0,
                count: 0,
                total: 0,
                min: u64::MAX,
                max: 0,
                window: Window::Idle,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock_name(&self) -> &str {
        &self.clock
    }

    pub fn max_tracked(&self) -> u64 {
        self.max_tracked
    }

    /// Opens (or reopens) the measurement window.
    pub fn start(&self) {
        self.state.lock().window = Window::Running {
            started: Instant::now(),
            started_at: SystemTime::now(),
        };
    }

    /// Closes the measurement window.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.window {
            Window::Idle => Err(Error::NotStarted),
            Window::Stopped { .. } => Err(Error::AlreadyStopped),
            Window::Running {
                started,
                started_at,
            } => {
                state.window = Window::Stopped {
                    started,
                    started_at,
                    stopped: Instant::now(),
                };
                Ok(())
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state.lock().window, Window::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state.lock().window, Window::Stopped { .. })
    }

    pub fn add_sample(&self, latency_ms: u64) {
        let mut state = self.state.lock();
        if latency_ms > self.max_tracked {
            state.saturated = state.saturated.saturating_add(1);
        } else if let Some(slot) = state.counts.get_mut(latency_ms as usize) {
            *slot = slot.saturating_add(1);
        }
        state.count = state.count.saturating_add(1);
        state.total = state.total.saturating_add(latency_ms);
        state.min = state.min.min(latency_ms);
        state.max = state.max.max(latency_ms);
    }

    pub fn sample_count(&self) -> u64 {
        self.state.lock().count
    }

    /// Samples that exceeded the tracking bound.
    pub fn saturated_count(&self) -> u64 {
        self.state.lock().saturated
    }

    pub fn total_latency(&self) -> u64 {
        self.state.lock().total
    }

    pub fn min_latency(&self) -> Option<u64> {
        let state = self.state.lock();
        (state.count > 0).then_some(state.min)
    }

    pub fn max_latency(&self) -> Option<u64> {
        let state = self.state.lock();
        (state.count > 0).then_some(state.max)
    }

    pub fn average_latency(&self) -> Option<f64> {
        self.state.lock().average()
    }

    /// Smallest recorded latency `L` such that at least `percentile`% of the
    /// samples are `<= L`. `0` yields the minimum, `100` the maximum.
    pub fn percentile_latency(&self, percentile: u8) -> Option<u64> {
        self.state.lock().percentile(percentile)
    }

    /// Length of the measurement window; still growing while the counter runs.
    pub fn duration(&self) -> Duration {
        self.state.lock().window.elapsed()
    }

    /// Wall-clock time the window was opened.
    pub fn start_time(&self) -> Option<SystemTime> {
        self.state.lock().window.started_at()
    }

    /// Calls per second over the window, truncated. `None` for an empty window.
    pub fn throughput(&self) -> Option<u64> {
        self.state.lock().throughput()
    }

    pub fn summary(&self) -> LatencySummary {
        let state = self.state.lock();
        let p = |percentile| state.percentile(percentile);
        LatencySummary {
            count: state.count,
            min: (state.count > 0).then_some(state.min),
            max: (state.count > 0).then_some(state.max),
            mean: state.average(),
            p50: p(50),
            p90: p(90),
            p95: p(95),
            p99: p(99),
            duration: state.window.elapsed(),
            throughput: state.throughput(),
        }
    }
}
