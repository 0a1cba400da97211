use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tempo_metrics::LatencyCounter;

use crate::config::ExecutionConfig;
use crate::requirement::PerformanceRequirement;

/// Receives lifecycle callbacks and failures from a [`PerformanceTracker`](crate::PerformanceTracker).
///
/// Implementations are called concurrently from every worker thread.
pub trait ReportSink: Send + Sync {
    fn starting(&self, _id: &str) {}

    /// One finished invocation. `start_ms` is the real-time offset of the call
    /// start, relative to the tracker's creation.
    fn invoked(&self, _id: &str, _latency_ms: u64, _start_ms: u64) {}

    fn completed(
        &self,
        _id: &str,
        _counters: &[LatencyCounter],
        _config: &ExecutionConfig,
        _requirement: Option<&PerformanceRequirement>,
    ) {
    }

    /// A requirement was breached.
    fn fail(&self, _message: &str) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReport;

impl ReportSink for NoReport {}

/// Fans every callback out to several sinks.
#[derive(Clone, Default)]
pub struct Reports {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl Reports {
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn ReportSink>) {
        self.sinks.push(sink);
    }
}

impl ReportSink for Reports {
    fn starting(&self, id: &str) {
        for s in &self.sinks {
            s.starting(id);
        }
    }

    fn invoked(&self, id: &str, latency_ms: u64, start_ms: u64) {
        for s in &self.sinks {
            s.invoked(id, latency_ms, start_ms);
        }
    }

    fn completed(
        &self,
        id: &str,
        counters: &[LatencyCounter],
        config: &ExecutionConfig,
        requirement: Option<&PerformanceRequirement>,
    ) {
        for s in &self.sinks {
            s.completed(id, counters, config, requirement);
        }
    }

    fn fail(&self, message: &str) {
        for s in &self.sinks {
            s.fail(message);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationLog {
    pub id: String,
    pub latency_ms: u64,
    pub start_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSummary {
    pub id: String,
    pub elapsed: Duration,
    pub invocations: u64,
    pub start_time: Option<SystemTime>,
}

#[derive(Debug, Default)]
struct ListState {
    started: Vec<String>,
    invocations: Vec<InvocationLog>,
    summaries: Vec<InvocationSummary>,
    failures: Vec<String>,
}

/// Keeps every callback in memory.
#[derive(Debug, Default)]
pub struct ListReport {
    state: Mutex<ListState>,
}

impl ListReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().started.clone()
    }

    pub fn invocations(&self) -> Vec<InvocationLog> {
        self.state.lock().invocations.clone()
    }

    pub fn summaries(&self) -> Vec<InvocationSummary> {
        self.state.lock().summaries.clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.state.lock().failures.clone()
    }
}

impl ReportSink for ListReport {
    fn starting(&self, id: &str) {
        self.state.lock().started.push(id.to_string());
    }

    fn invoked(&self, id: &str, latency_ms: u64, start_ms: u64) {
        self.state.lock().invocations.push(InvocationLog {
            id: id.to_string(),
            latency_ms,
            start_ms,
        });
    }

    fn completed(
        &self,
        id: &str,
        counters: &[LatencyCounter],
        _config: &ExecutionConfig,
        _requirement: Option<&PerformanceRequirement>,
    ) {
        let Some(main) = counters.first() else {
            return;
        };
        self.state.lock().summaries.push(InvocationSummary {
            id: id.to_string(),
            elapsed: main.duration(),
            invocations: main.sample_count(),
            start_time: main.start_time(),
        });
    }

    fn fail(&self, message: &str) {
        self.state.lock().failures.push(message.to_string());
    }
}
