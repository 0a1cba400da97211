pub mod clock;
pub mod config;
pub mod error;
pub mod invoker;
pub mod report;
pub mod requirement;
pub mod runner;
pub mod timer;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ExecutionConfig, Workload};
pub use error::{Error, ErrorKind, InvokeError, Result};
pub use invoker::{FnInvoker, Invoker, invoker};
pub use perf_test::{PerfTest, PerfTestOutcome, timed_durations};
pub use report::{InvocationLog, InvocationSummary, ListReport, NoReport, ReportSink, Reports};
pub use requirement::{
    PercentileRequirement, PerformanceRequirement, Violation, parse_percentiles,
};
pub use runner::{
    CancelToken, ConcurrentRunner, CountRunner, InvocationBudget, InvocationRunner, TimedRunner,
};
pub use tempo_metrics::{LatencyCounter, LatencySummary};
pub use timer::{WaitTimer, WaitTimerKind};
pub use tracker::{PerformanceTracker, TrackingPhase};
