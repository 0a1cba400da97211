pub mod error;
pub mod latency;
pub mod registry;
pub mod stopwatch;

pub use error::{Error, Result};
pub use latency::{DEFAULT_MAX_TRACKED_MILLIS, LatencyCounter, LatencySummary};
pub use registry::CounterRegistry;
pub use stopwatch::StopWatch;
