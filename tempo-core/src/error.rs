use crate::requirement::Violation;

pub type Result<T> = std::result::Result<T, Error>;

/// Error raised by the wrapped unit of work.
pub type InvokeError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or contradictory run parameters, detected before any worker starts.
    Configuration,
    /// Lifecycle misuse (stop before start, double stop).
    State,
    /// The work under test failed, or a worker could not run.
    Execution,
    /// A requirement breach aborted the run (cancel-on-violation).
    Violation,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no useful invocation count or duration defined")]
    MissingWorkload,

    #[error("`threads` must be a positive integer")]
    InvalidThreads,

    #[error("at least one clock must be configured")]
    NoClocks,

    #[error("test duration is shorter than the cumulated ramp-up times")]
    RampUpExceedsDuration,

    #[error("invalid wait timer `{0}` (expected `none`, `constant`, `random`, or `cumulated`)")]
    UnknownWaitTimer(String),

    #[error("invalid parameters for wait timer `{timer}`: {reason}")]
    InvalidTimerParams { timer: String, reason: String },

    #[error("invalid percentile requirement `{0}` (expected `<percentile 0..=100>:<millis>`)")]
    InvalidPercentile(String),

    #[error("stop before start")]
    NotTracking,

    #[error("latency counter: {0}")]
    Counter(#[from] tempo_metrics::Error),

    #[error("invocation of `{id}` failed: {source}")]
    Invocation {
        id: String,
        #[source]
        source: InvokeError,
    },

    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("test finished before warm-up period ({0} ms) was over")]
    WarmUpNotReached(u64),

    #[error("{failed} runner(s) of `{id}` failed, first: {source}")]
    Group {
        id: String,
        failed: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Violation(Violation),
}

impl Error {
    /// The first underlying failure, looking through group aggregation.
    pub fn root(&self) -> &Error {
        match self {
            Error::Group { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::MissingWorkload
            | Error::InvalidThreads
            | Error::NoClocks
            | Error::RampUpExceedsDuration
            | Error::UnknownWaitTimer(_)
            | Error::InvalidTimerParams { .. }
            | Error::InvalidPercentile(_) => ErrorKind::Configuration,
            Error::NotTracking | Error::Counter(_) => ErrorKind::State,
            Error::Violation(_) => ErrorKind::Violation,
            Error::Invocation { .. }
            | Error::WorkerPanicked(_)
            | Error::Spawn(_)
            | Error::WarmUpNotReached(_)
            | Error::Group { .. } => ErrorKind::Execution,
        }
    }
}
