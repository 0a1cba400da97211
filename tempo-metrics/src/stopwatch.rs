use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::latency::LatencyCounter;
use crate::registry::CounterRegistry;

/// Times one scope and records the elapsed milliseconds into a named counter.
#[derive(Debug)]
pub struct StopWatch {
    counter: Arc<LatencyCounter>,
    started: Option<Instant>,
}

impl StopWatch {
    pub fn start(registry: &CounterRegistry, name: &str) -> Self {
        Self {
            counter: registry.counter(name),
            started: Some(Instant::now()),
        }
    }

    /// Records the sample and returns it. Fails on the second call.
    pub fn stop(&mut self) -> Result<u64> {
        let started = self.started.take().ok_or(Error::AlreadyStopped)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.counter.add_sample(elapsed_ms);
        Ok(elapsed_ms)
    }
}
