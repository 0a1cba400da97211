use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{CancelToken, InvocationRunner};
use crate::error::{Error, Result};

/// Runs a group of runners on one thread each, starting runner `i` after `i * ramp_up`.
pub struct ConcurrentRunner {
    id: String,
    runners: Vec<Box<dyn InvocationRunner>>,
    ramp_up: Duration,
    cancel: CancelToken,
}

impl ConcurrentRunner {
    pub fn new(
        id: impl Into<String>,
        runners: Vec<Box<dyn InvocationRunner>>,
        ramp_up: Duration,
    ) -> Self {
        let cancel = CancelToken::new();
        for runner in &runners {
            cancel.link(runner.cancel_token());
        }
        Self {
            id: id.into(),
            runners,
            ramp_up,
            cancel,
        }
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

struct Failures<'a> {
    group: &'a CancelToken,
    first: Mutex<Option<Error>>,
    count: AtomicUsize,
}

impl Failures<'_> {
    fn record(&self, err: Error) {
        self.count.fetch_add(1, Ordering::AcqRel);
        {
            let mut first = self.first.lock();
            if first.is_none() {
                tracing::warn!(error = %err, "runner failed, cancelling the group");
                *first = Some(err);
            }
        }
        self.group.cancel();
    }
}

impl InvocationRunner for ConcurrentRunner {
    fn run(&mut self) -> Result<()> {
        let group_start = Instant::now();
        let failures = Failures {
            group: &self.cancel,
            first: Mutex::new(None),
            count: AtomicUsize::new(0),
        };
        let id = self.id.as_str();
        let ramp_up = self.ramp_up;

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.runners.len());
            for (i, runner) in self.runners.iter_mut().enumerate() {
                let delay = u32::try_from(i)
                    .ok()
                    .and_then(|i| ramp_up.checked_mul(i))
                    .unwrap_or(Duration::MAX);
                let token = runner.cancel_token();
                let failures = &failures;

                let spawned = thread::Builder::new()
                    .name(format!("{id}-{i}"))
                    .spawn_scoped(s, move || {
                        if !delay.is_zero() {
                            tracing::debug!(id, runner = i, delay_ms = delay.as_millis() as u64, "deferred start");
                            if !token.sleep(delay.saturating_sub(group_start.elapsed())) {
                                return;
                            }
                        }
                        tracing::debug!(id, runner = i, "runner started");
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner.run()))
                            .unwrap_or_else(|payload| Err(Error::WorkerPanicked(panic_message(payload))));
                        if let Err(err) = outcome {
                            failures.record(err);
                        }
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        failures.record(Error::Spawn(err));
                        break;
                    }
                }
            }

            for handle in handles {
                if let Err(payload) = handle.join() {
                    failures.record(Error::WorkerPanicked(panic_message(payload)));
                }
            }
        });

        let failed = failures.count.load(Ordering::Acquire);
        match failures.first.into_inner() {
            Some(first) => Err(Error::Group {
                id: self.id.clone(),
                failed,
                source: Box::new(first),
            }),
            None => Ok(()),
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
