use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Time source used to measure invocation latency.
pub trait Clock: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Monotonic time in milliseconds. Only differences are meaningful.
    fn now_millis(&self) -> u64;
}

/// Monotonic wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn name(&self) -> &str {
        "system"
    }

    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    name: Arc<str>,
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            now: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn name(&self) -> &str {
        &self.name
    }

    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new("manual");
        assert_eq!(clock.now_millis(), 0);
        clock.advance(150);
        clock.advance(5);
        assert_eq!(clock.now_millis(), 155);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
        assert_eq!(clock.name(), "manual");
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_millis();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now_millis() >= a + 5);
    }
}
