use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::latency::{DEFAULT_MAX_TRACKED_MILLIS, LatencyCounter};

/// Named latency counters, created and started on first use.
#[derive(Debug)]
pub struct CounterRegistry {
    counters: DashMap<Arc<str>, Arc<LatencyCounter>>,
    max_tracked: u64,
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::with_max_tracked(DEFAULT_MAX_TRACKED_MILLIS)
    }
}

impl CounterRegistry {
    pub fn with_max_tracked(max_tracked: u64) -> Self {
        Self {
            counters: DashMap::new(),
            max_tracked,
        }
    }

    /// Process-wide registry.
    pub fn global() -> &'static CounterRegistry {
        static GLOBAL: OnceLock<CounterRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CounterRegistry::default)
    }

    pub fn counter(&self, name: &str) -> Arc<LatencyCounter> {
        if let Some(counter) = self.counters.get(name) {
            return Arc::clone(&counter);
        }

        let entry = self.counters.entry(Arc::from(name)).or_insert_with(|| {
            let counter = LatencyCounter::new(name, "system", self.max_tracked);
            counter.start();
            Arc::new(counter)
        });
        Arc::clone(&entry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<LatencyCounter>> {
        self.counters.get(name).map(|c| Arc::clone(&c))
    }

    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.counters.iter().map(|e| e.key().to_string()).collect();
        out.sort_unstable();
        out
    }

    pub fn clear(&self) {
        self.counters.clear();
    }
}
