use std::thread;
use std::time::Duration;

use tempo_metrics::{CounterRegistry, Error, StopWatch};

const NAME: &str = "StopWatchTest";

fn sleep_timed(registry: &CounterRegistry, delay_ms: u64) {
    let mut watch = StopWatch::start(registry, NAME);
    thread::sleep(Duration::from_millis(delay_ms));
    if let Err(e) = watch.stop() {
        panic!("stop failed: {e}");
    }
}

#[test]
fn single_call() {
    let registry = CounterRegistry::default();
    sleep_timed(&registry, 50);
    let counter = registry
        .get(NAME)
        .unwrap_or_else(|| panic!("expected counter"));
    assert_eq!(counter.sample_count(), 1);
}

#[test]
fn subsequent_calls() {
    let registry = CounterRegistry::default();
    sleep_timed(&registry, 50);
    sleep_timed(&registry, 50);
    sleep_timed(&registry, 50);

    let counter = registry
        .get(NAME)
        .unwrap_or_else(|| panic!("expected counter"));
    assert_eq!(counter.sample_count(), 3);
    let min = counter.min_latency().unwrap_or(0);
    assert!((50..100).contains(&min), "min = {min}");
    let avg = counter.average_latency().unwrap_or(0.0);
    assert!((50.0..100.0).contains(&avg), "avg = {avg}");
}

#[test]
fn parallel_calls() {
    let registry = CounterRegistry::default();
    thread::scope(|s| {
        for _ in 0..20 {
            s.spawn(|| {
                for _ in 0..20 {
                    sleep_timed(&registry, 50);
                }
            });
        }
    });

    let counter = registry
        .get(NAME)
        .unwrap_or_else(|| panic!("expected counter"));
    assert_eq!(counter.sample_count(), 400);
    let min = counter.min_latency().unwrap_or(0);
    assert!((50..100).contains(&min), "min = {min}");
}

#[test]
fn multi_stop_fails() {
    let registry = CounterRegistry::default();
    let mut watch = StopWatch::start(&registry, NAME);
    assert!(watch.stop().is_ok());
    assert_eq!(watch.stop(), Err(Error::AlreadyStopped));
}
