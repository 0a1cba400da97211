use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tempo_core::{
    Clock, Error, ErrorKind, ExecutionConfig, ListReport, ManualClock, PerfTest,
    PerformanceRequirement, PerformanceTracker, SystemClock, Violation, invoker,
    parse_percentiles,
};

/// Config whose primary clock advances by `latencies[i]` during call `i`.
fn manual_run(
    invocations: u64,
    latencies: Vec<u64>,
) -> (ExecutionConfig, impl Fn() -> Result<(), tempo_core::InvokeError> + Send + Sync) {
    let clock = Arc::new(ManualClock::new("manual"));
    let config = ExecutionConfig {
        clocks: vec![clock.clone() as Arc<dyn Clock>, Arc::new(SystemClock::new())],
        ..ExecutionConfig::with_invocations(invocations)
    };
    let next = AtomicU64::new(0);
    let work = move || -> Result<(), tempo_core::InvokeError> {
        let i = next.fetch_add(1, Ordering::Relaxed) as usize;
        clock.advance(latencies.get(i).copied().unwrap_or(1));
        Ok(())
    };
    (config, work)
}

#[test]
fn one_slow_sample_is_one_max_violation() -> anyhow::Result<()> {
    let report = Arc::new(ListReport::new());
    let (config, work) = manual_run(1, vec![150]);
    let outcome = PerfTest::new("slow", config)
        .with_requirement(PerformanceRequirement {
            max: Some(100),
            ..PerformanceRequirement::default()
        })
        .with_report(report.clone())
        .run_fn(work)?;

    anyhow::ensure!(!outcome.passed());
    anyhow::ensure!(
        outcome.violations
            == vec![Violation::MaxLatency {
                id: "slow".to_string(),
                required: 100,
                measured: 150,
            }],
        "{:?}",
        outcome.violations
    );
    anyhow::ensure!(report.failures().len() == 1);
    anyhow::ensure!(report.summaries().len() == 1);
    Ok(())
}

#[test]
fn fast_samples_pass() -> anyhow::Result<()> {
    let (config, work) = manual_run(5, vec![10, 100, 40, 99, 1]);
    let outcome = PerfTest::new("fast", config)
        .with_requirement(PerformanceRequirement {
            max: Some(100),
            ..PerformanceRequirement::default()
        })
        .run_fn(work)?;

    anyhow::ensure!(outcome.passed(), "{:?}", outcome.violations);
    let primary = outcome
        .primary()
        .ok_or_else(|| anyhow::anyhow!("no counter"))?;
    anyhow::ensure!(primary.max_latency() == Some(100));
    anyhow::ensure!(primary.percentile_latency(100) == primary.max_latency());
    anyhow::ensure!(primary.percentile_latency(0) == primary.min_latency());
    Ok(())
}

#[test]
fn every_broken_threshold_is_reported() -> anyhow::Result<()> {
    let report = Arc::new(ListReport::new());
    let (config, work) = manual_run(10, vec![1, 2, 3, 4, 5, 6, 7, 8, 20, 30]);
    let outcome = PerfTest::new("many", config)
        .with_requirement(PerformanceRequirement {
            max: Some(10),
            average: Some(5),
            percentiles: parse_percentiles("50:100,90:15")?,
            ..PerformanceRequirement::default()
        })
        .with_report(report.clone())
        .run_fn(work)?;

    anyhow::ensure!(outcome.violations.len() == 3, "{:?}", outcome.violations);
    anyhow::ensure!(matches!(outcome.violations[0], Violation::MaxLatency { .. }));
    anyhow::ensure!(matches!(outcome.violations[1], Violation::AverageLatency { .. }));
    anyhow::ensure!(matches!(
        outcome.violations[2],
        Violation::Percentile { percentile: 90, .. }
    ));
    anyhow::ensure!(report.failures().len() == 3);
    Ok(())
}

#[test]
fn slow_percentile_is_a_recorded_latency() -> anyhow::Result<()> {
    let report = Arc::new(ListReport::new());
    let (config, work) = manual_run(2, vec![3_000, 9_000]);
    let outcome = PerfTest::new("slow-p50", config)
        .with_requirement(PerformanceRequirement {
            percentiles: parse_percentiles("50:3000")?,
            ..PerformanceRequirement::default()
        })
        .with_report(report.clone())
        .run_fn(work)?;

    anyhow::ensure!(outcome.passed(), "{:?}", outcome.violations);
    anyhow::ensure!(report.failures().is_empty());
    let primary = outcome
        .primary()
        .ok_or_else(|| anyhow::anyhow!("no counter"))?;
    anyhow::ensure!(primary.percentile_latency(50) == Some(3_000));
    Ok(())
}

#[test]
fn cancel_on_violation_stops_after_the_first_slow_call() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicU64::new(0));
    let report = Arc::new(ListReport::new());
    let clock = Arc::new(ManualClock::new("manual"));
    let config = ExecutionConfig {
        cancel_on_violation: true,
        clocks: vec![clock.clone() as Arc<dyn Clock>],
        ..ExecutionConfig::with_invocations(100)
    };

    let result = {
        let calls = calls.clone();
        PerfTest::new("abort", config)
            .with_requirement(PerformanceRequirement {
                max: Some(50),
                ..PerformanceRequirement::default()
            })
            .with_report(report.clone())
            .run_fn(move || {
                calls.fetch_add(1, Ordering::Relaxed);
                clock.advance(80);
                Ok(())
            })
    };

    let err = match result {
        Err(err) => err,
        Ok(outcome) => anyhow::bail!("expected an abort, got {:?}", outcome.violations),
    };
    anyhow::ensure!(err.kind() == ErrorKind::Violation);
    anyhow::ensure!(matches!(
        err,
        Error::Violation(Violation::InvocationMaxLatency { measured: 80, .. })
    ));
    anyhow::ensure!(calls.load(Ordering::Relaxed) == 1);
    // The abort and the end-of-run max check both reach the sink.
    anyhow::ensure!(report.failures().len() == 2, "{:?}", report.failures());
    Ok(())
}

#[test]
fn cancel_on_violation_aborts_a_whole_group() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new("manual"));
    let calls = Arc::new(AtomicU64::new(0));
    let config = ExecutionConfig {
        threads: 4,
        cancel_on_violation: true,
        clocks: vec![clock.clone() as Arc<dyn Clock>],
        ..ExecutionConfig::with_duration(Duration::from_secs(30))
    };

    let result = {
        let calls = calls.clone();
        PerfTest::new("group-abort", config)
            .with_requirement(PerformanceRequirement {
                max: Some(50),
                ..PerformanceRequirement::default()
            })
            .run_fn(move || {
                let n = calls.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(1));
                if n == 20 {
                    clock.advance(500);
                }
                Ok(())
            })
    };

    let err = match result {
        Err(err) => err,
        Ok(_) => anyhow::bail!("expected the group to abort"),
    };
    anyhow::ensure!(matches!(err, Error::Group { .. }), "{err:?}");
    anyhow::ensure!(err.kind() == ErrorKind::Violation);
    Ok(())
}

#[test]
fn warm_up_calls_are_not_measured() -> anyhow::Result<()> {
    let report = Arc::new(ListReport::new());
    let config = ExecutionConfig {
        warm_up: Duration::from_millis(100),
        ..ExecutionConfig::with_duration(Duration::from_millis(300))
    };

    let outcome = PerfTest::new("warm", config)
        .with_report(report.clone())
        .run_fn(|| {
            thread::sleep(Duration::from_millis(3));
            Ok(())
        })?;

    let logs = report.invocations();
    let first = logs
        .first()
        .map(|l| l.start_ms)
        .ok_or_else(|| anyhow::anyhow!("nothing was invoked"))?;
    let measured = logs.iter().filter(|l| l.start_ms >= first + 100).count() as u64;
    let samples = outcome.primary().map_or(0, |c| c.sample_count());

    anyhow::ensure!(report.started().len() == 1);
    anyhow::ensure!(measured < logs.len() as u64, "warm-up excluded nothing");
    anyhow::ensure!(samples == measured, "{samples} samples, {measured} after warm-up");
    Ok(())
}

#[test]
fn run_shorter_than_warm_up_fails() -> anyhow::Result<()> {
    let config = ExecutionConfig {
        warm_up: Duration::from_secs(10),
        ..ExecutionConfig::with_invocations(3)
    };
    match PerfTest::new("cold", config).run_fn(|| Ok(())) {
        Err(Error::WarmUpNotReached(10_000)) => Ok(()),
        other => anyhow::bail!("expected warm-up failure, got {other:?}"),
    }
}

#[test]
fn stop_tracking_twice_is_a_state_error() -> anyhow::Result<()> {
    let tracker = PerformanceTracker::new(
        invoker("twice", || Ok(())),
        ExecutionConfig::default(),
        None,
        Arc::new(ListReport::new()),
    )?;
    tracker.invoke()?;
    tracker.stop_tracking()?;

    let err = match tracker.stop_tracking() {
        Err(err) => err,
        Ok(_) => anyhow::bail!("second stop succeeded"),
    };
    anyhow::ensure!(err.kind() == ErrorKind::State);
    anyhow::ensure!(err.to_string() == "stop before start");
    Ok(())
}
