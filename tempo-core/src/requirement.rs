use std::fmt;
use std::str::FromStr;

use tempo_metrics::LatencyCounter;

use crate::error::{Error, Result};

/// `percentile`% of the invocations must finish within `max_millis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentileRequirement {
    pub percentile: u8,
    pub max_millis: u64,
}

impl FromStr for PercentileRequirement {
    type Err = Error;

    /// Parses `<percentile>:<millis>`, e.g. `90:200`.
    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidPercentile(raw.to_string());
        let (p, millis) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let percentile: u8 = p.trim().parse().map_err(|_| invalid())?;
        if percentile > 100 {
            return Err(invalid());
        }
        let max_millis: u64 = millis.trim().parse().map_err(|_| invalid())?;
        Ok(Self {
            percentile,
            max_millis,
        })
    }
}

/// Parses a comma separated list such as `90:200, 95:500`.
pub fn parse_percentiles(raw: &str) -> Result<Vec<PercentileRequirement>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Thresholds the measured run must satisfy. `None` means "not checked".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceRequirement {
    /// Maximum latency of any single invocation (ms).
    pub max: Option<u64>,
    /// Maximum average latency (ms).
    pub average: Option<u64>,
    /// Maximum length of the measurement window (ms).
    pub total_time: Option<u64>,
    /// Minimum calls per second.
    pub throughput: Option<u64>,
    /// Checked in order.
    pub percentiles: Vec<PercentileRequirement>,
}

impl PerformanceRequirement {
    pub fn is_empty(&self) -> bool {
        self.max.is_none()
            && self.average.is_none()
            && self.total_time.is_none()
            && self.throughput.is_none()
            && self.percentiles.is_empty()
    }

    /// Checks a single invocation against `max`.
    pub fn check_latency(&self, id: &str, latency_ms: u64) -> Option<Violation> {
        let required = self.max?;
        (latency_ms > required).then(|| Violation::InvocationMaxLatency {
            id: id.to_string(),
            required,
            measured: latency_ms,
        })
    }

    /// Evaluates every threshold against `counter` and returns all breaches,
    /// in the order max, total time, throughput, average, percentiles.
    pub fn evaluate(&self, id: &str, counter: &LatencyCounter) -> Vec<Violation> {
        let mut out = Vec::new();
        let elapsed_ms = counter.duration().as_millis() as u64;

        if let Some(required) = self.max
            && let Some(measured) = counter.max_latency()
            && measured > required
        {
            out.push(Violation::MaxLatency {
                id: id.to_string(),
                required,
                measured,
            });
        }

        if let Some(required) = self.total_time
            && elapsed_ms > required
        {
            out.push(Violation::TotalTime {
                id: id.to_string(),
                required,
                measured: elapsed_ms,
            });
        }

        if let Some(required) = self.throughput
            && required > 0
            && elapsed_ms > 0
        {
            let measured = counter.sample_count().saturating_mul(1000) / elapsed_ms;
            if measured < required {
                out.push(Violation::Throughput {
                    id: id.to_string(),
                    required,
                    measured,
                });
            }
        }

        if let Some(required) = self.average
            && let Some(measured) = counter.average_latency()
            && measured > required as f64
        {
            out.push(Violation::AverageLatency {
                id: id.to_string(),
                required,
                measured,
            });
        }

        for req in &self.percentiles {
            if let Some(measured) = counter.percentile_latency(req.percentile)
                && measured > req.max_millis
            {
                out.push(Violation::Percentile {
                    id: id.to_string(),
                    percentile: req.percentile,
                    required: req.max_millis,
                    measured,
                });
            }
        }

        out
    }
}

/// One breached threshold with the value that broke it.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// A single invocation exceeded `max` while cancel-on-violation was on.
    InvocationMaxLatency {
        id: String,
        required: u64,
        measured: u64,
    },
    MaxLatency {
        id: String,
        required: u64,
        measured: u64,
    },
    TotalTime {
        id: String,
        required: u64,
        measured: u64,
    },
    Throughput {
        id: String,
        required: u64,
        measured: u64,
    },
    AverageLatency {
        id: String,
        required: u64,
        measured: f64,
    },
    Percentile {
        id: String,
        percentile: u8,
        required: u64,
        measured: u64,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InvocationMaxLatency {
                id,
                required,
                measured,
            } => write!(
                f,
                "`{id}` exceeded time limit of {required} ms running {measured} ms"
            ),
            Violation::MaxLatency {
                id,
                required,
                measured,
            } => write!(
                f,
                "the maximum latency of {required} ms was exceeded by `{id}`, measured: {measured} ms"
            ),
            Violation::TotalTime {
                id,
                required,
                measured,
            } => write!(
                f,
                "test run `{id}` exceeded timeout of {required} ms running {measured} ms"
            ),
            Violation::Throughput {
                id,
                required,
                measured,
            } => write!(
                f,
                "`{id}` had a throughput of only {measured} calls per second, required: {required} calls per second"
            ),
            Violation::AverageLatency {
                id,
                required,
                measured,
            } => write!(
                f,
                "average execution time of `{id}` exceeded the requirement of {required} ms, measured {measured} ms"
            ),
            Violation::Percentile {
                id,
                percentile,
                required,
                measured,
            } => write!(
                f,
                "{percentile}-percentile of `{id}` exceeded the requirement of {required} ms, measured {measured} ms"
            ),
        }
    }
}

impl Violation {
    pub fn id(&self) -> &str {
        match self {
            Violation::InvocationMaxLatency { id, .. }
            | Violation::MaxLatency { id, .. }
            | Violation::TotalTime { id, .. }
            | Violation::Throughput { id, .. }
            | Violation::AverageLatency { id, .. }
            | Violation::Percentile { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempo_metrics::DEFAULT_MAX_TRACKED_MILLIS;

    fn counter_with(samples: &[u64]) -> LatencyCounter {
        let counter = LatencyCounter::new("t", "system", DEFAULT_MAX_TRACKED_MILLIS);
        for s in samples {
            counter.add_sample(*s);
        }
        counter
    }

    #[test]
    fn single_slow_sample_breaks_max_once() {
        let req = PerformanceRequirement {
            max: Some(100),
            ..PerformanceRequirement::default()
        };

        let v = req.evaluate("t", &counter_with(&[150]));
        assert_eq!(
            v,
            vec![Violation::MaxLatency {
                id: "t".to_string(),
                required: 100,
                measured: 150,
            }]
        );

        assert!(req.evaluate("t", &counter_with(&[10, 100, 99])).is_empty());
    }

    #[test]
    fn every_breach_is_reported_in_order() {
        let req = PerformanceRequirement {
            max: Some(10),
            average: Some(5),
            total_time: None,
            throughput: None,
            percentiles: vec![
                PercentileRequirement {
                    percentile: 50,
                    max_millis: 100,
                },
                PercentileRequirement {
                    percentile: 90,
                    max_millis: 15,
                },
            ],
        };

        let v = req.evaluate("t", &counter_with(&[1, 2, 3, 4, 5, 6, 7, 8, 20, 30]));
        assert_eq!(v.len(), 3);
        assert!(matches!(v[0], Violation::MaxLatency { measured: 30, .. }));
        assert!(
            matches!(v[1], Violation::AverageLatency { measured, .. } if (measured - 8.6).abs() < 1e-9)
        );
        assert!(matches!(
            v[2],
            Violation::Percentile {
                percentile: 90,
                measured: 20,
                ..
            }
        ));
    }

    #[test]
    fn throughput_uses_truncating_division() {
        let counter = counter_with(&[1; 3]);
        counter.start();
        std::thread::sleep(Duration::from_millis(20));
        if let Err(e) = counter.stop() {
            panic!("{e}");
        }
        let elapsed = counter.duration().as_millis() as u64;
        let measured = 3_000 / elapsed;

        let passing = PerformanceRequirement {
            throughput: Some(measured),
            ..PerformanceRequirement::default()
        };
        assert!(passing.evaluate("t", &counter).is_empty());

        let failing = PerformanceRequirement {
            throughput: Some(measured + 1),
            total_time: Some(1),
            ..PerformanceRequirement::default()
        };
        let v = failing.evaluate("t", &counter);
        assert_eq!(v.len(), 2);
        assert!(matches!(v[0], Violation::TotalTime { required: 1, .. }));
        assert!(matches!(v[1], Violation::Throughput { measured: m, .. } if m == measured));
    }

    #[test]
    fn empty_counter_breaks_nothing_but_total_time() {
        let req = PerformanceRequirement {
            max: Some(1),
            average: Some(1),
            percentiles: vec![PercentileRequirement {
                percentile: 99,
                max_millis: 1,
            }],
            ..PerformanceRequirement::default()
        };
        assert!(req.evaluate("t", &counter_with(&[])).is_empty());
    }

    #[test]
    fn check_latency_only_when_max_is_set() {
        let req = PerformanceRequirement::default();
        assert!(req.is_empty());
        assert_eq!(req.check_latency("t", 1_000), None);

        let req = PerformanceRequirement {
            max: Some(50),
            ..PerformanceRequirement::default()
        };
        assert_eq!(req.check_latency("t", 50), None);
        assert!(matches!(
            req.check_latency("t", 80),
            Some(Violation::InvocationMaxLatency { measured: 80, .. })
        ));
    }

    #[test]
    fn parse_percentile_list() {
        let v = parse_percentiles(" 90:200, 95:500 ,").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            v,
            vec![
                PercentileRequirement {
                    percentile: 90,
                    max_millis: 200
                },
                PercentileRequirement {
                    percentile: 95,
                    max_millis: 500
                },
            ]
        );

        for bad in ["90", "101:5", "x:5", "90:-1"] {
            assert!(
                matches!(bad.parse::<PercentileRequirement>(), Err(Error::InvalidPercentile(s)) if s == bad),
                "{bad}"
            );
        }
    }
}
