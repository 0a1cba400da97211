use rand::Rng;

use crate::error::{Error, Result};

/// Wait timer kind (the string form used by configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WaitTimerKind {
    None,
    Constant,
    Random,
    Cumulated,
}

/// Pacing policy: the idle time a runner inserts after each invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitTimer {
    #[default]
    None,
    Constant {
        millis: u64,
    },
    /// Uniform draw in `[min, max]`.
    Random {
        min: u64,
        max: u64,
    },
    /// Uniform draw in `[min, max]`, with calibrated defaults for missing bounds.
    Cumulated {
        min: u64,
        max: u64,
    },
}

impl WaitTimer {
    /// Builds a timer from its kind and numeric parameters.
    ///
    /// - `none`: parameters are ignored.
    /// - `constant`: `[millis]`.
    /// - `random`: `[min, max]` with `max >= min`.
    /// - `cumulated`: `[]` → `[500, 1500]`, `[p0]` → `[p0, p0 + 1000]`,
    ///   `[p0, p1, ..]` → `[p0, p1]` (extra parameters are ignored).
    pub fn init(kind: WaitTimerKind, params: &[f64]) -> Result<Self> {
        let millis = params
            .iter()
            .map(|p| to_millis(kind, *p))
            .collect::<Result<Vec<u64>>>()?;

        match kind {
            WaitTimerKind::None => Ok(WaitTimer::None),
            WaitTimerKind::Constant => match millis.as_slice() {
                [millis, ..] => Ok(WaitTimer::Constant { millis: *millis }),
                [] => Err(invalid(kind, "expected 1 parameter, got 0")),
            },
            WaitTimerKind::Random => match millis.as_slice() {
                [min, max, ..] => {
                    ensure_ordered(kind, *min, *max)?;
                    Ok(WaitTimer::Random {
                        min: *min,
                        max: *max,
                    })
                }
                other => Err(invalid(
                    kind,
                    &format!("expected 2 parameters, got {}", other.len()),
                )),
            },
            WaitTimerKind::Cumulated => match millis.as_slice() {
                [] => Ok(WaitTimer::Cumulated {
                    min: 500,
                    max: 1500,
                }),
                [min] => Ok(WaitTimer::Cumulated {
                    min: *min,
                    max: min.saturating_add(1000),
                }),
                [min, max, ..] => {
                    ensure_ordered(kind, *min, *max)?;
                    Ok(WaitTimer::Cumulated {
                        min: *min,
                        max: *max,
                    })
                }
            },
        }
    }

    /// Parses the kind name, then behaves like [`init`](Self::init).
    pub fn parse(kind: &str, params: &[f64]) -> Result<Self> {
        let kind: WaitTimerKind = kind
            .parse()
            .map_err(|_| Error::UnknownWaitTimer(kind.to_string()))?;
        Self::init(kind, params)
    }

    pub fn kind(&self) -> WaitTimerKind {
        match self {
            WaitTimer::None => WaitTimerKind::None,
            WaitTimer::Constant { .. } => WaitTimerKind::Constant,
            WaitTimer::Random { .. } => WaitTimerKind::Random,
            WaitTimer::Cumulated { .. } => WaitTimerKind::Cumulated,
        }
    }

    /// Delay to apply after invocation number `invocation` (0-based, per runner).
    pub fn next_wait_millis(&self, _invocation: u64) -> u64 {
        match *self {
            WaitTimer::None => 0,
            WaitTimer::Constant { millis } => millis,
            WaitTimer::Random { min, max } | WaitTimer::Cumulated { min, max } => {
                rand::thread_rng().gen_range(min..=max)
            }
        }
    }
}

fn to_millis(kind: WaitTimerKind, param: f64) -> Result<u64> {
    if !param.is_finite() || param < 0.0 {
        return Err(invalid(
            kind,
            &format!("`{param}` is not a non-negative number"),
        ));
    }
    Ok(param as u64)
}

fn ensure_ordered(kind: WaitTimerKind, min: u64, max: u64) -> Result<()> {
    if max < min {
        return Err(invalid(
            kind,
            &format!("upper bound {max} is below lower bound {min}"),
        ));
    }
    Ok(())
}

fn invalid(kind: WaitTimerKind, reason: &str) -> Error {
    Error::InvalidTimerParams {
        timer: kind.to_string(),
        reason: reason.to_string(),
    }
}
