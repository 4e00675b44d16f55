//! Time-step negotiation.
//!
//! Requested times are resolved against a producer's sorted `TIME_STEPS` so
//! that data is only ever produced for one of its steps. Producers without
//! steps are continuous; their requests pass through, clamped into
//! `TIME_RANGE` when one is advertised.
//!
//! A request below the first step or above the last one resolves to that
//! step. Every such clamp is reported through [`Snapped::clamped`].

use core::fmt;
use core::str::FromStr;

/// How a request between two steps is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TimeSnap {
    /// Closest step. Ties go to the earlier step.
    #[default]
    Nearest,
    /// Exact match, otherwise the closest step below.
    NextBelowOrEqual,
    /// Exact match, otherwise the closest step above.
    NextAboveOrEqual,
}

impl TimeSnap {
    /// Lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            TimeSnap::Nearest => "nearest",
            TimeSnap::NextBelowOrEqual => "below",
            TimeSnap::NextAboveOrEqual => "above",
        }
    }
}

impl fmt::Display for TimeSnap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unknown snap-mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeSnapError;

impl fmt::Display for ParseTimeSnapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected one of: nearest, below, above")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseTimeSnapError {}

impl FromStr for TimeSnap {
    type Err = ParseTimeSnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("nearest") {
            Ok(TimeSnap::Nearest)
        } else if s.eq_ignore_ascii_case("below") || s.eq_ignore_ascii_case("next-below-or-equal") {
            Ok(TimeSnap::NextBelowOrEqual)
        } else if s.eq_ignore_ascii_case("above") || s.eq_ignore_ascii_case("next-above-or-equal") {
            Ok(TimeSnap::NextAboveOrEqual)
        } else {
            Err(ParseTimeSnapError)
        }
    }
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapped {
    /// Resolved time.
    pub time: f64,
    /// The request lay outside the available steps or range.
    pub clamped: bool,
}

/// Resolves `requested` against `steps`. See [`snap`].
pub fn resolve(requested: f64, steps: &[f64], mode: TimeSnap) -> f64 {
    snap(requested, steps, mode).time
}

/// Resolves `requested` against sorted `steps`.
///
/// An empty `steps` returns `requested` unchanged.
pub fn snap(requested: f64, steps: &[f64], mode: TimeSnap) -> Snapped {
    let (Some(&first), Some(&last)) = (steps.first(), steps.last()) else {
        return Snapped {
            time: requested,
            clamped: false,
        };
    };
    if requested.is_nan() {
        return Snapped {
            time: first,
            clamped: true,
        };
    }
    let clamped = requested < first || requested > last;
    let time = match mode {
        TimeSnap::Nearest => {
            let mut best = first;
            let mut best_dist = libm::fabs(requested - first);
            for &step in &steps[1..] {
                let dist = libm::fabs(requested - step);
                if dist < best_dist {
                    best = step;
                    best_dist = dist;
                }
            }
            best
        }
        TimeSnap::NextBelowOrEqual => {
            if let Some(&exact) = steps.iter().find(|&&s| s == requested) {
                exact
            } else {
                steps
                    .iter()
                    .rev()
                    .find(|&&s| s < requested)
                    .copied()
                    .unwrap_or(first)
            }
        }
        TimeSnap::NextAboveOrEqual => {
            if let Some(&exact) = steps.iter().find(|&&s| s == requested) {
                exact
            } else {
                steps
                    .iter()
                    .find(|&&s| s > requested)
                    .copied()
                    .unwrap_or(last)
            }
        }
    };
    Snapped { time, clamped }
}

/// Clamps a continuous-time request into `[range[0], range[1]]`.
pub fn clamp_to_range(requested: f64, range: [f64; 2]) -> Snapped {
    let [lo, hi] = range;
    if requested.is_nan() {
        return Snapped {
            time: lo,
            clamped: true,
        };
    }
    if requested < lo {
        Snapped {
            time: lo,
            clamped: true,
        }
    } else if requested > hi {
        Snapped {
            time: hi,
            clamped: true,
        }
    } else {
        Snapped {
            time: requested,
            clamped: false,
        }
    }
}

/// Result of [`TimeNegotiator::negotiate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Time to produce, or `None` when nothing was requested and nothing is
    /// forced.
    pub time: Option<f64>,
    /// The time came from the forced override.
    pub forced: bool,
    /// Cached results built for a previous forcing state are stale.
    pub invalidated: bool,
    /// The request was clamped into the available steps.
    pub clamped: bool,
}

/// Per-node time negotiation with an optional forced override.
///
/// Entering forced mode, changing the forced value, or leaving forced mode
/// each invalidate exactly once, on the next [`negotiate`](Self::negotiate).
#[derive(Debug, Clone, Default)]
pub struct TimeNegotiator {
    mode: TimeSnap,
    forced: Option<f64>,
    acknowledged: Option<f64>,
}

impl TimeNegotiator {
    /// Creates a negotiator using `mode`, with no forced time.
    pub fn new(mode: TimeSnap) -> Self {
        Self {
            mode,
            forced: None,
            acknowledged: None,
        }
    }

    /// Snap mode.
    pub fn mode(&self) -> TimeSnap {
        self.mode
    }

    /// Changes the snap mode.
    pub fn set_mode(&mut self, mode: TimeSnap) {
        self.mode = mode;
    }

    /// Forces every resolution to `time`.
    pub fn force(&mut self, time: f64) {
        self.forced = Some(time);
    }

    /// Returns to following requests.
    pub fn release(&mut self) {
        self.forced = None;
    }

    /// Currently forced time.
    pub fn forced(&self) -> Option<f64> {
        self.forced
    }

    /// Returns `true` if the next negotiation will report invalidation.
    pub fn is_invalidation_pending(&self) -> bool {
        !same_time(self.forced, self.acknowledged)
    }

    /// Resolves `requested` against `steps`, or returns the forced time.
    pub fn negotiate(&mut self, requested: Option<f64>, steps: &[f64]) -> Resolution {
        let invalidated = self.is_invalidation_pending();
        self.acknowledged = self.forced;
        if let Some(t) = self.forced {
            return Resolution {
                time: Some(t),
                forced: true,
                invalidated,
                clamped: false,
            };
        }
        match requested {
            Some(t) => {
                let snapped = snap(t, steps, self.mode);
                Resolution {
                    time: Some(snapped.time),
                    forced: false,
                    invalidated,
                    clamped: snapped.clamped,
                }
            }
            None => Resolution {
                time: None,
                forced: false,
                invalidated,
                clamped: false,
            },
        }
    }
}

fn same_time(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
        (None, None) => true,
        _ => false,
    }
}
