//! PR / QRS / QT interval estimation.
//!
//! Neither estimator here measures anything. [`PlaceholderIntervals`] draws
//! plausible values at random for display; [`MidpointIntervals`] returns fixed
//! mid-range values. Real fiducial-point measurement would plug in through
//! [`IntervalEstimator`].

use rand::Rng;
use serde::Deserialize;

use super::window::DisplayWindow;

/// Derived cardiac intervals in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalMetrics {
    pub pr_ms: u32,
    pub qrs_ms: u32,
    pub qt_ms: u32,
}

/// Produces interval metrics each time the detector publishes a heart rate.
pub trait IntervalEstimator: Send + std::fmt::Debug {
    fn estimate(&mut self, window: &DisplayWindow) -> IntervalMetrics;

    /// Short name shown next to the values so nobody mistakes them for a
    /// measurement.
    fn label(&self) -> &'static str;
}

/// Placeholder estimator: uniform draws from PR 140-160, QRS 80-100,
/// QT 380-420 ms. Not a clinical measurement.
#[derive(Debug, Default)]
pub struct PlaceholderIntervals;

impl IntervalEstimator for PlaceholderIntervals {
    fn estimate(&mut self, _window: &DisplayWindow) -> IntervalMetrics {
        let mut rng = rand::thread_rng();
        IntervalMetrics {
            pr_ms: rng.gen_range(140..=160),
            qrs_ms: rng.gen_range(80..=100),
            qt_ms: rng.gen_range(380..=420),
        }
    }

    fn label(&self) -> &'static str {
        "placeholder"
    }
}

/// Deterministic estimator returning the midpoint of each placeholder range.
#[derive(Debug, Default)]
pub struct MidpointIntervals;

impl IntervalEstimator for MidpointIntervals {
    fn estimate(&mut self, _window: &DisplayWindow) -> IntervalMetrics {
        IntervalMetrics {
            pr_ms: 150,
            qrs_ms: 90,
            qt_ms: 400,
        }
    }

    fn label(&self) -> &'static str {
        "midpoint"
    }
}

/// Which estimator a session uses, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalMode {
    #[default]
    Placeholder,
    Midpoint,
}

impl IntervalMode {
    pub fn build(self) -> Box<dyn IntervalEstimator> {
        match self {
            IntervalMode::Placeholder => Box::new(PlaceholderIntervals),
            IntervalMode::Midpoint => Box::new(MidpointIntervals),
        }
    }
}
