//! Threshold-crossing beat detection and heart-rate derivation.

use std::time::Instant;

use tracing::{debug, trace};

use super::history::{HeartRateHistory, HEART_RATE_HISTORY};
use super::intervals::{IntervalEstimator, IntervalMetrics, PlaceholderIntervals};
use super::window::DisplayWindow;

/// Amplitude the waveform must rise above to count as a beat.
pub const BEAT_THRESHOLD: f64 = 0.5;

/// Placeholder shown for any metric without a value.
pub const UNKNOWN: &str = "--";

/// A detected rising-edge crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    pub at: Instant,
}

/// What the detector reports for one detected beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatReading {
    pub event: BeatEvent,
    /// Instantaneous rate, absent for the first beat of a session.
    pub instantaneous_bpm: Option<u32>,
}

/// Heart metrics currently on display. `None` fields render as `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartMetrics {
    pub heart_rate: Option<u32>,
    pub intervals: Option<IntervalMetrics>,
}

impl HeartMetrics {
    pub fn heart_rate_text(&self) -> String {
        display(self.heart_rate)
    }

    pub fn pr_text(&self) -> String {
        display(self.intervals.map(|i| i.pr_ms))
    }

    pub fn qrs_text(&self) -> String {
        display(self.intervals.map(|i| i.qrs_ms))
    }

    pub fn qt_text(&self) -> String {
        display(self.intervals.map(|i| i.qt_ms))
    }

    pub fn is_unknown(&self) -> bool {
        self.heart_rate.is_none() && self.intervals.is_none()
    }
}

fn display(value: Option<u32>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

/// Edge-triggered beat detector.
///
/// Owns the last beat timestamp and the heart-rate history. Fed the display
/// window after every render tick that appended a sample.
#[derive(Debug)]
pub struct BeatDetector {
    threshold: f64,
    last_beat: Option<Instant>,
    history: HeartRateHistory,
    estimator: Box<dyn IntervalEstimator>,
    metrics: HeartMetrics,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(BEAT_THRESHOLD, HEART_RATE_HISTORY, Box::new(PlaceholderIntervals))
    }
}

impl BeatDetector {
    pub fn new(threshold: f64, history: usize, estimator: Box<dyn IntervalEstimator>) -> Self {
        Self {
            threshold,
            last_beat: None,
            history: HeartRateHistory::with_capacity(history),
            estimator,
            metrics: HeartMetrics::default(),
        }
    }

    /// Whether the newest window value is a rising-edge crossing.
    pub fn is_beat(&self, window: &DisplayWindow) -> bool {
        let (previous, current) = window.last_two();
        current > self.threshold && previous <= self.threshold
    }

    /// Inspect the window as of `now` and update metrics on a beat.
    pub fn process(&mut self, window: &DisplayWindow, now: Instant) -> Option<BeatReading> {
        if !self.is_beat(window) {
            return None;
        }

        let instantaneous_bpm = self.last_beat.and_then(|last| {
            let interval_ms = now.checked_duration_since(last)?.as_secs_f64() * 1000.0;
            if interval_ms <= 0.0 {
                return None;
            }
            Some((60_000.0 / interval_ms).round() as u32)
        });

        if let Some(bpm) = instantaneous_bpm {
            self.history.record(bpm);
            self.metrics = HeartMetrics {
                heart_rate: self.history.average(),
                intervals: Some(self.estimator.estimate(window)),
            };
            debug!(bpm, average = ?self.metrics.heart_rate, "Beat detected");
        } else {
            trace!("Beat detected, no previous beat to measure against");
        }

        self.last_beat = Some(now);

        Some(BeatReading {
            event: BeatEvent { at: now },
            instantaneous_bpm,
        })
    }

    /// Forget the last beat, the history and the published metrics.
    pub fn reset(&mut self) {
        self.last_beat = None;
        self.history.clear();
        self.metrics = HeartMetrics::default();
    }

    pub fn metrics(&self) -> HeartMetrics {
        self.metrics
    }

    pub fn history(&self) -> &HeartRateHistory {
        &self.history
    }

    pub fn last_beat(&self) -> Option<Instant> {
        self.last_beat
    }

    pub fn estimator_label(&self) -> &'static str {
        self.estimator.label()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::data::intervals::MidpointIntervals;

    fn detector() -> BeatDetector {
        BeatDetector::new(BEAT_THRESHOLD, HEART_RATE_HISTORY, Box::new(MidpointIntervals))
    }

    fn window_ending(prev: f64, last: f64) -> DisplayWindow {
        let mut window = DisplayWindow::default();
        window.push(prev);
        window.push(last);
        window
    }

    #[test]
    fn test_edge_triggered() {
        let d = detector();
        assert!(d.is_beat(&window_ending(0.3, 0.6)));
        assert!(!d.is_beat(&window_ending(0.6, 0.6)));
        assert!(!d.is_beat(&window_ending(0.6, 0.3)));
        // Exactly at the threshold counts as below.
        assert!(d.is_beat(&window_ending(0.5, 0.51)));
        assert!(!d.is_beat(&window_ending(0.4, 0.5)));
    }

    #[test]
    fn test_first_beat_sets_timestamp_only() {
        let mut d = detector();
        let t0 = Instant::now();

        let reading = d.process(&window_ending(0.1, 0.9), t0).unwrap();
        assert_eq!(reading.instantaneous_bpm, None);
        assert_eq!(d.last_beat(), Some(t0));
        assert!(d.history().is_empty());
        assert!(d.metrics().is_unknown());
    }

    #[test]
    fn test_second_beat_publishes_rate() {
        let mut d = detector();
        let t0 = Instant::now();
        let crossing = window_ending(0.1, 0.9);

        d.process(&crossing, t0);
        let reading = d.process(&crossing, t0 + Duration::from_millis(750)).unwrap();

        assert_eq!(reading.instantaneous_bpm, Some(80));
        let metrics = d.metrics();
        assert_eq!(metrics.heart_rate, Some(80));
        assert_eq!(metrics.pr_text(), "150");
        assert_eq!(metrics.qrs_text(), "90");
        assert_eq!(metrics.qt_text(), "400");
    }

    #[test]
    fn test_rolling_average_over_beats() {
        let mut d = detector();
        let crossing = window_ending(0.1, 0.9);
        let mut now = Instant::now();
        d.process(&crossing, now);

        // 1000ms -> 60, 500ms -> 120
        for interval in [1000, 500] {
            now += Duration::from_millis(interval);
            d.process(&crossing, now);
        }
        assert_eq!(d.history().values(), vec![60, 120]);
        assert_eq!(d.metrics().heart_rate, Some(90));
    }

    #[test]
    fn test_same_instant_records_no_rate() {
        let mut d = detector();
        let t0 = Instant::now();
        let crossing = window_ending(0.1, 0.9);
        d.process(&crossing, t0);
        let reading = d.process(&crossing, t0).unwrap();
        assert_eq!(reading.instantaneous_bpm, None);
        assert!(d.history().is_empty());
    }

    #[test]
    fn test_no_beat_leaves_state() {
        let mut d = detector();
        assert!(d.process(&window_ending(0.6, 0.7), Instant::now()).is_none());
        assert_eq!(d.last_beat(), None);
    }

    #[test]
    fn test_reset() {
        let mut d = detector();
        let crossing = window_ending(0.1, 0.9);
        let t0 = Instant::now();
        d.process(&crossing, t0);
        d.process(&crossing, t0 + Duration::from_secs(1));
        assert!(!d.metrics().is_unknown());

        d.reset();
        assert!(d.metrics().is_unknown());
        assert_eq!(d.metrics().heart_rate_text(), UNKNOWN);
        assert_eq!(d.last_beat(), None);
        assert!(d.history().is_empty());
    }
}
