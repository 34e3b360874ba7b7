//! Rolling heart-rate history for averaging and the trend sparkline.

use std::collections::VecDeque;

/// Number of instantaneous rates averaged into the displayed heart rate.
pub const HEART_RATE_HISTORY: usize = 5;

/// The most recent instantaneous heart rates, oldest first.
///
/// Holds at most `capacity` readings; recording past that evicts the oldest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartRateHistory {
    readings: VecDeque<u32>,
    capacity: usize,
}

impl Default for HeartRateHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartRateHistory {
    /// Create a history of [`HEART_RATE_HISTORY`] readings.
    pub fn new() -> Self {
        Self::with_capacity(HEART_RATE_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Record an instantaneous rate in beats per minute.
    pub fn record(&mut self, bpm: u32) {
        self.readings.push_back(bpm);
        if self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    /// Rounded mean of the recorded rates, or `None` when empty.
    pub fn average(&self) -> Option<u32> {
        if self.readings.is_empty() {
            return None;
        }
        let sum: u64 = self.readings.iter().map(|&r| r as u64).sum();
        Some((sum as f64 / self.readings.len() as f64).round() as u32)
    }

    pub fn values(&self) -> Vec<u32> {
        self.readings.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Readings normalised to 0-7 for an 8-level sparkline.
    ///
    /// Returns an empty Vec with fewer than two readings.
    pub fn sparkline(&self) -> Vec<u8> {
        sparkline_levels(&self.values())
    }
}

/// Normalise values to 0-7 between their own min and max.
pub fn sparkline_levels(values: &[u32]) -> Vec<u8> {
    if values.len() < 2 {
        return Vec::new();
    }

    let max = values.iter().copied().max().unwrap_or(0);
    let min = values.iter().copied().min().unwrap_or(0);
    let range = (max - min).max(1) as f64;

    values
        .iter()
        .map(|&v| {
            let normalized = ((v - min) as f64 / range * 7.0) as u8;
            normalized.min(7)
        })
        .collect()
}
