//! Fixed-length sliding window of displayed amplitudes.

use std::collections::VecDeque;

use super::buffer::MAX_DATA_POINTS;

/// What the waveform chart currently shows.
///
/// The window always holds exactly `len` values. Each [`push`](Self::push)
/// evicts the oldest value and appends the new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayWindow {
    values: VecDeque<f64>,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        Self::new(MAX_DATA_POINTS)
    }
}

impl DisplayWindow {
    /// Create a window of `len` zeros (at least two, so a crossing can be seen).
    pub fn new(len: usize) -> Self {
        let len = len.max(2);
        Self {
            values: std::iter::repeat(0.0).take(len).collect(),
        }
    }

    /// Slide the window forward by one value.
    pub fn push(&mut self, value: f64) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    /// The newest value and the one before it, `(v[n-1], v[n])`.
    pub fn last_two(&self) -> (f64, f64) {
        let n = self.values.len();
        (self.values[n - 2], self.values[n - 1])
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fill the window with zeros again.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> + '_ {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}
