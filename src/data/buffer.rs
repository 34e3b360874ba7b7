//! Bounded FIFO for raw waveform samples awaiting the next render tick.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Number of samples held between ticks and shown in the display window.
pub const MAX_DATA_POINTS: usize = 500;

/// Bounded FIFO of waveform samples.
///
/// Pushing past capacity discards the oldest samples, so the buffer always
/// holds the most recent `capacity` values in arrival order.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    /// Create a buffer holding [`MAX_DATA_POINTS`] samples.
    pub fn new() -> Self {
        Self::with_capacity(MAX_DATA_POINTS)
    }

    /// Create a buffer with a custom capacity (at least one sample).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting from the front while over capacity.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Remove and return every buffered sample, oldest first.
    ///
    /// An empty buffer drains to an empty `Vec`.
    pub fn drain_all(&mut self) -> Vec<f64> {
        self.samples.drain(..).collect()
    }

    /// The most recently pushed sample still buffered.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A [`SampleBuffer`] shared between the stream task that fills it and the
/// render task that drains it.
///
/// Every operation takes the lock for its whole duration, so a drain never
/// observes a half-applied push.
#[derive(Debug, Clone, Default)]
pub struct SharedSampleBuffer {
    inner: Arc<Mutex<SampleBuffer>>,
}

impl SharedSampleBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SampleBuffer::with_capacity(capacity))),
        }
    }

    pub fn push(&self, sample: f64) {
        self.inner.lock().push(sample);
    }

    pub fn drain_all(&self) -> Vec<f64> {
        self.inner.lock().drain_all()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
