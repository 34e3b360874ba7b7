//! Fixed-length beat windowing for the analysis stub.

use std::collections::VecDeque;

/// Samples in one beat segment.
pub const SEGMENT_LEN: usize = 200;

/// Index inside a full segment that must carry the R-wave.
pub const SEGMENT_CENTER: usize = 100;

/// Amplitude the centre sample must exceed.
pub const SEGMENT_THRESHOLD: f64 = 0.55;

/// A segment cut around one beat.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSegment {
    /// Running beat counter, starting at 1.
    pub beat: u64,
    pub samples: Vec<f64>,
}

/// Cuts the sample stream into beat-centred segments.
///
/// Keeps the last [`SEGMENT_LEN`] samples. Once the window is full and the
/// sample at [`SEGMENT_CENTER`] is above the threshold, the window is emitted
/// as a segment and cleared, so consecutive segments never overlap.
#[derive(Debug, Clone)]
pub struct BeatSegmenter {
    window: VecDeque<f64>,
    threshold: f64,
    beats: u64,
}

impl BeatSegmenter {
    pub fn new() -> Self {
        Self::with_threshold(SEGMENT_THRESHOLD)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(SEGMENT_LEN),
            threshold,
            beats: 0,
        }
    }

    /// Feed one sample. Returns a segment when a beat completes.
    pub fn push(&mut self, sample: f64) -> Option<BeatSegment> {
        if self.window.len() == SEGMENT_LEN {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        if self.window.len() < SEGMENT_LEN || self.window[SEGMENT_CENTER] <= self.threshold {
            return None;
        }

        self.beats += 1;
        let samples: Vec<f64> = self.window.drain(..).collect();
        Some(BeatSegment {
            beat: self.beats,
            samples,
        })
    }

    /// Beats emitted so far.
    pub fn beats(&self) -> u64 {
        self.beats
    }

    /// Samples currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for BeatSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticEcg;

    #[test]
    fn test_needs_full_window() {
        let mut seg = BeatSegmenter::new();
        for _ in 0..SEGMENT_LEN - 1 {
            assert!(seg.push(1.0).is_none());
        }
        let beat = seg.push(1.0).unwrap();
        assert_eq!(beat.beat, 1);
        assert_eq!(beat.samples.len(), SEGMENT_LEN);
        assert!(seg.is_empty());
    }

    #[test]
    fn test_center_must_exceed_threshold() {
        let mut seg = BeatSegmenter::new();
        for _ in 0..SEGMENT_LEN * 3 {
            assert!(seg.push(SEGMENT_THRESHOLD).is_none());
        }
        assert_eq!(seg.len(), SEGMENT_LEN);
        assert_eq!(seg.beats(), 0);
    }

    #[test]
    fn test_peak_lands_at_center() {
        let mut seg = BeatSegmenter::new();
        let mut emitted = None;
        for i in 0..400 {
            let v = if i == 150 { 0.9 } else { 0.1 };
            if let Some(beat) = seg.push(v) {
                emitted = Some((i, beat));
                break;
            }
        }
        let (at, beat) = emitted.unwrap();
        assert_eq!(at, 150 + (SEGMENT_LEN - 1 - SEGMENT_CENTER));
        assert_eq!(beat.samples[SEGMENT_CENTER], 0.9);
    }

    #[test]
    fn test_one_segment_per_synthetic_beat() {
        let mut seg = BeatSegmenter::new();
        // 20 seconds at 72 BPM
        let segments: Vec<BeatSegment> = SyntheticEcg::default()
            .take(5000)
            .filter_map(|v| seg.push(v))
            .collect();
        assert!(segments.len() >= 22 && segments.len() <= 24, "{}", segments.len());
        let numbers: Vec<u64> = segments.iter().map(|s| s.beat).collect();
        assert_eq!(numbers, (1..=segments.len() as u64).collect::<Vec<_>>());
    }
}
