//! Beat classification for the analysis stub.

use std::fmt::Debug;

use ecgwatch_types::HeartClass;

use crate::segmenter::SEGMENT_CENTER;

/// The class and confidence assigned to one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: HeartClass,
    /// In `0.0..=1.0`.
    pub confidence: f64,
}

/// Assigns a class to a beat segment.
pub trait Classifier: Send + Sync + Debug {
    fn classify(&self, segment: &[f64]) -> Prediction;
}

/// QRS duration above which a beat is called ventricular.
const WIDE_QRS_MS: f64 = 120.0;

/// A rule-of-thumb classifier on R-wave width.
///
/// Not a trained model: it measures the width of the peak around the
/// segment centre at half its height above the segment median. Wide
/// complexes are labelled `V`, everything else `N`. Confidence grows with
/// distance from the width cut-off.
#[derive(Debug, Clone)]
pub struct MorphologyClassifier {
    sample_rate: f64,
}

impl MorphologyClassifier {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    /// Width of the central peak in milliseconds.
    pub fn peak_width_ms(&self, segment: &[f64]) -> f64 {
        let Some(&peak) = segment.get(SEGMENT_CENTER) else {
            return 0.0;
        };
        let mut sorted = segment.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];
        let half = median + (peak - median) / 2.0;

        let left = segment[..SEGMENT_CENTER]
            .iter()
            .rev()
            .take_while(|&&v| v > half)
            .count();
        let right = segment[SEGMENT_CENTER..]
            .iter()
            .take_while(|&&v| v > half)
            .count();

        (left + right) as f64 / self.sample_rate * 1000.0
    }
}

impl Classifier for MorphologyClassifier {
    fn classify(&self, segment: &[f64]) -> Prediction {
        let width = self.peak_width_ms(segment);
        let class = if width > WIDE_QRS_MS {
            HeartClass::PrematureVentricular
        } else {
            HeartClass::Normal
        };
        let margin = ((width - WIDE_QRS_MS).abs() / WIDE_QRS_MS).min(1.0);
        Prediction {
            class,
            confidence: 0.6 + 0.39 * margin,
        }
    }
}
