//! Beat classification messages.

use crate::{DecodeError, HeartClass, WireMessage};

/// One classified beat from the analysis stream.
///
/// The analysis process segments the waveform around each detected R-wave,
/// classifies the segment and publishes the result together with the
/// segment samples it classified.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassificationMessage {
    /// Running beat counter assigned by the analysis process.
    pub beat: u64,

    /// Class label, normally one of the [`HeartClass`] codes.
    ///
    /// Kept as a string so that labels from newer models still display.
    pub class: String,

    /// Model confidence in `[0, 1]`.
    pub confidence: f64,

    /// The classified waveform segment.
    pub data: Vec<f64>,

    /// Number of samples in `data`.
    pub data_length: usize,
}

impl ClassificationMessage {
    /// Build a message from a segment, filling in `data_length`.
    pub fn new(beat: u64, class: impl Into<String>, confidence: f64, data: Vec<f64>) -> Self {
        let data_length = data.len();
        Self {
            beat,
            class: class.into(),
            confidence,
            data,
            data_length,
        }
    }

    /// The label parsed as a known class, if it is one.
    pub fn heart_class(&self) -> Option<HeartClass> {
        HeartClass::from_label(&self.class)
    }

    /// Confidence as a percentage with one decimal place (`"87.5"`).
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}", self.confidence * 100.0)
    }
}

impl WireMessage for ClassificationMessage {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.class.trim().is_empty() {
            return Err(DecodeError::invalid("class", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DecodeError::invalid(
                "confidence",
                format!("{} is outside [0, 1]", self.confidence),
            ));
        }
        if self.data_length != self.data.len() {
            return Err(DecodeError::invalid(
                "data_length",
                format!("{} does not match {} samples", self.data_length, self.data.len()),
            ));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(DecodeError::invalid("data", "samples must be finite"));
        }
        Ok(())
    }
}
