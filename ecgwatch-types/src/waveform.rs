//! Raw waveform samples.

use crate::{DecodeError, WireMessage};

/// One amplitude sample from the waveform stream.
///
/// Samples carry no timestamp or sequence number; ordering is the order of
/// arrival on the connection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveformMessage {
    /// Signal amplitude, normalised by the acquisition device.
    pub value: f64,
}

impl WaveformMessage {
    /// Create a sample message.
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl WireMessage for WaveformMessage {
    fn validate(&self) -> Result<(), DecodeError> {
        if !self.value.is_finite() {
            return Err(DecodeError::invalid("value", "must be a finite number"));
        }
        Ok(())
    }
}
