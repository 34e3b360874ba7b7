//! # ecgwatch-types
//!
//! Wire schemas shared by the ECG monitor, its analysis backend and the
//! report collaborator.
//!
//! Two streams feed the monitor:
//!
//! - the **waveform stream**, one [`WaveformMessage`] per sample
//!   (`{"value": 0.42}`), nominally at 250 Hz
//! - the **classification stream**, one [`ClassificationMessage`] per beat
//!   the analysis process has segmented and labelled
//!
//! Reports leave the monitor as a [`ReportPayload`].
//!
//! ## Features
//!
//! - `serde` (default): JSON encoding and the [`WireMessage::decode`] helper
//!
//! ## Example
//!
//! ```rust
//! use ecgwatch_types::{ClassificationMessage, WireMessage};
//!
//! let text = r#"{"beat":7,"class":"N","confidence":0.93,"data":[0.1,0.9,0.2],"data_length":3}"#;
//! let msg = ClassificationMessage::decode(text).unwrap();
//! assert_eq!(msg.beat, 7);
//! assert_eq!(msg.confidence_percent(), "93.0");
//! ```

mod class;
mod classification;
mod error;
mod report;
mod waveform;

pub use class::*;
pub use classification::*;
pub use error::*;
pub use report::*;
pub use waveform::*;

/// A message carried on one of the monitor's input streams.
///
/// Parsing and validation are separate steps: a payload can be valid JSON of
/// the right shape and still be rejected by [`WireMessage::validate`].
pub trait WireMessage: Sized {
    /// Check semantic constraints that the JSON shape alone cannot express.
    fn validate(&self) -> Result<(), DecodeError>;

    /// Parse and validate a JSON text frame.
    #[cfg(feature = "serde")]
    fn decode(text: &str) -> Result<Self, DecodeError>
    where
        Self: serde::de::DeserializeOwned,
    {
        let message: Self = serde_json::from_str(text.trim())?;
        message.validate()?;
        Ok(message)
    }
}
