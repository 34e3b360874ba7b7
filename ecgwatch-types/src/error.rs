//! Decode errors for inbound stream messages.

use thiserror::Error;

/// Why an inbound message was rejected.
///
/// Consumers treat every variant the same way: the message is dropped and
/// logged, and no state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The payload is not JSON of the expected shape.
    #[error("malformed JSON: {0}")]
    Json(String),

    /// A field is present but holds a value outside its allowed domain.
    #[error("invalid field `{field}`: {reason}")]
    Invalid {
        /// Wire name of the offending field.
        field: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err.to_string())
    }
}
