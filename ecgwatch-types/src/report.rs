//! Report payload handed to the report collaborator.

use crate::HeartClass;

/// Review status of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReportStatus {
    /// Awaiting review. New reports start here.
    #[default]
    Pending,
    /// Reviewed and closed.
    Completed,
}

/// Heart metrics captured at the moment the report was generated.
///
/// `None` means the monitor had no value to show (the "--" placeholder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ReportMetrics {
    /// Rolling average heart rate in beats per minute.
    pub heart_rate_bpm: Option<u32>,
    /// PR interval in milliseconds.
    pub pr_interval_ms: Option<u32>,
    /// QRS duration in milliseconds.
    pub qrs_duration_ms: Option<u32>,
    /// QT interval in milliseconds.
    pub qt_interval_ms: Option<u32>,
}

/// A finished report, in the field layout the report API stores.
///
/// # Example
///
/// ```rust
/// use ecgwatch_types::{HeartClass, ReportPayload};
///
/// let payload = ReportPayload::builder("rep-1")
///     .patient("P-100", "Ada Example")
///     .doctor_name("Dr. Grey")
///     .heart_class(HeartClass::Normal)
///     .date("2026-10-17")
///     .build();
///
/// assert_eq!(payload.patient_id, "P-100");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ReportPayload {
    /// Identifier assigned when the report was frozen.
    pub id: String,
    /// Patient identifier.
    pub patient_id: String,
    /// Patient display name.
    pub patient_name: String,
    /// Name of the reporting doctor, supplied by the identity collaborator.
    pub doctor_name: String,
    /// Beat class taken from the latest classification.
    pub heart_class: HeartClass,
    /// Free-text notes.
    pub description: String,
    /// Report date, `YYYY-MM-DD`.
    pub date: String,
    /// Review status.
    pub status: ReportStatus,
    /// Metrics on screen when the report was generated.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub metrics: Option<ReportMetrics>,
}

impl ReportPayload {
    /// Start building a payload with the given report id.
    pub fn builder(id: impl Into<String>) -> ReportPayloadBuilder {
        ReportPayloadBuilder::new(id)
    }
}

/// Builder for [`ReportPayload`].
#[derive(Debug, Clone)]
pub struct ReportPayloadBuilder {
    payload: ReportPayload,
}

impl ReportPayloadBuilder {
    /// Create a builder with empty fields and `pending` status.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            payload: ReportPayload {
                id: id.into(),
                patient_id: String::new(),
                patient_name: String::new(),
                doctor_name: String::new(),
                heart_class: HeartClass::Normal,
                description: String::new(),
                date: String::new(),
                status: ReportStatus::Pending,
                metrics: None,
            },
        }
    }

    /// Set patient id and name.
    pub fn patient(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.payload.patient_id = id.into();
        self.payload.patient_name = name.into();
        self
    }

    /// Set the doctor name.
    pub fn doctor_name(mut self, name: impl Into<String>) -> Self {
        self.payload.doctor_name = name.into();
        self
    }

    /// Set the heart class.
    pub fn heart_class(mut self, class: HeartClass) -> Self {
        self.payload.heart_class = class;
        self
    }

    /// Set the description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.payload.description = text.into();
        self
    }

    /// Set the date (`YYYY-MM-DD`).
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.payload.date = date.into();
        self
    }

    /// Set the status.
    pub fn status(mut self, status: ReportStatus) -> Self {
        self.payload.status = status;
        self
    }

    /// Attach metrics.
    pub fn metrics(mut self, metrics: ReportMetrics) -> Self {
        self.payload.metrics = Some(metrics);
        self
    }

    /// Build the payload.
    pub fn build(self) -> ReportPayload {
        self.payload
    }
}
