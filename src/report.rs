//! Report drafting and hand-off to the report collaborator.
//!
//! A [`ReportDraft`] collects patient details while the monitor runs.
//! [`ReportDraft::freeze`] validates it and captures the current metrics into
//! an immutable [`MetricsReport`], which a [`ReportSink`] persists.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use ecgwatch_types::{HeartClass, ReportMetrics, ReportPayload, ReportStatus};
use thiserror::Error;
use tracing::info;

use crate::data::{ClassificationSnapshot, HeartMetrics};

/// Label used when no classification has been received yet.
pub const NO_CLASSIFICATION: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while freezing or submitting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report field `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The logged-in user, as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub doctor_name: String,
}

impl Identity {
    pub fn new(doctor_name: impl Into<String>) -> Self {
        Self {
            doctor_name: doctor_name.into(),
        }
    }
}

/// A report being filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    patient_id: String,
    patient_name: String,
    doctor_name: String,
    heart_class: String,
    description: String,
    date: String,
}

impl ReportDraft {
    /// Start a draft for `identity`, dated today.
    pub fn new(identity: &Identity) -> Self {
        Self {
            patient_id: String::new(),
            patient_name: String::new(),
            doctor_name: identity.doctor_name.clone(),
            heart_class: NO_CLASSIFICATION.to_string(),
            description: String::new(),
            date: Local::now().format(DATE_FORMAT).to_string(),
        }
    }

    pub fn set_patient_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.patient_id = id.into();
        self
    }

    pub fn set_patient_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.patient_name = name.into();
        self
    }

    pub fn set_description(&mut self, text: impl Into<String>) -> &mut Self {
        self.description = text.into();
        self
    }

    pub fn set_date(&mut self, date: impl Into<String>) -> &mut Self {
        self.date = date.into();
        self
    }

    /// Take the heart-class label from the latest classification.
    pub fn set_classification(&mut self, snapshot: Option<&ClassificationSnapshot>) -> &mut Self {
        self.heart_class = snapshot
            .map(|s| s.class_label.clone())
            .unwrap_or_else(|| NO_CLASSIFICATION.to_string());
        self
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    pub fn doctor_name(&self) -> &str {
        &self.doctor_name
    }

    pub fn heart_class(&self) -> &str {
        &self.heart_class
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Validate the draft and capture `metrics` into a finished report.
    ///
    /// Labels a report cannot carry (paced beats, unknown labels, `N/A`) are
    /// recorded as `N`.
    pub fn freeze(self, metrics: &HeartMetrics) -> Result<MetricsReport, ReportError> {
        let patient_id = required("patientId", &self.patient_id)?;
        let patient_name = required("patientName", &self.patient_name)?;
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).map_err(|e| {
            ReportError::Validation {
                field: "date",
                reason: format!("`{}` is not YYYY-MM-DD: {}", self.date, e),
            }
        })?;

        let payload = ReportPayload::builder(generate_id())
            .patient(patient_id, patient_name)
            .doctor_name(self.doctor_name.trim())
            .heart_class(HeartClass::for_report(&self.heart_class))
            .description(self.description.trim())
            .date(self.date.trim())
            .status(ReportStatus::Pending)
            .metrics(ReportMetrics {
                heart_rate_bpm: metrics.heart_rate,
                pr_interval_ms: metrics.intervals.map(|i| i.pr_ms),
                qrs_duration_ms: metrics.intervals.map(|i| i.qrs_ms),
                qt_interval_ms: metrics.intervals.map(|i| i.qt_ms),
            })
            .build();

        Ok(MetricsReport {
            payload,
            source_label: self.heart_class,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ReportError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReportError::Validation {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

fn generate_id() -> String {
    format!(
        "{}-{:04x}",
        Local::now().format("%Y%m%d%H%M%S"),
        rand::random::<u16>()
    )
}

/// A frozen report. Nothing about it can change after [`ReportDraft::freeze`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    payload: ReportPayload,
    source_label: String,
}

impl MetricsReport {
    pub fn id(&self) -> &str {
        &self.payload.id
    }

    pub fn payload(&self) -> &ReportPayload {
        &self.payload
    }

    /// The classification label as received, before coercion.
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(&self.payload)?)
    }
}

/// The report collaborator.
pub trait ReportSink: Send + Sync + Debug {
    /// Persist a report and return its identifier.
    fn submit(&self, report: &MetricsReport) -> Result<String, ReportError>;
}

/// Writes each report as `<id>.json` into a directory.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    directory: PathBuf,
}

impl FileReportSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ReportSink for FileReportSink {
    fn submit(&self, report: &MetricsReport) -> Result<String, ReportError> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("{}.json", report.id()));
        std::fs::write(&path, report.to_json_pretty()?)?;

        info!(path = %path.display(), "Report written");
        Ok(report.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IntervalMetrics;

    fn draft() -> ReportDraft {
        let mut draft = ReportDraft::new(&Identity::new("Dr. Grey"));
        draft
            .set_patient_id("P-100")
            .set_patient_name("Ada Example")
            .set_description("Routine check");
        draft
    }

    fn metrics() -> HeartMetrics {
        HeartMetrics {
            heart_rate: Some(72),
            intervals: Some(IntervalMetrics {
                pr_ms: 150,
                qrs_ms: 90,
                qt_ms: 400,
            }),
        }
    }

    fn snapshot(label: &str) -> ClassificationSnapshot {
        ClassificationSnapshot {
            beat_number: 4,
            class_label: label.to_string(),
            confidence: 0.9,
            segment: vec![0.1],
            segment_length: 1,
        }
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = ReportDraft::new(&Identity::new("Dr. Grey"));
        assert_eq!(draft.doctor_name(), "Dr. Grey");
        assert_eq!(draft.heart_class(), NO_CLASSIFICATION);
        assert!(NaiveDate::parse_from_str(draft.date(), DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_freeze_captures_metrics() {
        let mut draft = draft();
        draft.set_classification(Some(&snapshot("V")));

        let report = draft.freeze(&metrics()).unwrap();
        let payload = report.payload();
        assert_eq!(payload.patient_id, "P-100");
        assert_eq!(payload.doctor_name, "Dr. Grey");
        assert_eq!(payload.heart_class, HeartClass::PrematureVentricular);
        assert_eq!(payload.status, ReportStatus::Pending);

        let m = payload.metrics.unwrap();
        assert_eq!(m.heart_rate_bpm, Some(72));
        assert_eq!(m.qt_interval_ms, Some(400));
    }

    #[test]
    fn test_unknown_metrics_stay_empty() {
        let report = draft().freeze(&HeartMetrics::default()).unwrap();
        let m = report.payload().metrics.unwrap();
        assert_eq!(m.heart_rate_bpm, None);
        assert_eq!(m.pr_interval_ms, None);
    }

    #[test]
    fn test_class_coercion() {
        for label in ["/", "Q", NO_CLASSIFICATION] {
            let mut draft = draft();
            if label != NO_CLASSIFICATION {
                draft.set_classification(Some(&snapshot(label)));
            }
            let report = draft.freeze(&metrics()).unwrap();
            assert_eq!(report.payload().heart_class, HeartClass::Normal);
            assert_eq!(report.source_label(), label);
        }
    }

    #[test]
    fn test_validation() {
        let mut missing_id = draft();
        missing_id.set_patient_id("  ");
        assert!(matches!(
            missing_id.freeze(&metrics()),
            Err(ReportError::Validation { field: "patientId", .. })
        ));

        let mut missing_name = draft();
        missing_name.set_patient_name("");
        assert!(matches!(
            missing_name.freeze(&metrics()),
            Err(ReportError::Validation { field: "patientName", .. })
        ));

        let mut bad_date = draft();
        bad_date.set_date("17/10/2026");
        assert!(matches!(
            bad_date.freeze(&metrics()),
            Err(ReportError::Validation { field: "date", .. })
        ));
    }

    #[test]
    fn test_file_sink_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path().join("reports"));

        let mut draft = draft();
        draft.set_date("2026-10-17");
        let report = draft.freeze(&metrics()).unwrap();
        let id = sink.submit(&report).unwrap();
        assert_eq!(id, report.id());

        let text = std::fs::read_to_string(sink.directory().join(format!("{}.json", id))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["patientName"], "Ada Example");
        assert_eq!(value["heartClass"], "N");
        assert_eq!(value["date"], "2026-10-17");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["metrics"]["heartRateBpm"], 72);
    }
}
