//! Application state and navigation logic.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tokio::sync::watch;

use crate::data::ClassificationSnapshot;
use crate::render::RenderFrame;
use crate::report::{Identity, ReportDraft, ReportSink};
use crate::session::{SessionController, SessionState};
use crate::source::ConnectionState;
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live waveform with heart metrics.
    Live,
    /// Latest classified beat segment.
    Analysis,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Live => View::Analysis,
            View::Analysis => View::Live,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Live => "Live ECG",
            View::Analysis => "Beat Analysis",
        }
    }
}

/// Field of the report form that has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    PatientId,
    PatientName,
    Description,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::PatientId => FormField::PatientName,
            FormField::PatientName => FormField::Description,
            FormField::Description => FormField::PatientId,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::PatientId => "Patient ID",
            FormField::PatientName => "Patient Name",
            FormField::Description => "Description",
        }
    }
}

/// Text entered in the report overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportForm {
    pub focus: FormField,
    pub patient_id: String,
    pub patient_name: String,
    pub description: String,
}

impl ReportForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::PatientId => &self.patient_id,
            FormField::PatientName => &self.patient_name,
            FormField::Description => &self.description,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::PatientId => &mut self.patient_id,
            FormField::PatientName => &mut self.patient_name,
            FormField::Description => &mut self.description,
        }
    }

    pub fn push(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn pop(&mut self) {
        self.focused_mut().pop();
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    session: SessionController,
    /// Most recent render frame from the session.
    pub frame: Arc<RenderFrame>,
    /// Most recent classification, if any arrived.
    pub classification: Option<Arc<ClassificationSnapshot>>,
    classification_rx: watch::Receiver<Option<Arc<ClassificationSnapshot>>>,

    // Reporting
    identity: Identity,
    sink: Box<dyn ReportSink>,
    pub report_form: Option<ReportForm>,
    pub last_report_id: Option<String>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App around a session, with the theme matched to the terminal.
    pub fn new(session: SessionController, identity: Identity, sink: Box<dyn ReportSink>) -> Self {
        Self::with_theme(session, identity, sink, Theme::auto_detect())
    }

    pub fn with_theme(
        session: SessionController,
        identity: Identity,
        sink: Box<dyn ReportSink>,
        theme: Theme,
    ) -> Self {
        let classification_rx = session.subscribe_classification();
        Self {
            running: true,
            current_view: View::Live,
            show_help: false,
            frame: session.frame(),
            classification: session.classification(),
            classification_rx,
            session,
            identity,
            sink,
            report_form: None,
            last_report_id: None,
            theme,
            status_message: None,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Advance the session and pick up new frames and classifications.
    ///
    /// Returns true if anything on screen changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let state_before = self.session.state();
        self.session.poll(now);

        let mut changed = self.session.state() != state_before;
        for notice in self.session.take_notices() {
            self.set_status_message(notice.to_string());
            changed = true;
        }

        let frame = self.session.frame();
        if !Arc::ptr_eq(&frame, &self.frame) {
            self.frame = frame;
            changed = true;
        }

        if self.classification_rx.has_changed().unwrap_or(false) {
            self.classification = self.classification_rx.borrow_and_update().clone();
            changed = true;
        }

        changed
    }

    pub fn connect(&mut self) {
        if self.session.connect() {
            self.set_status_message(format!(
                "Connecting to {}...",
                self.session.settings().waveform
            ));
        } else {
            self.set_status_message("Already connected".to_string());
        }
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
        for notice in self.session.take_notices() {
            self.set_status_message(notice.to_string());
        }
        self.frame = self.session.frame();
    }

    /// Header text summarising both systems.
    pub fn system_status(&self) -> &'static str {
        match (self.session.state(), self.session.secondary_state()) {
            (SessionState::Live, ConnectionState::Connected) => {
                "Connected to ECG and Analysis Systems"
            }
            (SessionState::Live, _) => "Connected to ECG System (analysis unavailable)",
            (SessionState::ConnectingPrimary | SessionState::ConnectingSecondary, _) => {
                "Connecting..."
            }
            _ => "Systems Disconnected",
        }
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn open_report_form(&mut self) {
        if self.report_form.is_none() {
            self.report_form = Some(ReportForm::default());
        }
    }

    pub fn cancel_report_form(&mut self) {
        self.report_form = None;
    }

    /// Freeze the form into a report with the metrics on screen and submit it.
    ///
    /// On failure the form stays open so the user can correct it.
    pub fn submit_report(&mut self) -> Result<String> {
        let Some(form) = self.report_form.take() else {
            bail!("No report in progress");
        };

        let mut draft = ReportDraft::new(&self.identity);
        draft
            .set_patient_id(form.patient_id.as_str())
            .set_patient_name(form.patient_name.as_str())
            .set_description(form.description.as_str())
            .set_classification(self.classification.as_deref());

        let result = draft
            .freeze(&self.frame.metrics)
            .and_then(|report| self.sink.submit(&report));

        match result {
            Ok(id) => {
                self.last_report_id = Some(id.clone());
                Ok(id)
            }
            Err(e) => {
                self.report_form = Some(form);
                Err(e.into())
            }
        }
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current metrics and the latest classification to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let metrics = &self.frame.metrics;
        let mut export = serde_json::Map::new();

        export.insert(
            "session".to_string(),
            serde_json::json!({
                "state": self.session.state().label(),
                "ecg": self.session.primary_state().label(),
                "analysis": self.session.secondary_state().label(),
            }),
        );

        export.insert(
            "metrics".to_string(),
            serde_json::json!({
                "heart_rate_bpm": metrics.heart_rate,
                "pr_interval_ms": metrics.intervals.map(|i| i.pr_ms),
                "qrs_duration_ms": metrics.intervals.map(|i| i.qrs_ms),
                "qt_interval_ms": metrics.intervals.map(|i| i.qt_ms),
                "interval_estimator": self.frame.estimator,
                "heart_rate_history": self.frame.heart_rates,
                "beats_detected": self.frame.beats,
            }),
        );

        let classification = self.classification.as_ref().map(|c| {
            serde_json::json!({
                "beat": c.beat_number,
                "class": c.class_label,
                "confidence": c.confidence,
                "data_length": c.segment_length,
            })
        });
        export.insert(
            "classification".to_string(),
            classification.unwrap_or(serde_json::Value::Null),
        );

        let json = serde_json::to_string_pretty(&serde_json::Value::Object(export))?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FileReportSink;
    use crate::session::SessionSettings;
    use crate::source::MemoryTransport;

    fn app(reports: &Path) -> (App, MemoryTransport) {
        let transport = MemoryTransport::new();
        let settings = SessionSettings {
            waveform: "mem://wave".parse().unwrap(),
            classification: "mem://analysis".parse().unwrap(),
            ..Default::default()
        };
        let session = SessionController::new(settings, Arc::new(transport.clone()));
        let app = App::with_theme(
            session,
            Identity::new("Dr. Grey"),
            Box::new(FileReportSink::new(reports)),
            Theme::dark(),
        );
        (app, transport)
    }

    #[test]
    fn test_view_cycling() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        assert_eq!(app.current_view, View::Live);
        app.next_view();
        assert_eq!(app.current_view, View::Analysis);
        app.next_view();
        assert_eq!(app.current_view, View::Live);
        app.prev_view();
        assert_eq!(app.current_view.label(), "Beat Analysis");
    }

    #[test]
    fn test_report_form_editing() {
        let mut form = ReportForm::default();
        for c in "P-1".chars() {
            form.push(c);
        }
        form.next_field();
        form.push('A');
        form.push('x');
        form.pop();
        assert_eq!(form.patient_id, "P-1");
        assert_eq!(form.patient_name, "A");
        assert_eq!(form.focus, FormField::PatientName);
        form.next_field();
        form.next_field();
        assert_eq!(form.focus, FormField::PatientId);
    }

    #[test]
    fn test_submit_report() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());

        app.open_report_form();
        let form = app.report_form.as_mut().unwrap();
        form.patient_id = "P-9".to_string();
        form.patient_name = "Sam".to_string();

        let id = app.submit_report().unwrap();
        assert!(app.report_form.is_none());
        assert_eq!(app.last_report_id.as_deref(), Some(id.as_str()));
        assert!(dir.path().join(format!("{}.json", id)).exists());
    }

    #[test]
    fn test_invalid_report_keeps_form() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());

        app.open_report_form();
        assert!(app.submit_report().is_err());
        assert!(app.report_form.is_some());
        assert!(app.submit_report().is_err());

        app.cancel_report_form();
        assert!(app.submit_report().is_err());
    }

    #[test]
    fn test_status_message() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        assert!(app.get_status_message().is_none());
        app.set_status_message("hello".to_string());
        assert_eq!(app.get_status_message(), Some("hello"));

        app.status_message = Some(("old".to_string(), Instant::now() - STATUS_MESSAGE_TTL));
        assert!(app.get_status_message().is_none());
    }

    #[tokio::test]
    async fn test_tick_picks_up_session_changes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, transport) = app(dir.path());
        assert_eq!(app.system_status(), "Systems Disconnected");

        app.connect();
        let wave = transport.accept("wave").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(app.tick(Instant::now()));
        assert_eq!(app.system_status(), "Connecting...");

        let analysis = transport.accept("analysis").await;
        analysis.send_text(
            r#"{"beat":2,"class":"L","confidence":0.5,"data":[0.2],"data_length":1}"#,
        );
        wave.send_text(r#"{"value":0.35}"#);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(app.tick(Instant::now()));

        assert_eq!(app.system_status(), "Connected to ECG and Analysis Systems");
        assert_eq!(app.classification.as_ref().unwrap().class_label, "L");
        assert_eq!(app.frame.window.last().copied(), Some(0.35));
        assert!(app.get_status_message().is_some());

        let export = dir.path().join("export.json");
        app.export_state(&export).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert_eq!(value["classification"]["class"], "L");
        assert_eq!(value["session"]["state"], "Live");

        app.disconnect();
        assert_eq!(app.system_status(), "Systems Disconnected");
        assert!(app.frame.metrics.is_unknown());
    }
}
