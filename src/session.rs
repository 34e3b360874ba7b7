//! Coordination of the waveform and classification connections.
//!
//! The waveform stream is the primary connection: the classification stream
//! is only dialled once the waveform stream is up, and losing the waveform
//! stream tears both down. Losing the classification stream never affects
//! the waveform.
//!
//! ```text
//!  Idle / Disconnected / Failed
//!        │ connect()
//!        ▼
//!  ConnectingPrimary ──(primary error/close)──▶ Failed
//!        │ primary opened
//!        ▼
//!  ConnectingSecondary ──(secondary opened / error / grace elapsed)──▶ Live
//!        │                                                          │
//!        └────────────(primary error/close, disconnect())───────────┴──▶ Disconnected
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ecgwatch_types::{ClassificationMessage, WaveformMessage};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::data::{
    BeatDetector, ClassificationRelay, ClassificationSnapshot, IntervalMode, SharedSampleBuffer,
    BEAT_THRESHOLD, HEART_RATE_HISTORY, MAX_DATA_POINTS,
};
use crate::render::{RenderFrame, RenderLoop, RenderScheduler, UPDATE_INTERVAL};
use crate::source::{ConnectionState, Endpoint, LinkEvent, StreamConnection, Transport};

/// Default waveform endpoint (the acquisition device).
pub const DEFAULT_WAVEFORM_ENDPOINT: &str = "ws://192.168.0.110:81";

/// Default classification endpoint (the analysis process).
pub const DEFAULT_CLASSIFICATION_ENDPOINT: &str = "ws://localhost:8765";

/// How long to wait for the classification stream before going live without it.
pub const DEFAULT_SECONDARY_GRACE: Duration = Duration::from_secs(3);

/// Everything a session needs to run.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub waveform: Endpoint,
    pub classification: Endpoint,
    pub buffer_capacity: usize,
    pub render_interval: Duration,
    pub threshold: f64,
    pub history: usize,
    pub intervals: IntervalMode,
    pub secondary_grace: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            waveform: Endpoint::WebSocket(DEFAULT_WAVEFORM_ENDPOINT.to_string()),
            classification: Endpoint::WebSocket(DEFAULT_CLASSIFICATION_ENDPOINT.to_string()),
            buffer_capacity: MAX_DATA_POINTS,
            render_interval: UPDATE_INTERVAL,
            threshold: BEAT_THRESHOLD,
            history: HEART_RATE_HISTORY,
            intervals: IntervalMode::default(),
            secondary_grace: DEFAULT_SECONDARY_GRACE,
        }
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    ConnectingPrimary,
    ConnectingSecondary,
    Live,
    Disconnected,
    /// The waveform stream failed before it ever connected.
    Failed,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::ConnectingPrimary => "Connecting to ECG",
            SessionState::ConnectingSecondary => "Connecting to Analysis",
            SessionState::Live => "Live",
            SessionState::Disconnected => "Disconnected",
            SessionState::Failed => "Connection failed",
        }
    }

    /// Whether a user "Connect" starts a new session from here.
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Disconnected | SessionState::Failed
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::ConnectingPrimary | SessionState::ConnectingSecondary | SessionState::Live
        )
    }
}

/// User-visible notices raised by lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected,
    Disconnected,
    ConnectionError(String),
    AnalysisConnected,
    AnalysisUnavailable(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::ConnectionError(_) | Notice::AnalysisUnavailable(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connected => f.write_str("Connected to ECG system"),
            Notice::Disconnected => f.write_str("Disconnected from ECG system"),
            Notice::ConnectionError(detail) => write!(f, "ECG connection error: {}", detail),
            Notice::AnalysisConnected => f.write_str("Connected to analysis system"),
            Notice::AnalysisUnavailable(detail) => {
                write!(f, "Analysis system unavailable: {}", detail)
            }
        }
    }
}

/// Per-session resources, dropped as a unit on teardown.
#[derive(Debug)]
struct LiveSession {
    buffer: SharedSampleBuffer,
    scheduler: Option<RenderScheduler>,
    secondary_deadline: Option<Instant>,
    secondary_up: bool,
}

/// Owns both stream connections and drives them as one logical session.
///
/// The host calls [`poll`](Self::poll) from its event loop; every state
/// transition happens there or in [`connect`](Self::connect) /
/// [`disconnect`](Self::disconnect). Dropping the controller tears the
/// session down.
#[derive(Debug)]
pub struct SessionController {
    settings: SessionSettings,
    transport: Arc<dyn Transport>,
    state: SessionState,
    primary: StreamConnection,
    secondary: StreamConnection,
    relay: ClassificationRelay,
    live: Option<LiveSession>,
    idle_frame: Arc<RenderFrame>,
    notices: VecDeque<Notice>,
}

impl SessionController {
    pub fn new(settings: SessionSettings, transport: Arc<dyn Transport>) -> Self {
        let primary = StreamConnection::new(settings.waveform.clone(), "ECG data");
        let secondary = StreamConnection::new(settings.classification.clone(), "Analysis system");
        let idle_frame = Arc::new(RenderFrame::idle(settings.buffer_capacity));

        Self {
            settings,
            transport,
            state: SessionState::Idle,
            primary,
            secondary,
            relay: ClassificationRelay::new(),
            live: None,
            idle_frame,
            notices: VecDeque::new(),
        }
    }

    /// Start a session. Returns false if one is already active.
    pub fn connect(&mut self) -> bool {
        if !self.state.can_connect() {
            return false;
        }

        let buffer = SharedSampleBuffer::with_capacity(self.settings.buffer_capacity);
        let sink = buffer.clone();
        self.primary
            .open(self.transport.clone(), move |msg: WaveformMessage| sink.push(msg.value));

        self.live = Some(LiveSession {
            buffer,
            scheduler: None,
            secondary_deadline: None,
            secondary_up: false,
        });
        self.transition(SessionState::ConnectingPrimary);
        true
    }

    /// End the session from any state.
    pub fn disconnect(&mut self) {
        let was_active = self.state.is_active();
        self.teardown(SessionState::Disconnected);
        if was_active {
            self.notices.push_back(Notice::Disconnected);
        }
    }

    /// Process pending connection events and timeouts as of `now`.
    pub fn poll(&mut self, now: Instant) {
        let mut primary_events = Vec::new();
        while let Some(event) = self.primary.poll_event() {
            primary_events.push(event);
        }
        for event in primary_events {
            self.on_primary(event, now);
        }

        let mut secondary_events = Vec::new();
        while let Some(event) = self.secondary.poll_event() {
            secondary_events.push(event);
        }
        for event in secondary_events {
            self.on_secondary(event);
        }

        if self.state == SessionState::ConnectingSecondary {
            let expired = self
                .live
                .as_ref()
                .and_then(|live| live.secondary_deadline)
                .is_some_and(|deadline| now >= deadline);
            if expired {
                warn!(grace = ?self.settings.secondary_grace, "Analysis system slow to connect");
                self.notices
                    .push_back(Notice::AnalysisUnavailable("connection timed out".to_string()));
                self.transition(SessionState::Live);
            }
        }
    }

    fn on_primary(&mut self, event: LinkEvent, now: Instant) {
        match event {
            LinkEvent::Opened => {
                if self.state != SessionState::ConnectingPrimary {
                    error!(state = ?self.state, "Waveform opened outside ConnectingPrimary");
                    debug_assert!(false, "waveform opened in state {:?}", self.state);
                    return;
                }
                // Events are drained before they are handled, so the link may
                // already be gone; the queued close or error fails the attempt.
                if self.primary.state() != ConnectionState::Connected {
                    debug!("Waveform dropped before the session went live");
                    return;
                }
                self.start_live(now);
            }
            LinkEvent::Error(detail) => match self.state {
                SessionState::ConnectingPrimary => {
                    self.teardown(SessionState::Failed);
                    self.notices.push_back(Notice::ConnectionError(detail));
                }
                SessionState::ConnectingSecondary | SessionState::Live => {
                    self.teardown(SessionState::Disconnected);
                    self.notices.push_back(Notice::ConnectionError(detail));
                }
                _ => {}
            },
            LinkEvent::Closed => match self.state {
                SessionState::ConnectingPrimary => {
                    self.teardown(SessionState::Failed);
                    self.notices
                        .push_back(Notice::ConnectionError("connection closed".to_string()));
                }
                SessionState::ConnectingSecondary | SessionState::Live => {
                    self.teardown(SessionState::Disconnected);
                    self.notices.push_back(Notice::Disconnected);
                }
                _ => {}
            },
        }
    }

    fn on_secondary(&mut self, event: LinkEvent) {
        let Some(live) = self.live.as_mut() else {
            return;
        };

        match event {
            LinkEvent::Opened => {
                live.secondary_up = true;
                self.notices.push_back(Notice::AnalysisConnected);
                if self.state == SessionState::ConnectingSecondary {
                    self.transition(SessionState::Live);
                }
            }
            LinkEvent::Error(detail) => {
                live.secondary_up = false;
                self.notices.push_back(Notice::AnalysisUnavailable(detail));
                if self.state == SessionState::ConnectingSecondary {
                    self.transition(SessionState::Live);
                }
            }
            LinkEvent::Closed => {
                if live.secondary_up {
                    live.secondary_up = false;
                    self.notices
                        .push_back(Notice::AnalysisUnavailable("connection closed".to_string()));
                }
                if self.state == SessionState::ConnectingSecondary {
                    self.transition(SessionState::Live);
                }
            }
        }
    }

    fn start_live(&mut self, now: Instant) {
        if self.primary.state() != ConnectionState::Connected {
            error!("Refusing to dial analysis system before waveform is connected");
            return;
        }

        let Some(live) = self.live.as_mut() else {
            error!("Waveform opened without session resources");
            return;
        };

        let detector = BeatDetector::new(
            self.settings.threshold,
            self.settings.history,
            self.settings.intervals.build(),
        );
        let render = RenderLoop::new(
            live.buffer.clone(),
            self.settings.buffer_capacity,
            detector,
            self.settings.render_interval,
        );
        live.scheduler = Some(RenderScheduler::start(render));
        live.secondary_deadline = Some(now + self.settings.secondary_grace);

        let relay = self.relay.clone();
        self.secondary
            .open(self.transport.clone(), move |msg: ClassificationMessage| {
                relay.on_message(msg);
            });

        self.notices.push_back(Notice::Connected);
        self.transition(SessionState::ConnectingSecondary);
    }

    /// Close both connections and drop all per-session state.
    fn teardown(&mut self, next: SessionState) {
        self.primary.close();
        self.secondary.close();
        if let Some(mut live) = self.live.take() {
            if let Some(scheduler) = live.scheduler.as_mut() {
                scheduler.stop();
            }
            live.buffer.clear();
        }
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "Session state changed");
            self.state = next;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn primary_state(&self) -> ConnectionState {
        self.primary.state()
    }

    pub fn secondary_state(&self) -> ConnectionState {
        self.secondary.state()
    }

    /// The latest render frame, or a flat frame with unknown metrics when no
    /// scheduler is running.
    pub fn frame(&self) -> Arc<RenderFrame> {
        self.live
            .as_ref()
            .and_then(|live| live.scheduler.as_ref())
            .map_or_else(|| self.idle_frame.clone(), RenderScheduler::latest)
    }

    pub fn classification(&self) -> Option<Arc<ClassificationSnapshot>> {
        self.relay.snapshot()
    }

    pub fn subscribe_classification(
        &self,
    ) -> watch::Receiver<Option<Arc<ClassificationSnapshot>>> {
        self.relay.subscribe()
    }

    /// Drain notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn last_error(&self) -> Option<&str> {
        self.primary.last_error()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown(SessionState::Disconnected);
    }
}
