// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # ecgwatch
//!
//! A terminal ECG monitor and library for live waveform ingestion, beat
//! detection and beat classification display.
//!
//! The monitor consumes two streams of JSON messages: raw waveform samples
//! from an acquisition device, and per-beat classifications from an analysis
//! process. It slides the samples through a fixed-length display window at a
//! steady cadence, detects beats on the rising edge of a threshold, derives
//! heart rate, and captures the values on screen into patient reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Application                            │
//! │  ┌─────────┐    ┌───────────┐    ┌──────────┐    ┌──────────┐    │
//! │  │   app   │───▶│  session  │───▶│  render  │───▶│    ui    │    │
//! │  │ (state) │    │ (control) │    │  (tick)  │    │(ratatui) │    │
//! │  └────┬────┘    └─────┬─────┘    └────┬─────┘    └──────────┘    │
//! │       │               │               │                          │
//! │       ▼               ▼               ▼                          │
//! │  ┌─────────┐    ┌───────────┐    ┌──────────┐                    │
//! │  │ report  │    │  source   │───▶│   data   │                    │
//! │  │ (sink)  │    │ (streams) │    │ (buffer) │                    │
//! │  └─────────┘    └───────────┘    └──────────┘                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: endpoints, transports (WebSocket, TCP, in-memory) and the
//!   [`StreamConnection`] lifecycle
//! - **[`data`]**: sample buffer, display window, beat detection, heart-rate
//!   history and the classification relay
//! - **[`render`]**: the fixed-cadence [`RenderScheduler`]
//! - **[`session`]**: the [`SessionController`] ordering both connections
//! - **[`report`]**: patient report drafts, frozen [`MetricsReport`]s and sinks
//! - **[`config`]**: layered configuration (file plus `ECGWATCH_*` environment)
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the terminal front end
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Connect to the default device and analysis endpoints
//! ecgwatch --connect
//!
//! # Run against the bundled simulator
//! ecgwatch --simulate --connect
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use ecgwatch::{NetworkTransport, SessionController, SessionSettings};
//!
//! # tokio_test::block_on(async {
//! let settings = SessionSettings {
//!     waveform: "tcp://127.0.0.1:9001".parse().unwrap(),
//!     classification: "tcp://127.0.0.1:9002".parse().unwrap(),
//!     ..Default::default()
//! };
//! let mut session = SessionController::new(settings, Arc::new(NetworkTransport));
//! session.connect();
//! session.poll(Instant::now());
//! let frame = session.frame();
//! println!("heart rate: {}", frame.metrics.heart_rate_text());
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod render;
pub mod report;
pub mod session;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::{ConfigError, MonitorConfig};
pub use data::{
    BeatDetector, ClassificationRelay, ClassificationSnapshot, DisplayWindow, HeartMetrics,
    SampleBuffer, SharedSampleBuffer,
};
pub use render::{RenderFrame, RenderScheduler};
pub use report::{FileReportSink, Identity, MetricsReport, ReportDraft, ReportError, ReportSink};
pub use session::{Notice, SessionController, SessionSettings, SessionState};
pub use source::{
    ConnectionState, Endpoint, MemoryTransport, NetworkTransport, StreamConnection, Transport,
    TransportError,
};
