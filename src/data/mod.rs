//! Waveform processing between the stream connections and the display.
//!
//! ## Submodules
//!
//! - [`buffer`]: bounded FIFO of raw samples between render ticks
//! - [`window`]: fixed-length sliding window shown by the chart
//! - [`beat`]: rising-edge beat detection and heart-rate metrics
//! - [`history`]: rolling heart-rate history for averaging and sparklines
//! - [`intervals`]: PR/QRS/QT estimators (placeholders, not measurements)
//! - [`classification`]: latest beat classification for display
//! - [`duration`]: parsing and formatting of duration strings (e.g., "33ms", "3s")
//!
//! ## Data Flow
//!
//! ```text
//! waveform stream ──▶ SampleBuffer::push()
//!                            │  (render tick, most recent sample only)
//!                            ▼
//!                     DisplayWindow::push()
//!                            │
//!                            ▼
//!                  BeatDetector::process() ──▶ HeartMetrics
//!
//! classification stream ──▶ ClassificationRelay::on_message() ──▶ ClassificationSnapshot
//! ```

pub mod beat;
pub mod buffer;
pub mod classification;
pub mod duration;
pub mod history;
pub mod intervals;
pub mod window;

pub use beat::{BeatDetector, BeatEvent, BeatReading, HeartMetrics, BEAT_THRESHOLD, UNKNOWN};
pub use buffer::{SampleBuffer, SharedSampleBuffer, MAX_DATA_POINTS};
pub use classification::{ClassificationRelay, ClassificationSnapshot};
pub use history::{HeartRateHistory, HEART_RATE_HISTORY};
pub use intervals::{
    IntervalEstimator, IntervalMetrics, IntervalMode, MidpointIntervals, PlaceholderIntervals,
};
pub use window::DisplayWindow;
