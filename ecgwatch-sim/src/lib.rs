//! # ecgwatch-sim
//!
//! Loopback stand-ins for the ECG acquisition device and the beat analysis
//! process, for demos and integration tests when no hardware is attached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecgwatch_sim::Simulator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = Simulator::builder().bpm(72.0).start().await?;
//!
//!     println!("waveform on tcp://{}", handle.waveform_addr());
//!     println!("classifications on tcp://{}", handle.classification_addr());
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     handle.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! SyntheticEcg ──▶ Broadcaster (waveform, {"value": ..})
//!      │
//!      ▼
//! BeatSegmenter ──▶ Classifier ──▶ Broadcaster (classification, {"beat": .., "class": ..})
//! ```
//!
//! Both broadcasters speak newline-delimited JSON over TCP, which the
//! monitor reads through its `tcp://` endpoints.

mod broadcast;
mod classifier;
mod segmenter;
mod simulator;
mod synth;

pub use broadcast::Broadcaster;
pub use classifier::{Classifier, MorphologyClassifier, Prediction};
pub use segmenter::{BeatSegment, BeatSegmenter, SEGMENT_CENTER, SEGMENT_LEN, SEGMENT_THRESHOLD};
pub use simulator::{SimError, Simulator, SimulatorBuilder, SimulatorHandle};
pub use synth::SyntheticEcg;
