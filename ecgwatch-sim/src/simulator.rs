//! The simulator: generator, segmenter and classifier behind two broadcasters.

use std::net::SocketAddr;
use std::time::Duration;

use ecgwatch_types::{ClassificationMessage, WaveformMessage};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::classifier::{Classifier, MorphologyClassifier};
use crate::segmenter::BeatSegmenter;
use crate::synth::SyntheticEcg;

/// How often the emission loop wakes to send the samples that fell due.
const EMIT_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to bind {name} listener: {source}")]
    Bind {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Entry point for running the loopback servers.
///
/// # Example
///
/// ```rust,no_run
/// use ecgwatch_sim::Simulator;
///
/// # async fn run() -> Result<(), ecgwatch_sim::SimError> {
/// let handle = Simulator::builder()
///     .bpm(60.0)
///     .waveform_addr("127.0.0.1:9001")
///     .classification_addr("127.0.0.1:9002")
///     .start()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Simulator;

impl Simulator {
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }
}

/// Builder for a running simulator.
#[derive(Debug)]
pub struct SimulatorBuilder {
    bpm: f64,
    sample_rate: f64,
    wander: f64,
    waveform_addr: String,
    classification_addr: String,
    classifier: Option<Box<dyn Classifier>>,
}

impl SimulatorBuilder {
    /// Defaults: 72 BPM, 250 Hz, ephemeral loopback ports, morphology classifier.
    pub fn new() -> Self {
        Self {
            bpm: 72.0,
            sample_rate: 250.0,
            wander: 0.0,
            waveform_addr: "127.0.0.1:0".to_string(),
            classification_addr: "127.0.0.1:0".to_string(),
            classifier: None,
        }
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate = hz;
        self
    }

    /// Baseline wander amplitude added to the waveform.
    pub fn wander(mut self, amplitude: f64) -> Self {
        self.wander = amplitude;
        self
    }

    /// Address for the waveform listener. Port 0 picks a free port.
    pub fn waveform_addr(mut self, addr: impl Into<String>) -> Self {
        self.waveform_addr = addr.into();
        self
    }

    /// Address for the classification listener. Port 0 picks a free port.
    pub fn classification_addr(mut self, addr: impl Into<String>) -> Self {
        self.classification_addr = addr.into();
        self
    }

    /// Replace the default [`MorphologyClassifier`].
    pub fn classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Bind both listeners and start emitting in real time.
    pub async fn start(self) -> Result<SimulatorHandle, SimError> {
        let waveform = Broadcaster::bind("waveform", self.waveform_addr.as_str())
            .await
            .map_err(|source| SimError::Bind {
                name: "waveform",
                source,
            })?;
        let classification = Broadcaster::bind("classification", self.classification_addr.as_str())
            .await
            .map_err(|source| SimError::Bind {
                name: "classification",
                source,
            })?;

        let ecg = SyntheticEcg::new(self.bpm, self.sample_rate).with_wander(self.wander);
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(MorphologyClassifier::new(ecg.sample_rate())));

        let handle = SimulatorHandle {
            waveform_addr: waveform.local_addr(),
            classification_addr: classification.local_addr(),
            stop_tx: watch::channel(false).0,
        };
        let stop_rx = handle.stop_tx.subscribe();

        info!(
            "simulator: {} BPM at {} Hz, waveform on {}, classification on {}",
            ecg.bpm(),
            ecg.sample_rate(),
            handle.waveform_addr,
            handle.classification_addr
        );

        tokio::spawn(emit(ecg, classifier, waveform, classification, stop_rx));

        Ok(handle)
    }
}

impl Default for SimulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn emit(
    mut ecg: SyntheticEcg,
    classifier: Box<dyn Classifier>,
    waveform: Broadcaster,
    classification: Broadcaster,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut segmenter = BeatSegmenter::new();
    let mut timer = tokio::time::interval(EMIT_INTERVAL);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let started = Instant::now();

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let due = (started.elapsed().as_secs_f64() * ecg.sample_rate()) as u64;
                while ecg.position() < due {
                    let value = ecg.next_sample();
                    if let Err(e) = waveform.send_json(&WaveformMessage::new(value)) {
                        warn!("simulator: failed to encode sample: {}", e);
                    }

                    let Some(segment) = segmenter.push(value) else {
                        continue;
                    };
                    let prediction = classifier.classify(&segment.samples);
                    debug!(
                        "simulator: beat {} classified {} ({:.2})",
                        segment.beat,
                        prediction.class.label(),
                        prediction.confidence
                    );
                    let message = ClassificationMessage::new(
                        segment.beat,
                        prediction.class.label(),
                        prediction.confidence,
                        segment.samples,
                    );
                    if let Err(e) = classification.send_json(&message) {
                        warn!("simulator: failed to encode classification: {}", e);
                    }
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("simulator: stopped after {} samples", ecg.position());
}

/// Handle to a running simulator.
///
/// Drop this handle to stop emission, or call `stop()` explicitly. Both
/// listeners close with it.
#[derive(Debug)]
pub struct SimulatorHandle {
    waveform_addr: SocketAddr,
    classification_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
}

impl SimulatorHandle {
    pub fn waveform_addr(&self) -> SocketAddr {
        self.waveform_addr
    }

    pub fn classification_addr(&self) -> SocketAddr {
        self.classification_addr
    }

    /// Stop emission and close both listeners.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpStream;

    use ecgwatch_types::WireMessage;

    use super::*;

    #[tokio::test]
    async fn test_streams_waveform() {
        let handle = Simulator::builder().start().await.unwrap();
        let stream = TcpStream::connect(handle.waveform_addr()).await.unwrap();
        let mut lines = BufReader::new(stream).lines();

        for _ in 0..20 {
            let line = lines.next_line().await.unwrap().unwrap();
            let msg = WaveformMessage::decode(&line).unwrap();
            assert!(msg.value > -0.5 && msg.value < 1.5);
        }
        handle.stop();
    }

    #[tokio::test]
    async fn test_streams_classifications() {
        let handle = Simulator::builder().bpm(120.0).start().await.unwrap();
        let stream = TcpStream::connect(handle.classification_addr())
            .await
            .unwrap();
        let mut lines = BufReader::new(stream).lines();

        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let msg = ClassificationMessage::decode(&line).unwrap();
        assert!(msg.beat >= 1);
        assert_eq!(msg.class, "N");
        assert_eq!(msg.data.len(), 200);
        assert_eq!(msg.data_length, 200);
        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_closes_listeners() {
        let handle = Simulator::builder().start().await.unwrap();
        let addr = handle.waveform_addr();
        let stream = TcpStream::connect(addr).await.unwrap();
        handle.stop();

        let mut lines = BufReader::new(stream).lines();
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while let Ok(Some(_)) = lines.next_line().await {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let first = Simulator::builder().start().await.unwrap();
        let taken = first.waveform_addr().to_string();
        let err = Simulator::builder()
            .waveform_addr(taken)
            .start()
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Bind { name: "waveform", .. }));
    }
}
