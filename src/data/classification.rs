//! Latest beat classification, reshaped for display.

use std::sync::Arc;

use ecgwatch_types::{ClassificationMessage, HeartClass, WireMessage};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Display-ready fields of one classification message.
///
/// Each accepted message produces a new snapshot that fully replaces the
/// previous one; nothing is accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationSnapshot {
    pub beat_number: u64,
    pub class_label: String,
    pub confidence: f64,
    pub segment: Vec<f64>,
    pub segment_length: usize,
}

impl ClassificationSnapshot {
    pub fn from_message(msg: ClassificationMessage) -> Self {
        Self {
            beat_number: msg.beat,
            class_label: msg.class,
            confidence: msg.confidence,
            segment: msg.data,
            segment_length: msg.data_length,
        }
    }

    /// Confidence as a percentage with one decimal place.
    pub fn confidence_text(&self) -> String {
        format!("{:.1}", self.confidence * 100.0)
    }

    pub fn heart_class(&self) -> Option<HeartClass> {
        HeartClass::from_label(&self.class_label)
    }

    /// The class label with its long name when known (`"V - Premature ..."`).
    pub fn class_text(&self) -> String {
        match self.heart_class() {
            Some(class) => format!("{} - {}", class.label(), class.description()),
            None => self.class_label.clone(),
        }
    }

    /// `(index, amplitude)` points for charting the segment.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.segment
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }
}

/// Pass-through from the classification stream to the display.
///
/// Cloning yields another handle on the same snapshot. Readers either poll
/// [`snapshot`](Self::snapshot) or await changes on a [`subscribe`](Self::subscribe)
/// receiver, which is signalled on every accepted message.
#[derive(Debug, Clone)]
pub struct ClassificationRelay {
    tx: Arc<watch::Sender<Option<Arc<ClassificationSnapshot>>>>,
}

impl Default for ClassificationRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationRelay {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Validate and publish a message. Returns whether it was accepted.
    ///
    /// Invalid messages are logged and dropped; the current snapshot stays.
    pub fn on_message(&self, msg: ClassificationMessage) -> bool {
        if let Err(e) = msg.validate() {
            warn!(error = %e, beat = msg.beat, "Dropping invalid classification");
            return false;
        }

        debug!(beat = msg.beat, class = %msg.class, "Classification received");
        self.tx
            .send_replace(Some(Arc::new(ClassificationSnapshot::from_message(msg))));
        true
    }

    pub fn snapshot(&self) -> Option<Arc<ClassificationSnapshot>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ClassificationSnapshot>>> {
        self.tx.subscribe()
    }

    /// Drop the current snapshot.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(beat: u64, class: &str) -> ClassificationMessage {
        ClassificationMessage::new(beat, class, 0.875, vec![0.1, 0.8, 0.2])
    }

    #[test]
    fn test_snapshot_fields() {
        let relay = ClassificationRelay::new();
        assert!(relay.on_message(message(3, "V")));

        let snap = relay.snapshot().unwrap();
        assert_eq!(snap.beat_number, 3);
        assert_eq!(snap.class_label, "V");
        assert_eq!(snap.segment_length, 3);
        assert_eq!(snap.confidence_text(), "87.5");
        assert_eq!(snap.class_text(), "V - Premature ventricular contraction");
        assert_eq!(snap.points()[1], (1.0, 0.8));
    }

    #[test]
    fn test_malformed_isolation() {
        let relay = ClassificationRelay::new();
        assert!(relay.on_message(message(1, "N")));

        let mut bad = message(2, "L");
        bad.confidence = 1.7;
        assert!(!relay.on_message(bad));

        let mut short = message(3, "R");
        short.data_length = 10;
        assert!(!relay.on_message(short));

        assert_eq!(relay.snapshot().unwrap().beat_number, 1);

        assert!(relay.on_message(message(4, "R")));
        let snap = relay.snapshot().unwrap();
        assert_eq!(snap.beat_number, 4);
        assert_eq!(snap.class_label, "R");
    }

    #[test]
    fn test_unknown_label_still_displays() {
        let relay = ClassificationRelay::new();
        assert!(relay.on_message(message(9, "Q")));
        assert_eq!(relay.snapshot().unwrap().class_text(), "Q");
    }

    #[tokio::test]
    async fn test_subscribers_signalled() {
        let relay = ClassificationRelay::new();
        let mut rx = relay.subscribe();

        let writer = relay.clone();
        tokio::spawn(async move {
            writer.on_message(message(5, "N"));
        });

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().beat_number, 5);
    }

    #[test]
    fn test_clear() {
        let relay = ClassificationRelay::new();
        relay.on_message(message(1, "N"));
        relay.clear();
        assert!(relay.snapshot().is_none());
    }
}
