//! Lifecycle of a single stream endpoint.

use std::sync::Arc;

use ecgwatch_types::WireMessage;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Endpoint, Transport};

/// Connection state as seen by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    /// The last attempt or stream failed. A `Closed` event always follows.
    Error,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error => "Error",
        }
    }
}

/// Lifecycle events reported by [`StreamConnection::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Closed,
    Error(String),
}

/// One endpoint's connection, from dial to teardown.
///
/// [`open`](Self::open) spawns a task that connects, decodes each frame and
/// hands valid messages to the handler in transport order. Lifecycle events
/// queue up until the owner polls them. Malformed frames are logged and
/// dropped.
///
/// After [`close`](Self::close) returns the handler is never called again and
/// no further events are reported.
#[derive(Debug)]
pub struct StreamConnection {
    endpoint: Endpoint,
    description: String,
    state: ConnectionState,
    last_error: Option<String>,
    events: Option<mpsc::UnboundedReceiver<LinkEvent>>,
    delivering: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl StreamConnection {
    pub fn new(endpoint: Endpoint, description: &str) -> Self {
        Self {
            endpoint,
            description: description.to_string(),
            state: ConnectionState::Disconnected,
            last_error: None,
            events: None,
            delivering: Arc::new(Mutex::new(false)),
            task: None,
        }
    }

    /// Start connecting. Does nothing if the connection is already open.
    ///
    /// Returns the state at the time of the call; `Connected` is reported
    /// later through [`poll_event`](Self::poll_event).
    pub fn open<M, H>(&mut self, transport: Arc<dyn Transport>, mut handler: H) -> ConnectionState
    where
        M: WireMessage + DeserializeOwned + Send + 'static,
        H: FnMut(M) + Send + 'static,
    {
        if self.task.is_some() {
            return self.state;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let delivering = Arc::new(Mutex::new(true));
        let gate = delivering.clone();
        let endpoint = self.endpoint.clone();
        let description = self.description.clone();

        info!(endpoint = %endpoint, "Connecting {}", description);

        let task = tokio::spawn(async move {
            let mut frames = match transport.connect(&endpoint).await {
                Ok(frames) => frames,
                Err(e) => {
                    let _ = tx.send(LinkEvent::Error(e.to_string()));
                    let _ = tx.send(LinkEvent::Closed);
                    return;
                }
            };
            let _ = tx.send(LinkEvent::Opened);

            while let Some(frame) = frames.next().await {
                let text = match frame {
                    Ok(text) => text,
                    Err(e) => {
                        let _ = tx.send(LinkEvent::Error(e.to_string()));
                        break;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }

                match M::decode(&text) {
                    Ok(message) => {
                        let open = gate.lock();
                        if !*open {
                            break;
                        }
                        handler(message);
                    }
                    Err(e) => warn!(source = %description, error = %e, "Dropping malformed message"),
                }
            }

            debug!(source = %description, "Stream ended");
            let _ = tx.send(LinkEvent::Closed);
        });

        self.events = Some(rx);
        self.delivering = delivering;
        self.task = Some(task);
        self.last_error = None;
        self.state
    }

    /// Take the next lifecycle event, if any. Never blocks.
    pub fn poll_event(&mut self) -> Option<LinkEvent> {
        let event = self.events.as_mut()?.try_recv().ok()?;

        match &event {
            LinkEvent::Opened => {
                info!(endpoint = %self.endpoint, "{} connected", self.description);
                self.state = ConnectionState::Connected;
            }
            LinkEvent::Error(detail) => {
                warn!(endpoint = %self.endpoint, error = %detail, "{} error", self.description);
                self.state = ConnectionState::Error;
                self.last_error = Some(detail.clone());
            }
            LinkEvent::Closed => {
                info!(endpoint = %self.endpoint, "{} closed", self.description);
                self.state = ConnectionState::Disconnected;
                self.task = None;
                self.events = None;
            }
        }

        Some(event)
    }

    /// Stop delivery and tear the connection down. Safe to call repeatedly.
    pub fn close(&mut self) {
        *self.delivering.lock() = false;

        if let Some(task) = self.task.take() {
            task.abort();
            debug!(endpoint = %self.endpoint, "Closed {}", self.description);
        }
        self.events = None;
        self.state = ConnectionState::Disconnected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a connection task is running (connecting or connected).
    pub fn is_open(&self) -> bool {
        self.task.is_some()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}
