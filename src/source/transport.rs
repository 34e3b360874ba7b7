//! Transports that turn an [`Endpoint`] into a stream of text frames.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, trace, warn};

use super::{Endpoint, TransportError};

/// Longest `tcp://` line accepted. Longer lines are discarded up to the next newline.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Text frames from one connected peer, in arrival order.
///
/// The stream ends when the peer closes. An `Err` item means the stream
/// failed and no more frames will follow.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// Establishes connections to stream endpoints.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Perform the handshake and return the frame stream.
    async fn connect(&self, endpoint: &Endpoint) -> Result<FrameStream, TransportError>;
}

/// WebSocket and TCP transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkTransport;

#[async_trait]
impl Transport for NetworkTransport {
    async fn connect(&self, endpoint: &Endpoint) -> Result<FrameStream, TransportError> {
        match endpoint {
            Endpoint::WebSocket(url) => connect_websocket(url).await,
            Endpoint::Tcp(addr) => connect_tcp(addr).await,
            Endpoint::Memory(_) => Err(TransportError::UnsupportedScheme("mem".to_string())),
        }
    }
}

async fn connect_websocket(url: &str) -> Result<FrameStream, TransportError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connect {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;
    debug!(url, "WebSocket handshake complete");

    let frames = socket
        .take_while(|frame| futures_util::future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        trace!("Ignoring non UTF-8 binary frame");
                        None
                    }
                },
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            }
        });

    Ok(frames.boxed())
}

async fn connect_tcp(addr: &str) -> Result<FrameStream, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Connect {
            endpoint: format!("tcp://{}", addr),
            reason: e.to_string(),
        })?;
    debug!(addr, "TCP connection established");

    let frames = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH))
        .filter_map(|line| async move {
            match line {
                Ok(line) => Some(Ok(line)),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!(max = MAX_LINE_LENGTH, "Dropping oversized line");
                    None
                }
                Err(LinesCodecError::Io(e)) => Some(Err(TransportError::Read(e.to_string()))),
            }
        });

    Ok(frames.boxed())
}

type PendingConnect = oneshot::Sender<Result<mpsc::UnboundedReceiver<Result<String, TransportError>>, TransportError>>;

#[derive(Debug, Default)]
struct MemoryInner {
    pending: HashMap<String, VecDeque<PendingConnect>>,
    attempts: Vec<String>,
}

/// In-process transport for `mem://` endpoints.
///
/// A `connect` call waits until the other side calls [`accept`](Self::accept)
/// or [`refuse`](Self::refuse) for the same name. Every attempt is logged, so
/// callers can check which endpoints were dialled and in what order.
///
/// ```
/// use ecgwatch::{Endpoint, MemoryTransport, Transport};
/// use futures_util::StreamExt;
///
/// # tokio_test::block_on(async {
/// let transport = MemoryTransport::new();
/// let server = transport.clone();
///
/// let accept = tokio::spawn(async move {
///     let peer = server.accept("demo").await;
///     peer.send_text(r#"{"value":0.5}"#);
/// });
///
/// let endpoint: Endpoint = "mem://demo".parse().unwrap();
/// let mut frames = transport.connect(&endpoint).await.unwrap();
/// accept.await.unwrap();
/// assert_eq!(frames.next().await.unwrap().unwrap(), r#"{"value":0.5}"#);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
    notify: Arc<Notify>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names dialled so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.inner.lock().attempts.clone()
    }

    /// Number of dial attempts for `name` still waiting for an answer.
    pub fn pending(&self, name: &str) -> usize {
        self.inner.lock().pending.get(name).map_or(0, VecDeque::len)
    }

    async fn next_pending(&self, name: &str) -> PendingConnect {
        loop {
            let notified = self.notify.notified();
            if let Some(waiter) = self
                .inner
                .lock()
                .pending
                .get_mut(name)
                .and_then(VecDeque::pop_front)
            {
                return waiter;
            }
            notified.await;
        }
    }

    /// Wait for a dial to `name` and complete its handshake.
    pub async fn accept(&self, name: &str) -> MemoryPeer {
        loop {
            let waiter = self.next_pending(name).await;
            let (tx, rx) = mpsc::unbounded_channel();
            if waiter.send(Ok(rx)).is_ok() {
                return MemoryPeer { tx };
            }
            // The dialler gave up; wait for the next attempt.
        }
    }

    /// Wait for a dial to `name` and fail its handshake.
    pub async fn refuse(&self, name: &str, reason: &str) {
        let waiter = self.next_pending(name).await;
        let _ = waiter.send(Err(TransportError::Connect {
            endpoint: format!("mem://{}", name),
            reason: reason.to_string(),
        }));
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, endpoint: &Endpoint) -> Result<FrameStream, TransportError> {
        let Endpoint::Memory(name) = endpoint else {
            return Err(TransportError::UnsupportedScheme(endpoint.to_string()));
        };

        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock();
            inner.attempts.push(name.clone());
            inner.pending.entry(name.clone()).or_default().push_back(tx);
        }
        self.notify.notify_waiters();

        let frames = rx.await.map_err(|_| TransportError::Connect {
            endpoint: endpoint.to_string(),
            reason: "transport dropped".to_string(),
        })??;

        Ok(stream::unfold(frames, |mut frames| async move {
            frames.recv().await.map(|item| (item, frames))
        })
        .boxed())
    }
}

/// The accepting side of an in-memory connection. Dropping it closes the
/// stream.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl MemoryPeer {
    /// Send one text frame. Returns false once the reader has gone away.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(text.into())).is_ok()
    }

    /// Fail the stream with a read error, closing it.
    pub fn fail(self, reason: &str) {
        let _ = self.tx.send(Err(TransportError::Read(reason.to_string())));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_memory_accept_and_close() {
        let transport = MemoryTransport::new();
        let server = transport.clone();
        let endpoint: Endpoint = "mem://wave".parse().unwrap();

        let client = tokio::spawn(async move { transport.connect(&endpoint).await });
        let peer = server.accept("wave").await;
        assert!(peer.send_text("one"));
        drop(peer);

        let mut frames = client.await.unwrap().unwrap();
        assert_eq!(frames.next().await, Some(Ok("one".to_string())));
        assert_eq!(frames.next().await, None);
        assert_eq!(server.attempts(), vec!["wave".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_refuse() {
        let transport = MemoryTransport::new();
        let server = transport.clone();
        let endpoint: Endpoint = "mem://wave".parse().unwrap();

        let client = tokio::spawn(async move { transport.connect(&endpoint).await });
        server.refuse("wave", "no device").await;

        let result = client.await.unwrap();
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_memory_rejects_network_endpoint() {
        let transport = MemoryTransport::new();
        let endpoint: Endpoint = "tcp://127.0.0.1:1".parse().unwrap();
        assert!(matches!(
            transport.connect(&endpoint).await,
            Err(TransportError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"{\"value\":0.1}\n{\"value\":0.2}\n").await.unwrap();
        });

        let endpoint: Endpoint = format!("tcp://{}", addr).parse().unwrap();
        let frames: Vec<_> = NetworkTransport
            .connect(&endpoint)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            frames,
            vec![
                Ok(r#"{"value":0.1}"#.to_string()),
                Ok(r#"{"value":0.2}"#.to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_tcp_oversized_line_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let flood = vec![b'9'; MAX_LINE_LENGTH + 10];
            socket.write_all(&flood).await.unwrap();
            socket.write_all(b"\n{\"value\":0.3}\n").await.unwrap();
        });

        let endpoint: Endpoint = format!("tcp://{}", addr).parse().unwrap();
        let frames: Vec<_> = NetworkTransport
            .connect(&endpoint)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(frames, vec![Ok(r#"{"value":0.3}"#.to_string())]);
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint: Endpoint = format!("tcp://{}", addr).parse().unwrap();
        let result = NetworkTransport.connect(&endpoint).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
