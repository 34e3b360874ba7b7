//! Newline-delimited JSON fan-out over TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lines queued per client before it counts as too slow and is dropped.
const CLIENT_QUEUE: usize = 1024;

/// A TCP listener that sends every line to every connected client.
///
/// Each client gets its own writer task fed by a bounded queue. A client
/// whose queue is full, or whose writer has exited, is dropped on the next
/// send.
#[derive(Debug)]
pub struct Broadcaster {
    name: &'static str,
    addr: SocketAddr,
    clients: Arc<Mutex<Vec<mpsc::Sender<Arc<str>>>>>,
    accept_task: JoinHandle<()>,
}

impl Broadcaster {
    /// Bind and start accepting clients.
    pub async fn bind(name: &'static str, addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let clients: Arc<Mutex<Vec<mpsc::Sender<Arc<str>>>>> = Arc::new(Mutex::new(Vec::new()));

        let accepted = clients.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!("{}: client {} connected", name, peer);
                        let (tx, rx) = mpsc::channel(CLIENT_QUEUE);
                        accepted.lock().push(tx);
                        tokio::spawn(write_lines(name, peer, stream, rx));
                    }
                    Err(e) => {
                        debug!("{}: accept failed: {}", name, e);
                    }
                }
            }
        });

        info!("{}: listening on {}", name, addr);
        Ok(Self {
            name,
            addr,
            clients,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Connected clients as of the last send.
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Queue one line (without its newline) for every client.
    ///
    /// Returns the number of clients the line was queued for.
    pub fn send(&self, line: &str) -> usize {
        let line: Arc<str> = Arc::from(line);
        let mut clients = self.clients.lock();
        clients.retain(|tx| tx.try_send(line.clone()).is_ok());
        clients.len()
    }

    /// Serialize `message` to a single JSON line and send it.
    pub fn send_json<T: serde::Serialize>(&self, message: &T) -> serde_json::Result<usize> {
        let line = serde_json::to_string(message)?;
        Ok(self.send(&line))
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        debug!("{}: shutting down", self.name);
        self.accept_task.abort();
        // Dropping the senders ends each writer task.
        self.clients.lock().clear();
    }
}

async fn write_lines(
    name: &'static str,
    peer: SocketAddr,
    mut stream: TcpStream,
    mut rx: mpsc::Receiver<Arc<str>>,
) {
    while let Some(line) = rx.recv().await {
        let written = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await
        }
        .await;
        if let Err(e) = written {
            debug!("{}: client {} dropped: {}", name, peer, e);
            return;
        }
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;

    #[tokio::test]
    async fn test_fan_out_to_all_clients() {
        let caster = Broadcaster::bind("test", "127.0.0.1:0").await.unwrap();
        let a = TcpStream::connect(caster.local_addr()).await.unwrap();
        let b = TcpStream::connect(caster.local_addr()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(caster.send(r#"{"value":0.5}"#), 2);

        for stream in [a, b] {
            let mut lines = BufReader::new(stream).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, r#"{"value":0.5}"#);
        }
    }

    #[tokio::test]
    async fn test_send_without_clients() {
        let caster = Broadcaster::bind("test", "127.0.0.1:0").await.unwrap();
        assert_eq!(caster.send("{}"), 0);
        assert_eq!(caster.client_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_client_dropped() {
        let caster = Broadcaster::bind("test", "127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(caster.local_addr()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(caster.client_count(), 1);

        drop(client);
        // The writer notices the closed socket after a write or two
        for _ in 0..50 {
            caster.send("{}");
            tokio::time::sleep(Duration::from_millis(10)).await;
            if caster.client_count() == 0 {
                break;
            }
        }
        assert_eq!(caster.client_count(), 0);
    }

    #[tokio::test]
    async fn test_send_json() {
        let caster = Broadcaster::bind("test", "127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(caster.local_addr()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let sent = caster
            .send_json(&ecgwatch_types::WaveformMessage::new(0.25))
            .unwrap();
        assert_eq!(sent, 1);

        let mut lines = BufReader::new(client).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"value":0.25}"#);
    }
}
