//! Stream endpoint addresses.

use std::fmt;
use std::str::FromStr;

use super::TransportError;

/// Where a stream connection reads from.
///
/// Parsed from a URL:
///
/// - `ws://host:port/path`, `wss://...`: WebSocket, one JSON message per text frame
/// - `tcp://host:port`: raw TCP, newline-delimited JSON
/// - `mem://name`: an in-process [`MemoryTransport`](super::MemoryTransport) peer
///
/// ```
/// use ecgwatch::Endpoint;
///
/// let endpoint: Endpoint = "tcp://127.0.0.1:9000".parse().unwrap();
/// assert_eq!(endpoint, Endpoint::Tcp("127.0.0.1:9000".to_string()));
/// assert!("http://example.com".parse::<Endpoint>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Full WebSocket URL, scheme included.
    WebSocket(String),
    /// `host:port` for a TCP connection.
    Tcp(String),
    /// Name of an in-memory peer.
    Memory(String),
}

impl Endpoint {
    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| TransportError::InvalidEndpoint {
                endpoint: s.to_string(),
                reason: "expected scheme://address".to_string(),
            })?;

        if rest.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: s.to_string(),
                reason: "missing address".to_string(),
            });
        }

        match scheme.to_ascii_lowercase().as_str() {
            "ws" | "wss" => Ok(Endpoint::WebSocket(s.to_string())),
            "tcp" => Ok(Endpoint::Tcp(rest.trim_end_matches('/').to_string())),
            "mem" => Ok(Endpoint::Memory(rest.to_string())),
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::WebSocket(url) => f.write_str(url),
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Memory(name) => write!(f, "mem://{}", name),
        }
    }
}
