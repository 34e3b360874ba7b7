//! Stream sources feeding the monitor.
//!
//! An [`Endpoint`] names where a stream lives, a [`Transport`] turns it into
//! a stream of text frames, and a [`StreamConnection`] owns the lifecycle of
//! one endpoint: dialling, decoding frames into wire messages, reporting
//! open/close/error events and tearing down.

mod connection;
mod endpoint;
mod error;
mod transport;

pub use connection::{ConnectionState, LinkEvent, StreamConnection};
pub use endpoint::Endpoint;
pub use error::TransportError;
pub use transport::{FrameStream, MemoryPeer, MemoryTransport, NetworkTransport, Transport};
