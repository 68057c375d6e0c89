// Transport module - the seam between the client and the wire
pub mod websocket;

#[cfg(test)]
pub mod mock;

use crate::types::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

/// Events delivered by the receiving half of a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete UTF-8 text frame
    Message(String),
    /// The transport reported an error; a `Closed` event follows
    Error(String),
    /// The transport closed (remote close frame or connection drop)
    Closed { reason: Option<String> },
}

/// Sending half of an open transport.
#[async_trait]
pub trait TransportSink: Send + Sync {
    /// Transmit one text frame
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Close the transport gracefully
    async fn close(&mut self) -> Result<()>;
}

/// Stream of events from the receiving half of a transport. The stream ending
/// without a `Closed` event is treated as an unexpected close.
pub type TransportEvents = BoxStream<'static, TransportEvent>;

/// Constructs transports for the connection manager. Production code uses
/// [`websocket::WebSocketFactory`]; tests substitute an in-memory transport.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, url: &Url) -> Result<(Box<dyn TransportSink>, TransportEvents)>;
}
