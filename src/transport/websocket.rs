use super::{TransportEvent, TransportEvents, TransportFactory, TransportSink};
use crate::types::Result;
use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Production transport factory backed by `tokio-tungstenite`.
pub struct WebSocketFactory;

#[async_trait]
impl TransportFactory for WebSocketFactory {
    async fn open(&self, url: &Url) -> Result<(Box<dyn TransportSink>, TransportEvents)> {
        tracing::debug!("opening WebSocket connection to {}", url);
        let (ws_stream, _response) = connect_async(url.as_str()).await?;
        let (write_half, read_half) = ws_stream.split();

        let events = read_half
            .filter_map(|frame| async move { map_frame(frame) })
            .boxed();

        Ok((Box::new(WebSocketSink { inner: write_half }), events))
    }
}

struct WebSocketSink {
    inner: WsSink,
}

#[async_trait]
impl TransportSink for WebSocketSink {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.inner.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Map a raw WebSocket frame to a transport event. Control frames the client
/// does not care about yield `None`.
fn map_frame(
    frame: std::result::Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<TransportEvent> {
    match frame {
        Ok(Message::Text(text)) => Some(TransportEvent::Message(text.to_string())),
        Ok(Message::Close(close_frame)) => Some(TransportEvent::Closed {
            reason: close_frame.map(|f| f.reason.to_string()),
        }),
        Ok(Message::Binary(data)) => {
            tracing::warn!("ignoring unexpected binary frame ({} bytes)", data.len());
            None
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
        Err(e) => Some(TransportEvent::Error(e.to_string())),
    }
}
