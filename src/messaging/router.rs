use super::EventKind;
use crate::client::RealtimeClient;
use crate::types::Envelope;

/// Routes decoded inbound envelopes to the appropriate handler.
///
/// Known server-originated kinds are dispatched to application subscribers via
/// the registry; `heartbeat` is answered with a `pong` below the application
/// layer; anything else is logged and dropped without tearing down the channel.
pub struct EventRouter {
    client: RealtimeClient,
}

impl EventRouter {
    pub fn new(client: RealtimeClient) -> Self {
        Self { client }
    }

    pub async fn route(&self, envelope: Envelope) {
        match &envelope.kind {
            EventKind::Heartbeat => self.answer_heartbeat(&envelope).await,
            kind if kind.is_wire_inbound() => {
                tracing::debug!("dispatching '{}' to subscribers", kind);
                self.client.registry().emit(kind, &envelope.payload);
            }
            other => {
                tracing::warn!("dropping frame with unrecognized type '{}'", other);
            }
        }
    }

    /// Echo the heartbeat id back as a pong through the outbound path, so the
    /// reply is queued rather than lost if the connection just dropped.
    async fn answer_heartbeat(&self, envelope: &Envelope) {
        let Some(id) = &envelope.id else {
            tracing::warn!("heartbeat frame without id, dropping");
            return;
        };

        tracing::debug!("answering heartbeat {}", id);
        if let Err(e) = self
            .client
            .send(EventKind::Pong, serde_json::json!({ "id": id }))
            .await
        {
            tracing::error!("failed to answer heartbeat {}: {}", id, e);
        }
    }
}
