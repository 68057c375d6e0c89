use crate::transport::TransportSink;
use crate::types::{ClientError, Envelope, Result};
use tokio::sync::{watch, RwLock};

/// Connection lifecycle states. Exactly one applies at a time; transitions are
/// serialized through the [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A reconnect timer is pending or an automatic attempt is in progress
    Reconnecting,
    /// Automatic reconnection gave up; only an explicit `connect()` recovers
    Failed,
}

/// Outcome of the atomic check-and-set that guards `connect()`.
pub enum ConnectAttempt {
    AlreadyConnected,
    /// Another attempt is in flight; join it instead of opening a second transport
    InFlight,
    /// This caller owns the attempt
    Proceed,
}

/// Owns the transport sink and the connection state machine.
///
/// State changes are broadcast on a watch channel as `(state, manual)` pairs,
/// where `manual` records whether the most recent close was caller-initiated.
pub struct ConnectionManager {
    sink: RwLock<Option<Box<dyn TransportSink>>>,
    state: RwLock<ConnectionState>,
    state_tx: watch::Sender<(ConnectionState, bool)>,
}

impl ConnectionManager {
    pub fn new(state_tx: watch::Sender<(ConnectionState, bool)>) -> Self {
        Self {
            sink: RwLock::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
            state_tx,
        }
    }

    /// Gets the current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Subscribe to `(state, manual)` change notifications
    pub fn subscribe_state(&self) -> watch::Receiver<(ConnectionState, bool)> {
        self.state_tx.subscribe()
    }

    /// Moves to a new state and notifies watchers
    pub async fn transition(&self, new_state: ConnectionState, manual: bool) {
        let mut state = self.state.write().await;
        *state = new_state;
        let _ = self.state_tx.send((new_state, manual));
    }

    /// Atomically claims the right to open a transport. Holding the state lock
    /// across the check and the move to `Connecting` is what makes two
    /// concurrent `connect()` calls produce exactly one transport.
    pub async fn begin_connect(&self) -> ConnectAttempt {
        let mut state = self.state.write().await;
        match *state {
            ConnectionState::Connected => ConnectAttempt::AlreadyConnected,
            ConnectionState::Connecting => ConnectAttempt::InFlight,
            _ => {
                *state = ConnectionState::Connecting;
                let _ = self.state_tx.send((ConnectionState::Connecting, false));
                ConnectAttempt::Proceed
            }
        }
    }

    /// Checks if currently connected
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Installs the sink of a freshly opened transport
    pub async fn set_sink(&self, sink: Box<dyn TransportSink>) {
        let mut guard = self.sink.write().await;
        *guard = Some(sink);
    }

    /// Serializes an envelope and transmits it on the open transport
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        let json = serde_json::to_string(envelope)?;

        let mut guard = self.sink.write().await;
        match guard.as_mut() {
            Some(sink) => sink.send(json).await,
            None => Err(ClientError::Connection("no open transport".to_string())),
        }
    }

    /// Closes the transport if one is open. A failed close handshake (broken
    /// pipe) is logged; the sink is dropped either way so the state machine
    /// never stays `Connected` on a dead transport.
    pub async fn close(&self) {
        let mut guard = self.sink.write().await;
        if let Some(sink) = guard.as_mut() {
            if let Err(e) = sink.close().await {
                tracing::warn!("error closing transport, dropping it anyway: {}", e);
            }
        }
        *guard = None;
    }

    /// Discards a sink whose transport already closed
    pub async fn drop_sink(&self) {
        let mut guard = self.sink.write().await;
        *guard = None;
    }
}
