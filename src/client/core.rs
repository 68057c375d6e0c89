use super::{ClientState, ConnectAttempt, ConnectionManager, ConnectionState};
use super::{RealtimeClientBuilder, RealtimeClientOptions};
use crate::messaging::{EventKind, EventRouter, SubscriptionHandle, SubscriptionRegistry};
use crate::transport::{TransportEvent, TransportEvents, TransportFactory};
use crate::types::{
    ClientError, Envelope, Result, ENV_MAX_RETRIES, ENV_RECONNECT_INTERVAL_MS, ENV_WS_URL,
    TOKEN_QUERY_PARAM,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use url::Url;

/// Reconnecting publish/subscribe client pushing portal events (notifications,
/// ticket changes, metric/compliance updates, invoices) to application code.
///
/// The client owns a single transport and a single outbound queue per logical
/// session. Messages sent while disconnected are queued FIFO and flushed on the
/// next successful connection; subscriptions survive reconnects. One instance is
/// created per session and passed by handle to consumers.
///
/// # Example
///
/// ```no_run
/// use portal_realtime::{EventKind, RealtimeClient, RealtimeClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RealtimeClient::new(
///     "wss://events.example.com/realtime",
///     RealtimeClientOptions::default(),
/// )?;
///
/// let _sub = client.subscribe(EventKind::Notification, |payload| {
///     println!("notification: {payload}");
/// });
///
/// client.connect("session-token").await?;
/// // ... events now flow to the subscriber ...
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) endpoint: Url,

    // Transport handle and state machine
    pub(crate) connection: Arc<ConnectionManager>,

    // Pub/sub map for inbound and local events
    pub(crate) registry: Arc<SubscriptionRegistry>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    // Wakes a pending reconnect sleep so disconnect() cancels it promptly
    pub(crate) cancel_reconnect: Arc<Notify>,

    pub(crate) factory: Arc<dyn TransportFactory>,
}

impl RealtimeClient {
    /// Creates a new client. This validates the endpoint URL and spawns the
    /// reconnection watcher, but does not open a connection; call
    /// [`connect()`](Self::connect) for that.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UrlParse`] if the endpoint URL is malformed.
    pub fn new(endpoint: impl AsRef<str>, options: RealtimeClientOptions) -> Result<Self> {
        RealtimeClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Creates a client from environment variables: `PORTAL_WS_URL` (required),
    /// `PORTAL_RECONNECT_INTERVAL_MS` and `PORTAL_MAX_RETRIES` (optional).
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var(ENV_WS_URL)
            .map_err(|_| ClientError::Connection(format!("{ENV_WS_URL} is not set")))?;

        let mut options = RealtimeClientOptions::default();
        if let Ok(raw) = std::env::var(ENV_RECONNECT_INTERVAL_MS) {
            match raw.parse() {
                Ok(ms) => options.reconnect_interval_ms = ms,
                Err(_) => tracing::warn!("ignoring invalid {}: {:?}", ENV_RECONNECT_INTERVAL_MS, raw),
            }
        }
        if let Ok(raw) = std::env::var(ENV_MAX_RETRIES) {
            match raw.parse() {
                Ok(n) => options.max_retries = n,
                Err(_) => tracing::warn!("ignoring invalid {}: {:?}", ENV_MAX_RETRIES, raw),
            }
        }

        Self::new(endpoint, options)
    }

    /// Establishes the connection, authenticating with `token` embedded in the
    /// connection URL.
    ///
    /// Resolves once the transport is open, the queued messages are flushed and
    /// the local `connected` event has fired. Idempotent: returns immediately
    /// when already connected, and joins the in-flight attempt (without opening
    /// a second transport) when a connect is already underway.
    ///
    /// Calling this resets the reconnection attempt counter, so it is also how
    /// a caller recovers from the `FAILED` state.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the transport handshake fails.
    /// A failed handshake also enters the automatic reconnection schedule, same
    /// as an unexpected close.
    pub async fn connect(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(ClientError::Auth("connect token must be non-empty".to_string()));
        }

        {
            let mut state = self.state.write().await;
            state.token = Some(token.to_string());
            state.intentional_close = false;
            state.backoff.reset();
        }

        self.connect_attempt().await
    }

    /// Closes the connection. This is terminal for the session: it suppresses
    /// automatic reconnection and cancels any pending reconnect timer. Queued
    /// outbound messages are kept and will flush if the caller reconnects.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.intentional_close = true;
            state.task_manager.abort_all();
        }
        self.cancel_reconnect.notify_waiters();

        if self.connection.state().await == ConnectionState::Disconnected {
            return Ok(());
        }

        tracing::info!("disconnecting");
        self.connection.close().await;
        self.transition(ConnectionState::Disconnected).await;
        self.emit_local(EventKind::Disconnected, serde_json::json!({}));
        Ok(())
    }

    /// Sends an event to the server, or queues it if the transport is not open.
    ///
    /// The envelope is stamped with the current epoch-ms timestamp. Queuing is
    /// silent by design (fire-and-forget for UI code); the queue drains FIFO on
    /// the next successful connection.
    ///
    /// # Errors
    ///
    /// Only on programmer error (empty event type) or when a bounded queue with
    /// the `Reject` overflow policy is full.
    pub async fn send(&self, event: impl Into<EventKind>, payload: serde_json::Value) -> Result<()> {
        let kind = event.into();
        if let EventKind::Custom(name) = &kind {
            if name.is_empty() {
                return Err(ClientError::InvalidEventType(name.clone()));
            }
        }
        let envelope = Envelope::new(kind, payload);

        let mut state = self.state.write().await;
        // Direct transmit only when nothing is queued ahead, so FIFO order
        // holds across a disconnect/reconnect cycle
        if state.queue.is_empty() && self.connection.is_connected().await {
            match self.connection.send_envelope(&envelope).await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!("direct send failed, queueing message: {}", e),
            }
        }
        state.queue.push(envelope)
    }

    /// Registers a callback for an event kind and returns its disposer handle.
    ///
    /// Local lifecycle events (`connected`, `disconnected`, `error`,
    /// `reconnect_failed`) and the reserved server-originated kinds are all
    /// subscribable. The subscription survives reconnects and lives until the
    /// handle is dropped or unsubscribed.
    pub fn subscribe<F>(&self, event: impl Into<EventKind>, callback: F) -> SubscriptionHandle
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.registry.subscribe(event.into(), callback)
    }

    /// Checks whether the client is currently connected
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Number of outbound messages waiting for a connection
    pub async fn pending_messages(&self) -> usize {
        self.state.read().await.queue.len()
    }

    pub(crate) fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// One connection attempt: claim the state machine, open the transport,
    /// wire it up, flush the queue. Used by both `connect()` and the
    /// reconnection loop.
    pub(crate) async fn connect_attempt(&self) -> Result<()> {
        match self.connection.begin_connect().await {
            ConnectAttempt::AlreadyConnected => return Ok(()),
            ConnectAttempt::InFlight => return self.join_in_flight_attempt().await,
            ConnectAttempt::Proceed => {}
        }

        let url = match self.endpoint_with_token().await {
            Ok(url) => url,
            Err(e) => {
                self.transition(ConnectionState::Disconnected).await;
                return Err(e);
            }
        };

        tracing::info!("connecting to {}", self.endpoint);
        match self.factory.open(&url).await {
            Ok((mut sink, events)) => {
                // Holding the state lock from here through the Connected
                // transition serializes against disconnect(): either the flag
                // is already set and the fresh transport is discarded, or the
                // disconnect runs after us and closes a fully installed one
                let mut state = self.state.write().await;
                if state.intentional_close {
                    tracing::info!("disconnect() arrived during handshake, discarding transport");
                    if let Err(e) = sink.close().await {
                        tracing::warn!("error closing discarded transport: {}", e);
                    }
                    self.connection
                        .transition(ConnectionState::Disconnected, true)
                        .await;
                    return Err(ClientError::Connection(
                        "connection attempt cancelled by disconnect()".to_string(),
                    ));
                }

                self.connection.set_sink(sink).await;
                self.spawn_read_task(&mut state, events);
                self.connection
                    .transition(ConnectionState::Connected, false)
                    .await;
                state.backoff.reset();
                self.flush_queue(&mut state).await;
                drop(state);
                self.emit_local(EventKind::Connected, serde_json::json!({}));
                tracing::info!("connected");
                Ok(())
            }
            Err(e) => {
                tracing::error!("connection attempt failed: {}", e);
                self.emit_local(
                    EventKind::Error,
                    serde_json::json!({ "message": e.to_string() }),
                );
                self.transition(ConnectionState::Disconnected).await;
                self.emit_local(EventKind::Disconnected, serde_json::json!({}));
                Err(e)
            }
        }
    }

    /// Awaits the attempt another caller already owns; resolves the same way
    /// that attempt does.
    async fn join_in_flight_attempt(&self) -> Result<()> {
        let mut rx = self.connection.subscribe_state();
        loop {
            let (state, _) = *rx.borrow_and_update();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    if rx.changed().await.is_err() {
                        return Err(ClientError::Connection("client shut down".to_string()));
                    }
                }
                _ => {
                    return Err(ClientError::Connection(
                        "in-flight connection attempt failed".to_string(),
                    ))
                }
            }
        }
    }

    /// Linear-backoff reconnection loop, entered after an unexpected close.
    /// Runs on the single watcher task, so at most one timer is outstanding.
    pub(crate) async fn run_reconnect_loop(&self) {
        loop {
            if self.state.read().await.intentional_close {
                return;
            }
            match self.connection.state().await {
                ConnectionState::Connected
                | ConnectionState::Connecting
                | ConnectionState::Failed => return,
                _ => {}
            }

            let delay = { self.state.write().await.backoff.next_delay() };
            let Some(delay) = delay else {
                let retry_budget = self.state.read().await.backoff.max_retries();
                tracing::error!("giving up after {} reconnection attempts", retry_budget);
                self.transition(ConnectionState::Failed).await;
                self.emit_local(
                    EventKind::ReconnectFailed,
                    serde_json::json!({ "attempts": retry_budget }),
                );
                return;
            };

            let attempt = self.state.read().await.backoff.attempts();
            tracing::info!("reconnect attempt {} in {:?}", attempt, delay);
            self.transition(ConnectionState::Reconnecting).await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel_reconnect.notified() => {
                    tracing::info!("pending reconnect cancelled by disconnect()");
                    return;
                }
            }
            if self.state.read().await.intentional_close {
                return;
            }

            match self.connect_attempt().await {
                Ok(()) => {
                    tracing::info!("reconnected on attempt {}", attempt);
                    return;
                }
                Err(e) => tracing::warn!("reconnect attempt {} failed: {}", attempt, e),
            }
        }
    }

    /// Spawns the task that drains the transport event stream, decoding and
    /// routing frames until the transport closes.
    fn spawn_read_task(&self, state: &mut ClientState, mut events: TransportEvents) {
        let client = self.clone();
        let router = EventRouter::new(self.clone());

        state.task_manager.spawn(async move {
            tracing::debug!("read task started");
            while let Some(event) = events.next().await {
                match event {
                    TransportEvent::Message(text) => {
                        match serde_json::from_str::<Envelope>(&text) {
                            Ok(envelope) => router.route(envelope).await,
                            // One bad frame must not drop the channel
                            Err(e) => tracing::warn!("dropping malformed frame: {}", e),
                        }
                    }
                    TransportEvent::Error(message) => {
                        // State transition is driven by the close that follows
                        tracing::error!("transport error: {}", message);
                        client.emit_local(
                            EventKind::Error,
                            serde_json::json!({ "message": message }),
                        );
                    }
                    TransportEvent::Closed { reason } => {
                        tracing::warn!("transport closed: {:?}", reason);
                        break;
                    }
                }
            }
            // Stream ending without a close frame counts as an unexpected close
            client.handle_transport_close().await;
            tracing::debug!("read task finished");
        });
    }

    /// Transport-side close: transition, surface the local event and let the
    /// watcher decide about reconnection.
    async fn handle_transport_close(&self) {
        self.connection.drop_sink().await;
        self.transition(ConnectionState::Disconnected).await;
        self.emit_local(EventKind::Disconnected, serde_json::json!({}));
    }

    /// Drains the outbound queue in order. If the transport drops mid-flush the
    /// in-hand message goes back to the front and flushing stops; it will be
    /// retried on the next successful connection.
    async fn flush_queue(&self, state: &mut ClientState) {
        if state.queue.is_empty() {
            return;
        }

        tracing::debug!("flushing {} queued messages", state.queue.len());
        while let Some(envelope) = state.queue.pop_front() {
            if let Err(e) = self.connection.send_envelope(&envelope).await {
                tracing::warn!("flush interrupted, requeueing message: {}", e);
                state.queue.requeue_front(envelope);
                break;
            }
        }
    }

    async fn transition(&self, new_state: ConnectionState) {
        let manual = self.state.read().await.intentional_close;
        self.connection.transition(new_state, manual).await;
    }

    pub(crate) fn emit_local(&self, kind: EventKind, payload: serde_json::Value) {
        self.registry.emit(&kind, &payload);
    }

    async fn endpoint_with_token(&self) -> Result<Url> {
        let token = self
            .state
            .read()
            .await
            .token
            .clone()
            .ok_or_else(|| ClientError::Auth("no token, call connect(token) first".to_string()))?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, &token);
        Ok(url)
    }
}
