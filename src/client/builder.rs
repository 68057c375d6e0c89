use super::{ClientState, ConnectionManager, ConnectionState, RealtimeClient};
use crate::messaging::{OverflowPolicy, SubscriptionRegistry};
use crate::transport::{websocket::WebSocketFactory, TransportFactory};
use crate::types::{Result, DEFAULT_MAX_RETRIES, DEFAULT_RECONNECT_INTERVAL_MS};
use std::sync::Arc;
use tokio::sync::{watch, Notify, RwLock};
use url::Url;

/// Configuration options for the realtime client.
#[derive(Debug, Clone)]
pub struct RealtimeClientOptions {
    /// Base backoff unit in milliseconds; the Nth reconnect attempt waits N times this
    pub reconnect_interval_ms: u64,
    /// Cap on consecutive automatic reconnection attempts
    pub max_retries: u32,
    /// Maximum outbound queue depth; `None` means unbounded
    pub max_queue_depth: Option<usize>,
    /// What to do when the queue is at `max_queue_depth`
    pub overflow_policy: OverflowPolicy,
}

impl Default for RealtimeClientOptions {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_queue_depth: None,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Builder for RealtimeClient that handles initialization
pub struct RealtimeClientBuilder {
    endpoint: Url,
    options: RealtimeClientOptions,
    factory: Arc<dyn TransportFactory>,
}

impl RealtimeClientBuilder {
    /// Create a new builder; validates the endpoint URL up front
    pub fn new(endpoint: impl AsRef<str>, options: RealtimeClientOptions) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;

        Ok(Self {
            endpoint,
            options,
            factory: Arc::new(WebSocketFactory),
        })
    }

    /// Substitute the transport factory (tests use an in-memory transport)
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Build the client and spawn the reconnection watcher
    pub fn build(self) -> RealtimeClient {
        let (state_tx, state_rx) = watch::channel((ConnectionState::Disconnected, false));

        let client = RealtimeClient {
            endpoint: self.endpoint,
            connection: Arc::new(ConnectionManager::new(state_tx)),
            registry: Arc::new(SubscriptionRegistry::new()),
            state: Arc::new(RwLock::new(ClientState::new(&self.options))),
            cancel_reconnect: Arc::new(Notify::new()),
            factory: self.factory,
        };

        // Spawn reconnection watcher task: every unexpected close re-enters the
        // reconnect loop, caller-initiated closes are ignored
        let client_for_watcher = client.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let (state, was_manual) = *rx.borrow_and_update();

                if state == ConnectionState::Disconnected && !was_manual {
                    tracing::info!("watcher detected unexpected close, entering reconnect loop");
                    client_for_watcher.run_reconnect_loop().await;
                }
            }
            tracing::debug!("reconnection watcher task finished");
        });

        client
    }
}
