use crate::infrastructure::{ReconnectPolicy, TaskManager};
use crate::messaging::OutboundQueue;

use super::RealtimeClientOptions;

/// Consolidated mutable state for RealtimeClient.
/// Using a single struct reduces lock contention.
pub struct ClientState {
    /// Opaque auth token supplied by the last `connect()` call; reused by
    /// automatic reconnection
    pub token: Option<String>,

    /// FIFO buffer of envelopes awaiting transmission
    pub queue: OutboundQueue,

    /// Reconnection attempt counter and delay schedule
    pub backoff: ReconnectPolicy,

    /// Whether the last close was caller-initiated (suppresses auto-reconnect)
    pub intentional_close: bool,

    /// Background task manager (read task)
    pub task_manager: TaskManager,
}

impl ClientState {
    pub fn new(options: &RealtimeClientOptions) -> Self {
        Self {
            token: None,
            queue: OutboundQueue::new(options.max_queue_depth, options.overflow_policy),
            backoff: ReconnectPolicy::new(
                std::time::Duration::from_millis(options.reconnect_interval_ms),
                options.max_retries,
            ),
            intentional_close: false,
            task_manager: TaskManager::new(),
        }
    }
}
