use crate::types::{ClientError, Envelope, Result};
use std::collections::VecDeque;

/// What to do when the outbound queue is at its configured depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the oldest queued envelope to make room for the new one
    #[default]
    DropOldest,
    /// Refuse the new envelope with [`ClientError::QueueFull`]
    Reject,
}

/// FIFO buffer of envelopes awaiting transmission while the transport is not open.
///
/// Insertion order is preserved across disconnect/reconnect cycles; there is no
/// de-duplication, so callers are responsible for idempotent message types. Depth
/// is unbounded unless `max_depth` is set.
pub struct OutboundQueue {
    buf: VecDeque<Envelope>,
    max_depth: Option<usize>,
    policy: OverflowPolicy,
}

impl OutboundQueue {
    pub fn new(max_depth: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            buf: VecDeque::new(),
            max_depth,
            policy,
        }
    }

    /// Appends an envelope, applying the overflow policy when at capacity.
    pub fn push(&mut self, envelope: Envelope) -> Result<()> {
        if let Some(max) = self.max_depth {
            if self.buf.len() >= max {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        if let Some(dropped) = self.buf.pop_front() {
                            tracing::warn!(
                                "outbound queue full ({} messages), dropping oldest '{}'",
                                max,
                                dropped.kind
                            );
                        }
                    }
                    OverflowPolicy::Reject => return Err(ClientError::QueueFull),
                }
            }
        }
        self.buf.push_back(envelope);
        Ok(())
    }

    /// Takes the next envelope to transmit
    pub fn pop_front(&mut self) -> Option<Envelope> {
        self.buf.pop_front()
    }

    /// Returns an envelope to the front after a failed mid-flush send, so it is
    /// retried first on the next successful connection.
    pub fn requeue_front(&mut self, envelope: Envelope) {
        self.buf.push_front(envelope);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
