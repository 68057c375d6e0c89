use crate::types::constants::{local_events, wire_events};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Type-safe event kinds carried in envelopes and used as subscription keys.
///
/// Covers the reserved server-originated wire types, the outbound `pong` reply,
/// the local lifecycle events the client emits itself, and a `Custom` escape
/// hatch for caller-defined outbound types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Portal notification pushed by the server
    Notification,
    /// Support/ops ticket changed
    TicketUpdate,
    /// Dashboard metrics refreshed
    MetricsUpdate,
    /// Compliance posture changed
    ComplianceUpdate,
    /// New invoice available
    InvoiceCreated,
    /// Server liveness probe (answered with `Pong`, never dispatched)
    Heartbeat,
    /// Reply to a heartbeat, echoing its id
    Pong,
    /// Local: connection established
    Connected,
    /// Local: connection lost or closed
    Disconnected,
    /// Local: transport-level error
    Error,
    /// Local: automatic reconnection gave up
    ReconnectFailed,
    /// Caller-defined event type
    Custom(String),
}

impl EventKind {
    /// Parse a string into an EventKind
    pub fn parse(s: &str) -> Self {
        match s {
            wire_events::NOTIFICATION => Self::Notification,
            wire_events::TICKET_UPDATE => Self::TicketUpdate,
            wire_events::METRICS_UPDATE => Self::MetricsUpdate,
            wire_events::COMPLIANCE_UPDATE => Self::ComplianceUpdate,
            wire_events::INVOICE_CREATED => Self::InvoiceCreated,
            wire_events::HEARTBEAT => Self::Heartbeat,
            wire_events::PONG => Self::Pong,
            local_events::CONNECTED => Self::Connected,
            local_events::DISCONNECTED => Self::Disconnected,
            local_events::ERROR => Self::Error,
            local_events::RECONNECT_FAILED => Self::ReconnectFailed,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Convert the kind to its string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Notification => wire_events::NOTIFICATION,
            Self::TicketUpdate => wire_events::TICKET_UPDATE,
            Self::MetricsUpdate => wire_events::METRICS_UPDATE,
            Self::ComplianceUpdate => wire_events::COMPLIANCE_UPDATE,
            Self::InvoiceCreated => wire_events::INVOICE_CREATED,
            Self::Heartbeat => wire_events::HEARTBEAT,
            Self::Pong => wire_events::PONG,
            Self::Connected => local_events::CONNECTED,
            Self::Disconnected => local_events::DISCONNECTED,
            Self::Error => local_events::ERROR,
            Self::ReconnectFailed => local_events::RECONNECT_FAILED,
            Self::Custom(s) => s,
        }
    }

    /// Whether this kind is a server-originated type that is dispatched to
    /// application subscribers on receipt. `heartbeat` is deliberately excluded:
    /// it is answered below the application layer.
    pub fn is_wire_inbound(&self) -> bool {
        matches!(
            self,
            Self::Notification
                | Self::TicketUpdate
                | Self::MetricsUpdate
                | Self::ComplianceUpdate
                | Self::InvoiceCreated
        )
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(de::Error::custom("event type must be non-empty"));
        }
        Ok(Self::parse(&s))
    }
}
