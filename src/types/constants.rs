/// Wire event type strings (magic strings layer)
pub mod wire_events {
    pub const NOTIFICATION: &str = "notification";
    pub const TICKET_UPDATE: &str = "ticket_update";
    pub const METRICS_UPDATE: &str = "metrics_update";
    pub const COMPLIANCE_UPDATE: &str = "compliance_update";
    pub const INVOICE_CREATED: &str = "invoice_created";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const PONG: &str = "pong";
}

/// Local event strings surfaced to application subscribers (never sent on the wire)
pub mod local_events {
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const ERROR: &str = "error";
    pub const RECONNECT_FAILED: &str = "reconnect_failed";
}

/// Query parameter carrying the opaque auth token on the connection URL
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Default base reconnect interval (milliseconds); the Nth attempt waits N times this
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3000;

/// Default cap on consecutive automatic reconnection attempts
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Environment variables read by [`from_env`](crate::RealtimeClient::from_env)
pub const ENV_WS_URL: &str = "PORTAL_WS_URL";
pub const ENV_RECONNECT_INTERVAL_MS: &str = "PORTAL_RECONNECT_INTERVAL_MS";
pub const ENV_MAX_RETRIES: &str = "PORTAL_MAX_RETRIES";
