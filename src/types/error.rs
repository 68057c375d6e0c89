use thiserror::Error;

/// Errors that can occur when using the portal realtime client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication error (missing or rejected token)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Outbound queue is at its configured depth and the overflow policy rejects
    #[error("Outbound queue full")]
    QueueFull,

    /// Programmer error: an event type that violates the envelope invariants
    #[error("Invalid event type: {0:?}")]
    InvalidEventType(String),
}

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
