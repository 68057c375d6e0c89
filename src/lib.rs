//! # portal-realtime
//!
//! Reconnecting publish/subscribe client for the compliance portal's realtime
//! event channel. Pushes server-originated events (notifications, ticket
//! changes, metric/compliance updates, invoice creation) to application
//! subscribers over a persistent WebSocket, with FIFO outbound queueing while
//! disconnected and bounded linear-backoff reconnection.
//!
//! ## Example
//!
//! ```no_run
//! use portal_realtime::{EventKind, RealtimeClient, RealtimeClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RealtimeClient::new(
//!         "wss://events.example.com/realtime",
//!         RealtimeClientOptions::default(),
//!     )?;
//!
//!     let _sub = client.subscribe(EventKind::Notification, |payload| {
//!         println!("notification: {payload}");
//!     });
//!
//!     client.connect("opaque-session-token").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod transport;
pub mod types;

pub use client::{ConnectionState, RealtimeClient, RealtimeClientBuilder, RealtimeClientOptions};
pub use messaging::{EventKind, OverflowPolicy, SubscriptionHandle, SubscriptionRegistry};
pub use types::{ClientError, Envelope, Result};
