// Messaging module - Event kinds, subscription routing and outbound buffering
pub mod event;
pub mod outbound;
pub mod registry;
pub mod router;

pub use event::EventKind;
pub use outbound::{OutboundQueue, OverflowPolicy};
pub use registry::{EventCallback, SubscriptionHandle, SubscriptionRegistry};
pub use router::EventRouter;
