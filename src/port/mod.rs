//! Trait seams for every external collaborator.
//!
//! The core talks to the upstream event API, the durable store, and
//! webhook endpoints only through these traits; adapters provide the
//! concrete implementations.

mod source;
mod store;
mod webhook;

pub use source::{EventPage, EventSource, FetchQuery};
pub use store::{
    AnalyticsStore, CursorStore, DeliveryStore, EventStore, SubscriptionStore, TraitsStore,
};
pub use webhook::{DeliveryOutcome, WebhookSink};
