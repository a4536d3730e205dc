//! Store-agnostic domain logic.

mod analytics;
mod cursor;
mod delivery;
mod event;
mod score;
mod subscription;
mod traits;

pub use analytics::DomainAnalytics;
pub use cursor::Cursor;
pub use delivery::{DeliveryStatus, WebhookDelivery};
pub use event::{DomainEvent, EventKind};
pub use score::{score_opportunity, OpportunityCategory, ScoreWeights};
pub use subscription::{Subscription, SubscriptionFilters};
pub use traits::DomainTraits;
