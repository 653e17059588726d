//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by the presentation layer into the application
//! - Outbound: Called by application into infrastructure

pub mod inbound;
pub mod outbound;

pub use inbound::{BotPort, SubscriptionPatch};
pub use outbound::{
    CacheEntry, CachePort, ChatDataPort, FetcherPort, NotifierPort, SubscriptionMutator,
};
