//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    ChatSubscription, DomainError, ReminderEvent, ScheduleEntity, ScheduleSnapshot, WeekId,
};

/// Upstream schedule source. One read-only, idempotent HTTP request per
/// (entity, week, attempt); timeout and retry live behind this boundary.
#[async_trait::async_trait]
pub trait FetcherPort: Send + Sync {
    /// Fetch one week's schedule. `UpstreamUnavailable` after retries are
    /// exhausted; `UpstreamMalformed` for unusable responses (no retry).
    async fn fetch(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<ScheduleSnapshot, DomainError>;
}

/// A cached snapshot plus the instant it was written (unix seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub snapshot: ScheduleSnapshot,
    pub stored_at: i64,
}

/// Durable last-known-good schedule store keyed by (entity, week).
/// Last-write-wins; entries are never expired by TTL.
#[async_trait::async_trait]
pub trait CachePort: Send + Sync {
    async fn get(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<Option<CacheEntry>, DomainError>;

    async fn put(&self, snapshot: &ScheduleSnapshot) -> Result<(), DomainError>;
}

/// Read-modify-write closure applied under the per-chat lock.
pub type SubscriptionMutator = Box<dyn FnOnce(&mut ChatSubscription) + Send>;

/// Durable per-chat subscription store.
#[async_trait::async_trait]
pub trait ChatDataPort: Send + Sync {
    /// Returns `SubscriptionNotFound` for a chat never seen before.
    async fn get(&self, chat_id: i64) -> Result<ChatSubscription, DomainError>;

    /// Atomic per-chat update. Creates the record with defaults on first
    /// interaction; concurrent updates for the same chat never lose writes.
    async fn update(
        &self,
        chat_id: i64,
        mutate: SubscriptionMutator,
    ) -> Result<ChatSubscription, DomainError>;

    /// Subscriptions eligible for reminders: enabled with a selected group.
    async fn list_active(&self) -> Result<Vec<ChatSubscription>, DomainError>;
}

/// Delivery of reminder events toward the presentation layer.
/// Fire-and-continue: a failure for one chat must not stall the caller.
#[async_trait::async_trait]
pub trait NotifierPort: Send + Sync {
    async fn notify(&self, event: ReminderEvent) -> Result<(), DomainError>;
}
