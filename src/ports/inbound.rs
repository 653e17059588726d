//! Inbound port. The presentation layer (commands, callbacks) calls into the
//! application through this boundary and never touches adapters directly.

use crate::domain::{ChatSubscription, DomainError, ScheduleEntity, ScheduleResult, WeekId};

/// Partial update of a chat's subscription. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    /// Outer `None` = unchanged; `Some(None)` clears the selected group.
    pub group_id: Option<Option<i64>>,
    pub lang_code: Option<String>,
    pub notify_before_minutes: Option<u32>,
    pub enabled: Option<bool>,
}

impl SubscriptionPatch {
    pub fn apply(self, sub: &mut ChatSubscription) {
        if let Some(group_id) = self.group_id {
            sub.group_id = group_id;
        }
        if let Some(lang_code) = self.lang_code {
            sub.lang_code = lang_code;
        }
        if let Some(minutes) = self.notify_before_minutes {
            sub.notify_before_minutes = minutes;
        }
        if let Some(enabled) = self.enabled {
            sub.enabled = enabled;
        }
    }
}

/// Application API used by the presentation layer.
#[async_trait::async_trait]
pub trait BotPort: Send + Sync {
    /// Best available schedule for the entity and week: fresh when upstream
    /// answers, cached (with `is_stale = true`) when it does not.
    async fn get_schedule(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<ScheduleResult, DomainError>;

    /// Current subscription for a chat, or `SubscriptionNotFound`.
    async fn get_subscription(&self, chat_id: i64) -> Result<ChatSubscription, DomainError>;

    /// Applies a settings change. Creates the subscription with defaults on
    /// a chat's first interaction. Returns the updated record.
    async fn update_subscription(
        &self,
        chat_id: i64,
        patch: SubscriptionPatch,
    ) -> Result<ChatSubscription, DomainError>;
}
