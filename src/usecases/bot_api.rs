//! Inbound facade: implements `BotPort` for the presentation layer on top of
//! ScheduleService and the chat store.

use crate::domain::{ChatSubscription, DomainError, ScheduleEntity, ScheduleResult, WeekId};
use crate::ports::{BotPort, ChatDataPort, SubscriptionPatch};
use crate::usecases::schedule_service::ScheduleService;
use std::sync::Arc;

pub struct BotApi {
    schedule: Arc<ScheduleService>,
    chats: Arc<dyn ChatDataPort>,
}

impl BotApi {
    pub fn new(schedule: Arc<ScheduleService>, chats: Arc<dyn ChatDataPort>) -> Self {
        Self { schedule, chats }
    }
}

#[async_trait::async_trait]
impl BotPort for BotApi {
    async fn get_schedule(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<ScheduleResult, DomainError> {
        self.schedule.get_schedule(entity, week).await
    }

    async fn get_subscription(&self, chat_id: i64) -> Result<ChatSubscription, DomainError> {
        self.chats.get(chat_id).await
    }

    async fn update_subscription(
        &self,
        chat_id: i64,
        patch: SubscriptionPatch,
    ) -> Result<ChatSubscription, DomainError> {
        self.chats
            .update(chat_id, Box::new(move |sub| patch.apply(sub)))
            .await
    }
}
