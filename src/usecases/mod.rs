//! Application use cases. Orchestrate domain logic via ports.

pub mod bot_api;
pub mod reminder_scheduler;
pub mod schedule_service;

pub use bot_api::BotApi;
pub use reminder_scheduler::ReminderScheduler;
pub use schedule_service::ScheduleService;
