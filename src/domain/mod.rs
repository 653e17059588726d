//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    BoundaryKind, ChatSubscription, EntityKind, Lesson, Parity, ReminderEvent, ScheduleEntity,
    ScheduleResult, ScheduleSnapshot, UpstreamWarning, WeekId,
};
pub use errors::DomainError;
