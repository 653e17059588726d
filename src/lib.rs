//! schedbot: resilient university schedule caching and class reminders.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
