//! Shared infrastructure: configuration and the clock abstraction.

pub mod clock;
pub mod config;

pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
