//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. Only `NoDataAvailable` and
//! `SubscriptionNotFound` are meant to reach the user-facing layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Transient upstream failure (timeouts, 5xx, connection errors) after
    /// retries were exhausted. Triggers cache fallback.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered but the response could not be parsed, or the status
    /// indicates a contract problem (4xx). Triggers cache fallback plus a
    /// loud warning: may indicate an upstream format change.
    #[error("upstream response malformed: {0}")]
    UpstreamMalformed(String),

    /// No fetch ever succeeded and no cache entry exists for the key.
    /// Surfaced to the end user as "schedule not yet known".
    #[error("no schedule data available for {0}")]
    NoDataAvailable(String),

    /// Chat was never configured. Presentation layer prompts setup.
    #[error("no subscription for chat {0}")]
    SubscriptionNotFound(i64),

    #[error("schedule cache error: {0}")]
    Cache(String),

    #[error("chat data error: {0}")]
    ChatData(String),

    #[error("reminder delivery error: {0}")]
    Notify(String),
}
