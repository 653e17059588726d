//! Infrastructure adapters. Implement outbound ports.
//!
//! Upstream HTTP, SQLite storage, reminder delivery. Map errors to DomainError.

pub mod notify;
pub mod persistence;
pub mod upstream;
