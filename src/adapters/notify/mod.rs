//! Reminder delivery toward the presentation layer.

pub mod channel_notifier;

pub use channel_notifier::ChannelNotifier;
