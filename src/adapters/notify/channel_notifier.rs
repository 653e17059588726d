//! Implements NotifierPort over a bounded mpsc channel.
//!
//! The presentation layer consumes the receiving end, renders the event and
//! sends the chat message. The channel is bounded and the send never blocks:
//! a stuck consumer costs one reminder attempt, not a stalled scheduler
//! tick, and the scheduler retries on its next tick.

use crate::domain::{DomainError, ReminderEvent};
use crate::ports::NotifierPort;
use tokio::sync::mpsc;

pub struct ChannelNotifier {
    tx: mpsc::Sender<ReminderEvent>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<ReminderEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl NotifierPort for ChannelNotifier {
    async fn notify(&self, event: ReminderEvent) -> Result<(), DomainError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                DomainError::Notify("reminder queue full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                DomainError::Notify("reminder queue closed".into())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundaryKind, Lesson, Parity};
    use chrono::{NaiveDate, NaiveTime};

    fn event() -> ReminderEvent {
        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        ReminderEvent {
            chat_id: 7,
            lesson: Lesson {
                date,
                number: 1,
                starts_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ends_at: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                subject: "Calculus".into(),
                teacher: None,
                room: None,
                parity: Parity::Every,
            },
            boundary: BoundaryKind::Starts,
            is_stale: false,
        }
    }

    #[tokio::test]
    async fn full_queue_errors_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ChannelNotifier::new(tx);

        notifier.notify(event()).await.unwrap();
        let err = notifier.notify(event()).await.unwrap_err();
        assert!(matches!(err, DomainError::Notify(_)));

        rx.recv().await.unwrap();
        notifier.notify(event()).await.unwrap();
    }
}
