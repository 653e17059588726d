//! Reminder loop: periodically walks active subscriptions, finds the next
//! lesson boundary from cached schedule data, and emits reminder events.
//!
//! Orchestrates ScheduleService, ChatDataPort, and NotifierPort. Per-chat
//! failures are logged and skipped; one bad subscription never halts the
//! loop for others. The durable de-duplication key lives in the chat store,
//! so a restart cannot re-fire a reminder that already went out.

use crate::domain::{
    BoundaryKind, ChatSubscription, DomainError, Lesson, ReminderEvent, ScheduleEntity,
    ScheduleSnapshot, WeekId,
};
use crate::ports::{ChatDataPort, NotifierPort};
use crate::shared::clock::Clock;
use crate::usecases::schedule_service::ScheduleService;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Arming state per subscription. Only the Fired key is durable (chat
/// store); this map exists for transition logging and dies with the process.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArmState {
    Idle,
    Armed(String),
    Fired(String),
}

/// A concrete instant at which a reminder should go out.
#[derive(Debug, Clone)]
struct Boundary {
    at: NaiveDateTime,
    kind: BoundaryKind,
    lesson: Lesson,
    key: String,
}

/// Nearest boundary for `date` that is still worth firing.
///
/// Skips the already-notified key and anything that passed more than `grace`
/// ago, so a long-downed process does not blast outdated reminders on start.
fn next_boundary(
    snapshot: &ScheduleSnapshot,
    date: NaiveDate,
    now: NaiveDateTime,
    notify_before_minutes: u32,
    grace: ChronoDuration,
    skip_key: Option<&str>,
) -> Option<Boundary> {
    let mut candidates: Vec<Boundary> = Vec::new();
    for lesson in snapshot.lessons_on(date) {
        let starts_at = NaiveDateTime::new(date, lesson.starts_at)
            - ChronoDuration::minutes(i64::from(notify_before_minutes));
        let ends_at = NaiveDateTime::new(date, lesson.ends_at);
        for (at, kind) in [(starts_at, BoundaryKind::Starts), (ends_at, BoundaryKind::Ends)] {
            let key = lesson.boundary_key(kind);
            if skip_key == Some(key.as_str()) {
                continue;
            }
            if at < now - grace {
                continue;
            }
            candidates.push(Boundary {
                at,
                kind,
                lesson: lesson.clone(),
                key,
            });
        }
    }
    candidates.sort_by(|a, b| a.at.cmp(&b.at).then(a.lesson.number.cmp(&b.lesson.number)));
    candidates.into_iter().next()
}

/// Reminder scheduler. Runs a fixed-interval tick independently of the
/// request-handling path.
pub struct ReminderScheduler {
    schedule: Arc<ScheduleService>,
    chats: Arc<dyn ChatDataPort>,
    notifier: Arc<dyn NotifierPort>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    /// A boundary this close in the future is Armed.
    lookahead: ChronoDuration,
    /// A boundary older than this never fires (restart safety).
    grace: ChronoDuration,
    states: Mutex<HashMap<i64, ArmState>>,
}

impl ReminderScheduler {
    pub fn new(
        schedule: Arc<ScheduleService>,
        chats: Arc<dyn ChatDataPort>,
        notifier: Arc<dyn NotifierPort>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
        lookahead: Duration,
    ) -> Self {
        let grace = ChronoDuration::seconds((tick_interval.as_secs() as i64) * 2);
        Self {
            schedule,
            chats,
            notifier,
            clock,
            tick_interval,
            lookahead: ChronoDuration::seconds(lookahead.as_secs() as i64),
            grace,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Run until the process stops. Tick failures are logged, never fatal.
    pub async fn run_loop(&self) {
        info!(
            tick_secs = self.tick_interval.as_secs(),
            "reminder scheduler started"
        );
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Evaluate every active subscription once.
    pub async fn tick(&self) {
        let subs = match self.chats.list_active().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "failed to list active subscriptions");
                return;
            }
        };

        for sub in subs {
            match self.evaluate(&sub).await {
                Ok(()) => {}
                // A missing schedule is not a user-visible error here; the
                // subscription is simply retried next tick.
                Err(DomainError::NoDataAvailable(key)) => {
                    debug!(chat_id = sub.chat_id, key, "no schedule data yet; skipping")
                }
                Err(e) => {
                    warn!(chat_id = sub.chat_id, error = %e, "reminder evaluation failed; skipping")
                }
            }
        }
    }

    async fn evaluate(&self, sub: &ChatSubscription) -> Result<(), DomainError> {
        let Some(group_id) = sub.group_id else {
            return Ok(());
        };
        let now = self.clock.now();
        let today = now.date();
        let result = self
            .schedule
            .get_schedule(ScheduleEntity::group(group_id), WeekId::from_date(today))
            .await?;
        let snapshot = result.snapshot;

        let boundary = next_boundary(
            &snapshot,
            today,
            now,
            sub.notify_before_minutes,
            self.grace,
            sub.last_notified_lesson_key.as_deref(),
        );
        let Some(boundary) = boundary else {
            self.transition(sub.chat_id, ArmState::Idle);
            return Ok(());
        };

        if boundary.at <= now {
            self.fire(sub, &boundary, snapshot.is_stale).await
        } else if boundary.at - now <= self.lookahead {
            self.transition(sub.chat_id, ArmState::Armed(boundary.key));
            Ok(())
        } else {
            self.transition(sub.chat_id, ArmState::Idle);
            Ok(())
        }
    }

    async fn fire(
        &self,
        sub: &ChatSubscription,
        boundary: &Boundary,
        is_stale: bool,
    ) -> Result<(), DomainError> {
        let event = ReminderEvent {
            chat_id: sub.chat_id,
            lesson: boundary.lesson.clone(),
            boundary: boundary.kind,
            is_stale,
        };
        if let Err(e) = self.notifier.notify(event).await {
            // Key stays unset: delivery is retried next tick while the
            // boundary is inside the grace window.
            warn!(chat_id = sub.chat_id, key = boundary.key, error = %e, "reminder delivery failed");
            return Ok(());
        }

        let key = boundary.key.clone();
        let marked = key.clone();
        self.chats
            .update(
                sub.chat_id,
                Box::new(move |s| s.last_notified_lesson_key = Some(marked)),
            )
            .await?;
        self.transition(sub.chat_id, ArmState::Fired(key.clone()));
        info!(
            chat_id = sub.chat_id,
            key,
            kind = boundary.kind.as_str(),
            stale = is_stale,
            "reminder fired"
        );
        Ok(())
    }

    fn transition(&self, chat_id: i64, next: ArmState) {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        let prev = states.insert(chat_id, next.clone());
        if prev.as_ref() != Some(&next) {
            debug!(chat_id, state = ?next, "reminder state changed");
        }
    }
}
