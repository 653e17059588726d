//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP or storage types here; adapters map into these.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Default minutes before a class start at which a reminder fires.
pub const DEFAULT_NOTIFY_BEFORE_MINUTES: u32 = 15;

/// What a schedule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Group,
    Teacher,
    Auditorium,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Group => "group",
            EntityKind::Teacher => "teacher",
            EntityKind::Auditorium => "auditorium",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "group" => Some(EntityKind::Group),
            "teacher" => Some(EntityKind::Teacher),
            "auditorium" => Some(EntityKind::Auditorium),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject of a schedule: a student group, a teacher, or a room. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleEntity {
    pub kind: EntityKind,
    pub id: i64,
}

impl ScheduleEntity {
    pub fn group(id: i64) -> Self {
        Self {
            kind: EntityKind::Group,
            id,
        }
    }

    pub fn teacher(id: i64) -> Self {
        Self {
            kind: EntityKind::Teacher,
            id,
        }
    }

    pub fn auditorium(id: i64) -> Self {
        Self {
            kind: EntityKind::Auditorium,
            id,
        }
    }
}

impl std::fmt::Display for ScheduleEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// ISO year-week identifier, e.g. `2024-W37`. Cache key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekId {
    pub year: i32,
    pub week: u32,
}

impl WeekId {
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday and Sunday of this week, used as the upstream request range.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let monday =
            NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default();
        let sunday =
            NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Sun).unwrap_or_default();
        (monday, sunday)
    }

    /// Parses the `Display` form (`YYYY-Www`). Used when decoding cache keys.
    pub fn parse(s: &str) -> Option<Self> {
        let (year, week) = s.split_once("-W")?;
        Some(Self {
            year: year.parse().ok()?,
            week: week.parse().ok()?,
        })
    }
}

impl std::fmt::Display for WeekId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Odd/even study week, or a lesson held every week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Every,
    Odd,
    Even,
}

/// One scheduled class. Immutable snapshot record: updates replace, never
/// mutate in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub date: NaiveDate,
    pub number: u8,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub subject: String,
    pub teacher: Option<String>,
    pub room: Option<String>,
    pub parity: Parity,
}

impl Lesson {
    pub fn day_of_week(&self) -> Weekday {
        self.date.weekday()
    }

    /// Durable de-duplication key for one boundary of this lesson instance.
    pub fn boundary_key(&self, boundary: BoundaryKind) -> String {
        format!("{}:{}:{}", self.date, self.number, boundary)
    }
}

/// One fetched-or-cached copy of a week's lessons for an entity.
///
/// At most one snapshot per (entity, week) is authoritative in the cache; a
/// newer fetch replaces the older one for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub entity: ScheduleEntity,
    pub week: WeekId,
    pub lessons: Vec<Lesson>,
    pub fetched_at: NaiveDateTime,
    pub is_stale: bool,
}

impl ScheduleSnapshot {
    /// Lessons held on the given date, in schedule order.
    pub fn lessons_on(&self, date: NaiveDate) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().filter(move |l| l.date == date)
    }
}

/// Result of a schedule request: best available data plus an optional
/// upstream health warning for the caller/logging layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleResult {
    pub snapshot: ScheduleSnapshot,
    pub warning: Option<UpstreamWarning>,
}

/// Surfaced alongside a cache fallback when the upstream answered but the
/// response could not be used. Signals possible upstream format drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamWarning {
    Malformed,
}

/// Per-chat configuration and reminder state. Owned by the chat store;
/// never hard-deleted (disabled instead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSubscription {
    pub chat_id: i64,
    pub group_id: Option<i64>,
    pub lang_code: String,
    pub notify_before_minutes: u32,
    pub enabled: bool,
    /// Boundary key of the last fired reminder. Persisted so a restart never
    /// re-fires a reminder that already went out.
    pub last_notified_lesson_key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatSubscription {
    /// Defaults for a chat seen for the first time.
    pub fn new(chat_id: i64, lang_code: impl Into<String>, now: i64) -> Self {
        Self {
            chat_id,
            group_id: None,
            lang_code: lang_code.into(),
            notify_before_minutes: DEFAULT_NOTIFY_BEFORE_MINUTES,
            enabled: false,
            last_notified_lesson_key: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A lesson start or end instant used to decide when to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// Fires `notify_before_minutes` before the lesson starts.
    Starts,
    /// Fires when the lesson ends (break / "time left" notification).
    Ends,
}

impl BoundaryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryKind::Starts => "starts",
            BoundaryKind::Ends => "ends",
        }
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted by the reminder scheduler; rendered and sent by the presentation
/// layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderEvent {
    pub chat_id: i64,
    pub lesson: Lesson,
    pub boundary: BoundaryKind,
    /// True when the reminder was computed from cached rather than fresh
    /// data; must be surfaced to the end user.
    pub is_stale: bool,
}
