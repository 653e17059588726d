//! Upstream payload DTOs and mapping into domain lessons.
//!
//! The portal API returns a JSON array of day objects; each day carries
//! numbered lessons, each with one or more periods.

use crate::domain::{DomainError, Lesson, Parity, ScheduleEntity, ScheduleSnapshot, WeekId};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DayDto {
    pub date: NaiveDate,
    #[serde(default)]
    pub lessons: Vec<LessonDto>,
}

#[derive(Debug, Deserialize)]
pub struct LessonDto {
    pub number: u8,
    #[serde(default)]
    pub periods: Vec<PeriodDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDto {
    pub time_start: String,
    pub time_end: String,
    pub discipline_short_name: String,
    #[serde(default)]
    pub teachers_name_full: Option<String>,
    #[serde(default)]
    pub classroom: Option<String>,
}

fn parse_time(s: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| DomainError::UpstreamMalformed(format!("bad time {s:?}: {e}")))
}

/// Flatten day payloads into a snapshot ordered by (date, start time).
pub fn map_days(
    entity: ScheduleEntity,
    week: WeekId,
    days: Vec<DayDto>,
    fetched_at: NaiveDateTime,
) -> Result<ScheduleSnapshot, DomainError> {
    // The portal resolves odd/even weeks into concrete dates; record which
    // parity this week actually is.
    let parity = if week.week % 2 == 1 {
        Parity::Odd
    } else {
        Parity::Even
    };

    let mut lessons = Vec::new();
    for day in days {
        let date = day.date;
        for lesson in day.lessons {
            let number = lesson.number;
            for period in lesson.periods {
                lessons.push(Lesson {
                    date,
                    number,
                    starts_at: parse_time(&period.time_start)?,
                    ends_at: parse_time(&period.time_end)?,
                    subject: period.discipline_short_name,
                    teacher: period.teachers_name_full,
                    room: period.classroom,
                    parity,
                });
            }
        }
    }
    lessons.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.starts_at.cmp(&b.starts_at))
            .then(a.number.cmp(&b.number))
    });

    Ok(ScheduleSnapshot {
        entity,
        week,
        lessons,
        fetched_at,
        is_stale: false,
    })
}
