//! HTTP fetcher for the university portal API. Implements FetcherPort.
//!
//! One POST per (entity, week, attempt): `/time-table/{group|teacher|classroom}`
//! with the entity id and the week's Monday..Sunday date range. Transient
//! failures (transport errors, 5xx) are retried with linear backoff; 4xx and
//! undecodable bodies fail immediately as `UpstreamMalformed`.

use crate::adapters::upstream::mapper::{map_days, DayDto};
use crate::domain::{DomainError, EntityKind, ScheduleEntity, ScheduleSnapshot, WeekId};
use crate::ports::FetcherPort;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    lang: String,
    attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with a bounded per-request timeout.
    ///
    /// `attempts` counts the first try; `retry_delay` grows linearly with
    /// each retry (delay, 2*delay, ...).
    pub fn new(
        base_url: String,
        lang: String,
        timeout: Duration,
        attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::UpstreamUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang,
            attempts: attempts.max(1),
            retry_delay,
        })
    }

    fn endpoint(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Group => "time-table/group",
            EntityKind::Teacher => "time-table/teacher",
            EntityKind::Auditorium => "time-table/classroom",
        }
    }

    fn id_field(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Group => "groupId",
            EntityKind::Teacher => "teacherId",
            EntityKind::Auditorium => "classroomId",
        }
    }
}

#[async_trait::async_trait]
impl FetcherPort for HttpFetcher {
    async fn fetch(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<ScheduleSnapshot, DomainError> {
        let (date_start, date_end) = week.date_range();
        let url = format!("{}/{}", self.base_url, Self::endpoint(entity.kind));
        let mut body = serde_json::Map::new();
        body.insert(Self::id_field(entity.kind).to_string(), entity.id.into());
        body.insert("dateStart".to_string(), date_start.to_string().into());
        body.insert("dateEnd".to_string(), date_end.to_string().into());
        let body = serde_json::Value::Object(body);

        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay * (attempt - 1)).await;
            }

            let sent = self
                .client
                .post(&url)
                .header(reqwest::header::ACCEPT_LANGUAGE, &self.lang)
                .json(&body)
                .send()
                .await;

            match sent {
                Ok(res) => {
                    let status = res.status();
                    if status.is_success() {
                        let days: Vec<DayDto> = res.json().await.map_err(|e| {
                            DomainError::UpstreamMalformed(format!("decode body: {e}"))
                        })?;
                        let fetched_at = chrono::Local::now().naive_local();
                        let snapshot = map_days(entity, week, days, fetched_at)?;
                        debug!(
                            entity = %entity,
                            week = %week,
                            lessons = snapshot.lessons.len(),
                            attempt,
                            "upstream fetch ok"
                        );
                        return Ok(snapshot);
                    }
                    if status.is_client_error() {
                        return Err(DomainError::UpstreamMalformed(format!(
                            "unexpected status {status} for {url}"
                        )));
                    }
                    last_error = format!("status {status}");
                    warn!(entity = %entity, week = %week, attempt, status = %status, "upstream returned retryable status");
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(entity = %entity, week = %week, attempt, error = %e, "upstream request failed");
                }
            }
        }

        Err(DomainError::UpstreamUnavailable(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_entity_kind() {
        assert_eq!(HttpFetcher::endpoint(EntityKind::Group), "time-table/group");
        assert_eq!(
            HttpFetcher::endpoint(EntityKind::Auditorium),
            "time-table/classroom"
        );
        assert_eq!(HttpFetcher::id_field(EntityKind::Teacher), "teacherId");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let fetcher = HttpFetcher::new(
            "https://example.edu/api/v2/".into(),
            "uk".into(),
            Duration::from_secs(5),
            3,
            Duration::from_millis(10),
        )
        .unwrap();
        assert_eq!(fetcher.base_url, "https://example.edu/api/v2");
    }
}
