//! Schedule resolution: try upstream, cache on success, fall back to the
//! last-known-good cache entry on failure.
//!
//! The caller always receives the best available data whenever any prior
//! successful fetch exists for the key; staleness is flagged, never hidden.

use crate::domain::{
    DomainError, ScheduleEntity, ScheduleResult, ScheduleSnapshot, UpstreamWarning, WeekId,
};
use crate::ports::{CachePort, FetcherPort};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct ScheduleService {
    fetcher: Arc<dyn FetcherPort>,
    cache: Arc<dyn CachePort>,
}

impl ScheduleService {
    pub fn new(fetcher: Arc<dyn FetcherPort>, cache: Arc<dyn CachePort>) -> Self {
        Self { fetcher, cache }
    }

    /// Resolve a schedule request.
    ///
    /// 1. Fetch upstream; on success store the snapshot and return it fresh.
    /// 2. On `UpstreamUnavailable`, serve the cached snapshot with
    ///    `is_stale = true`, or `NoDataAvailable` when none exists.
    /// 3. On `UpstreamMalformed`, same fallback plus a `Malformed` warning so
    ///    the caller can flag upstream format drift.
    pub async fn get_schedule(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
    ) -> Result<ScheduleResult, DomainError> {
        match self.fetcher.fetch(entity, week).await {
            Ok(mut snapshot) => {
                snapshot.is_stale = false;
                // Fresh data beats a failed write; keep serving and complain.
                if let Err(e) = self.cache.put(&snapshot).await {
                    warn!(entity = %entity, week = %week, error = %e, "failed to cache fresh snapshot");
                }
                debug!(
                    entity = %entity,
                    week = %week,
                    lessons = snapshot.lessons.len(),
                    "fresh schedule fetched"
                );
                Ok(ScheduleResult {
                    snapshot,
                    warning: None,
                })
            }
            Err(DomainError::UpstreamUnavailable(reason)) => {
                warn!(entity = %entity, week = %week, reason, "upstream unavailable, trying cache");
                self.fallback(entity, week, None).await
            }
            Err(DomainError::UpstreamMalformed(reason)) => {
                error!(
                    entity = %entity,
                    week = %week,
                    reason,
                    "upstream response malformed; possible API format change"
                );
                self.fallback(entity, week, Some(UpstreamWarning::Malformed))
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn fallback(
        &self,
        entity: ScheduleEntity,
        week: WeekId,
        warning: Option<UpstreamWarning>,
    ) -> Result<ScheduleResult, DomainError> {
        match self.cache.get(entity, week).await? {
            Some(entry) => {
                let mut snapshot = entry.snapshot;
                snapshot.is_stale = true;
                debug!(
                    entity = %entity,
                    week = %week,
                    stored_at = entry.stored_at,
                    "serving stale schedule from cache"
                );
                Ok(ScheduleResult { snapshot, warning })
            }
            None => Err(DomainError::NoDataAvailable(format!("{entity} {week}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, Parity};
    use crate::ports::CacheEntry;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum FetchPlan {
        Ok(ScheduleSnapshot),
        Unavailable,
        Malformed,
    }

    struct PlannedFetcher {
        plan: Mutex<FetchPlan>,
    }

    #[async_trait::async_trait]
    impl FetcherPort for PlannedFetcher {
        async fn fetch(
            &self,
            _entity: ScheduleEntity,
            _week: WeekId,
        ) -> Result<ScheduleSnapshot, DomainError> {
            match &*self.plan.lock().unwrap() {
                FetchPlan::Ok(s) => Ok(s.clone()),
                FetchPlan::Unavailable => {
                    Err(DomainError::UpstreamUnavailable("status 503".into()))
                }
                FetchPlan::Malformed => Err(DomainError::UpstreamMalformed("bad body".into())),
            }
        }
    }

    #[derive(Default)]
    struct MemCache {
        entries: Mutex<HashMap<(ScheduleEntity, WeekId), CacheEntry>>,
    }

    #[async_trait::async_trait]
    impl CachePort for MemCache {
        async fn get(
            &self,
            entity: ScheduleEntity,
            week: WeekId,
        ) -> Result<Option<CacheEntry>, DomainError> {
            Ok(self.entries.lock().unwrap().get(&(entity, week)).cloned())
        }

        async fn put(&self, snapshot: &ScheduleSnapshot) -> Result<(), DomainError> {
            self.entries.lock().unwrap().insert(
                (snapshot.entity, snapshot.week),
                CacheEntry {
                    snapshot: snapshot.clone(),
                    stored_at: 0,
                },
            );
            Ok(())
        }
    }

    fn sample_snapshot(entity: ScheduleEntity, week: WeekId) -> ScheduleSnapshot {
        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        ScheduleSnapshot {
            entity,
            week,
            lessons: vec![Lesson {
                date,
                number: 1,
                starts_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ends_at: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                subject: "Calculus".into(),
                teacher: Some("Petrenko O. I.".into()),
                room: Some("214".into()),
                parity: Parity::Every,
            }],
            fetched_at: date.and_hms_opt(8, 0, 0).unwrap(),
            is_stale: false,
        }
    }

    fn service(plan: FetchPlan, cache: Arc<MemCache>) -> ScheduleService {
        ScheduleService::new(
            Arc::new(PlannedFetcher {
                plan: Mutex::new(plan),
            }),
            cache,
        )
    }

    #[tokio::test]
    async fn successful_fetch_caches_and_returns_fresh() {
        let entity = ScheduleEntity::group(101);
        let week = WeekId { year: 2024, week: 36 };
        let cache = Arc::new(MemCache::default());
        let svc = service(FetchPlan::Ok(sample_snapshot(entity, week)), cache.clone());

        let result = svc.get_schedule(entity, week).await.unwrap();
        assert!(!result.snapshot.is_stale);
        assert!(result.warning.is_none());

        let cached = cache.get(entity, week).await.unwrap().unwrap();
        assert_eq!(cached.snapshot.lessons, result.snapshot.lessons);
        assert!(!cached.snapshot.is_stale);
    }

    #[tokio::test]
    async fn unavailable_upstream_falls_back_to_cache_as_stale() {
        let entity = ScheduleEntity::group(101);
        let week = WeekId { year: 2024, week: 36 };
        let cache = Arc::new(MemCache::default());
        cache.put(&sample_snapshot(entity, week)).await.unwrap();
        let svc = service(FetchPlan::Unavailable, cache);

        let result = svc.get_schedule(entity, week).await.unwrap();
        assert!(result.snapshot.is_stale);
        assert!(result.warning.is_none());
        assert_eq!(result.snapshot.lessons.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_upstream_without_cache_is_no_data() {
        let entity = ScheduleEntity::group(101);
        let week = WeekId { year: 2024, week: 36 };
        let svc = service(FetchPlan::Unavailable, Arc::new(MemCache::default()));

        let err = svc.get_schedule(entity, week).await.unwrap_err();
        assert!(matches!(err, DomainError::NoDataAvailable(_)));
    }

    #[tokio::test]
    async fn malformed_upstream_falls_back_with_warning() {
        let entity = ScheduleEntity::teacher(7);
        let week = WeekId { year: 2024, week: 36 };
        let cache = Arc::new(MemCache::default());
        cache.put(&sample_snapshot(entity, week)).await.unwrap();
        let svc = service(FetchPlan::Malformed, cache);

        let result = svc.get_schedule(entity, week).await.unwrap();
        assert!(result.snapshot.is_stale);
        assert_eq!(result.warning, Some(UpstreamWarning::Malformed));
    }

    #[tokio::test]
    async fn malformed_upstream_without_cache_is_no_data() {
        let entity = ScheduleEntity::group(5);
        let week = WeekId { year: 2024, week: 36 };
        let svc = service(FetchPlan::Malformed, Arc::new(MemCache::default()));

        let err = svc.get_schedule(entity, week).await.unwrap_err();
        assert!(matches!(err, DomainError::NoDataAvailable(_)));
    }
}
