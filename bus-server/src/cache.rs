//! Caching layer for derived timetable views.
//!
//! Deriving a view is a pure function of (snapshot, minute, criteria), so
//! a view can be shared between every request and SSE client that asks
//! for the same filters within the same minute. The snapshot version in
//! the key means a new publish never serves a stale view.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::ClockTime;
use crate::feed::Snapshot;
use crate::pipeline::{FilterCriteria, PipelineConfig, TimetableView, run};

/// Cache key for views: (snapshot version, clock minute, criteria).
type ViewKey = (u64, ClockTime, FilterCriteria);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_capacity: 500,
        }
    }
}

/// Memo of pipeline runs.
pub struct ViewCache {
    views: MokaCache<ViewKey, Arc<TimetableView>>,
    pipeline: PipelineConfig,
}

impl ViewCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig, pipeline: PipelineConfig) -> Self {
        let views = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { views, pipeline }
    }

    /// The view of `snapshot` for `criteria` at `now`, computing it on a miss.
    pub async fn view(
        &self,
        snapshot: &Snapshot,
        criteria: &FilterCriteria,
        now: ClockTime,
    ) -> Arc<TimetableView> {
        let key = (snapshot.version, now, criteria.clone());

        if let Some(cached) = self.views.get(&key).await {
            return cached;
        }

        let view = Arc::new(run(&snapshot.buses, criteria, now, &self.pipeline));
        self.views.insert(key, Arc::clone(&view)).await;
        view
    }

    /// Approximate number of cached views.
    pub fn entry_count(&self) -> u64 {
        self.views.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::SnapshotOrigin;
    use crate::pipeline::SortKey;
    use chrono::Utc;

    fn snapshot(version: u64) -> Snapshot {
        Snapshot {
            version,
            buses: vec![crate::domain::fixtures::bus("a")],
            document_count: 1,
            received_at: Utc::now(),
            origin: SnapshotOrigin::InitialFetch,
        }
    }

    fn t(s: &str) -> ClockTime {
        ClockTime::parse_hhmm(s).unwrap()
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert_eq!(config.max_capacity, 500);
    }

    #[test]
    fn config_builder() {
        let config = CacheConfig::default()
            .with_ttl(Duration::from_secs(30))
            .with_max_capacity(10);
        assert_eq!(config.ttl, Duration::from_secs(30));
        assert_eq!(config.max_capacity, 10);
    }

    #[tokio::test]
    async fn counts_distinct_views() {
        let cache = ViewCache::new(&CacheConfig::default(), PipelineConfig::default());
        let criteria = FilterCriteria::default();
        cache.view(&snapshot(1), &criteria, t("09:45")).await;
        cache.view(&snapshot(1), &criteria, t("09:45")).await;
        cache.view(&snapshot(1), &criteria, t("09:46")).await;

        cache.views.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn same_key_shares_view() {
        let cache = ViewCache::new(&CacheConfig::default(), PipelineConfig::default());
        let snap = snapshot(1);
        let criteria = FilterCriteria::default();

        let first = cache.view(&snap, &criteria, t("09:45")).await;
        let second = cache.view(&snap, &criteria, t("09:45")).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn key_covers_version_minute_and_criteria() {
        let cache = ViewCache::new(&CacheConfig::default(), PipelineConfig::default());
        let criteria = FilterCriteria::default();
        let base = cache.view(&snapshot(1), &criteria, t("09:45")).await;

        let newer = cache.view(&snapshot(2), &criteria, t("09:45")).await;
        assert!(!Arc::ptr_eq(&base, &newer));

        let later = cache.view(&snapshot(1), &criteria, t("10:00")).await;
        assert!(!Arc::ptr_eq(&base, &later));
        assert_eq!(later.buses[0].status, crate::domain::BusStatus::Running);

        let sorted = FilterCriteria {
            sort: SortKey::Price,
            ..Default::default()
        };
        let other = cache.view(&snapshot(1), &sorted, t("09:45")).await;
        assert!(!Arc::ptr_eq(&base, &other));
    }
}
