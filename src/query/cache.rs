//! Shared query cache keyed by `(resource, user)`
//!
//! One cache instance is shared by every view through an `Arc`. Entries are
//! only ever marked stale by the mutation path; reads decide on their own
//! when to refetch.

use crate::types::BackendUserId;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

/// Capacity of the invalidation broadcast channel
const SIGNAL_CAPACITY: usize = 64;

/// A cached server view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Entries,
    Streak,
    Achievements,
    AnalyticsStats,
    AnalyticsSummary,
    AnalyticsActivity,
}

impl Resource {
    /// API path for this view
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Entries => "/entries",
            Resource::Streak => "/streak",
            Resource::Achievements => "/achievements",
            Resource::AnalyticsStats => "/analytics/stats",
            Resource::AnalyticsSummary => "/analytics/summary",
            Resource::AnalyticsActivity => "/analytics/activity",
        }
    }

    pub fn family(&self) -> ResourceFamily {
        match self {
            Resource::Entries => ResourceFamily::Entries,
            Resource::Streak => ResourceFamily::Streak,
            Resource::Achievements => ResourceFamily::Achievements,
            Resource::AnalyticsStats | Resource::AnalyticsSummary | Resource::AnalyticsActivity => {
                ResourceFamily::Analytics
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Entries => "entries",
            Resource::Streak => "streak",
            Resource::Achievements => "achievements",
            Resource::AnalyticsStats => "analytics.stats",
            Resource::AnalyticsSummary => "analytics.summary",
            Resource::AnalyticsActivity => "analytics.activity",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group of resources invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Entries,
    Streak,
    Achievements,
    Analytics,
}

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub user_id: BackendUserId,
}

impl QueryKey {
    pub fn new(resource: Resource, user_id: BackendUserId) -> Self {
        Self { resource, user_id }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.user_id)
    }
}

/// Emitted when a family is marked stale for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub family: ResourceFamily,
    pub user_id: BackendUserId,
}

/// A read from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRead {
    pub data: Value,
    /// Next read should refetch
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct CachedValue {
    data: Value,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CachedValue>,
    /// Bumped on every invalidation, whether or not anything is cached yet
    generations: HashMap<(ResourceFamily, BackendUserId), u64>,
}

impl CacheState {
    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations
            .get(&(key.resource.family(), key.user_id.clone()))
            .copied()
            .unwrap_or(0)
    }
}

/// Process-wide query cache
pub struct QueryCache {
    state: RwLock<CacheState>,
    /// Age after which an entry counts as stale (None = never by age)
    stale_after: Option<Duration>,
    signals: broadcast::Sender<Invalidation>,
}

impl QueryCache {
    pub fn new(stale_after: Option<Duration>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            state: RwLock::new(CacheState::default()),
            stale_after,
            signals,
        }
    }

    /// Look up a cached value
    pub async fn get(&self, key: &QueryKey) -> Option<CachedRead> {
        let state = self.state.read().await;
        state.entries.get(key).map(|cached| CachedRead {
            data: cached.data.clone(),
            stale: cached.invalidated || self.expired(cached),
        })
    }

    /// True when the key is cached and marked stale
    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        self.get(key).await.map(|read| read.stale).unwrap_or(false)
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Invalidation generation of the key's family for its user.
    ///
    /// Taken before a fetch starts and handed back to [`QueryCache::store_fetched`].
    pub async fn generation(&self, key: &QueryKey) -> u64 {
        self.state.read().await.generation(key)
    }

    /// Store a freshly fetched value
    pub async fn store(&self, key: QueryKey, data: Value) {
        let mut state = self.state.write().await;
        Self::insert(&mut state, key, data, false);
    }

    /// Store the result of a fetch that started at `generation`.
    ///
    /// If the family was invalidated while the request was in flight, the
    /// value is kept but stays stale. Returns whether it was stored fresh.
    pub async fn store_fetched(&self, key: QueryKey, data: Value, generation: u64) -> bool {
        let mut state = self.state.write().await;
        let superseded = state.generation(&key) != generation;
        if superseded {
            tracing::debug!(key = %key, "Fetched value predates an invalidation; kept stale");
        }
        Self::insert(&mut state, key, data, superseded);
        !superseded
    }

    fn insert(state: &mut CacheState, key: QueryKey, data: Value, invalidated: bool) {
        state.entries.insert(
            key,
            CachedValue {
                data,
                fetched_at: Instant::now(),
                invalidated,
            },
        );
    }

    /// Mark every resource of `family` for `user_id` stale.
    ///
    /// Returns the number of entries touched. Does not refetch; subscribers
    /// get an [`Invalidation`] and readers refetch on their next access.
    /// Fetches already in flight for the family will store their result stale.
    pub(crate) async fn invalidate(&self, family: ResourceFamily, user_id: &BackendUserId) -> usize {
        let mut touched = 0;
        {
            let mut state = self.state.write().await;
            *state.generations.entry((family, user_id.clone())).or_insert(0) += 1;
            for (key, cached) in state.entries.iter_mut() {
                if key.resource.family() == family && &key.user_id == user_id {
                    cached.invalidated = true;
                    touched += 1;
                }
            }
        }

        tracing::debug!(family = ?family, user_id = %user_id, touched, "Invalidated cached views");

        // No receivers is fine
        let _ = self.signals.send(Invalidation {
            family,
            user_id: user_id.clone(),
        });
        touched
    }

    /// Subscribe to invalidation events
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.signals.subscribe()
    }

    /// Drop every entry belonging to a user
    pub async fn evict_user(&self, user_id: &BackendUserId) {
        self.state
            .write()
            .await
            .entries
            .retain(|key, _| &key.user_id != user_id);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    fn expired(&self, cached: &CachedValue) -> bool {
        match self.stale_after {
            Some(window) => cached.fetched_at.elapsed() >= window,
            None => false,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(30)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: &str) -> BackendUserId {
        BackendUserId::new(id)
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let cache = QueryCache::new(None);
        let key = QueryKey::new(Resource::Streak, user("u1"));

        assert!(cache.get(&key).await.is_none());
        cache.store(key.clone(), json!({"current_streak": 2})).await;

        let read = cache.get(&key).await.unwrap();
        assert_eq!(read.data["current_streak"], 2);
        assert!(!read.stale);
    }

    #[tokio::test]
    async fn test_invalidate_is_scoped_to_family_and_user() {
        let cache = QueryCache::new(None);
        for resource in [Resource::Entries, Resource::Streak, Resource::AnalyticsStats] {
            cache.store(QueryKey::new(resource, user("u1")), json!([])).await;
        }
        cache.store(QueryKey::new(Resource::Entries, user("u2")), json!([])).await;

        let touched = cache.invalidate(ResourceFamily::Entries, &user("u1")).await;
        assert_eq!(touched, 1);

        assert!(cache.is_stale(&QueryKey::new(Resource::Entries, user("u1"))).await);
        assert!(!cache.is_stale(&QueryKey::new(Resource::Streak, user("u1"))).await);
        assert!(!cache.is_stale(&QueryKey::new(Resource::AnalyticsStats, user("u1"))).await);
        assert!(!cache.is_stale(&QueryKey::new(Resource::Entries, user("u2"))).await);
    }

    #[tokio::test]
    async fn test_analytics_family_covers_all_subqueries() {
        let cache = QueryCache::new(None);
        for resource in [
            Resource::AnalyticsStats,
            Resource::AnalyticsSummary,
            Resource::AnalyticsActivity,
        ] {
            cache.store(QueryKey::new(resource, user("u1")), json!({})).await;
        }
        assert_eq!(cache.invalidate(ResourceFamily::Analytics, &user("u1")).await, 3);
    }

    #[tokio::test]
    async fn test_age_based_staleness() {
        let cache = QueryCache::new(Some(Duration::ZERO));
        let key = QueryKey::new(Resource::Achievements, user("u1"));
        cache.store(key.clone(), json!([])).await;
        assert!(cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_store_clears_invalidation() {
        let cache = QueryCache::new(None);
        let key = QueryKey::new(Resource::Entries, user("u1"));
        cache.store(key.clone(), json!([])).await;
        cache.invalidate(ResourceFamily::Entries, &user("u1")).await;
        assert!(cache.is_stale(&key).await);

        cache.store(key.clone(), json!([{"id": "e1"}])).await;
        assert!(!cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_fetch_overlapping_invalidation_stays_stale() {
        let cache = QueryCache::new(None);
        let key = QueryKey::new(Resource::Entries, user("u1"));

        // nothing cached yet when the write lands
        let generation = cache.generation(&key).await;
        assert_eq!(cache.invalidate(ResourceFamily::Entries, &user("u1")).await, 0);

        let fresh = cache.store_fetched(key.clone(), json!([]), generation).await;
        assert!(!fresh);
        assert!(cache.is_stale(&key).await);

        // a fetch started after the invalidation is fresh again
        let generation = cache.generation(&key).await;
        assert!(cache.store_fetched(key.clone(), json!([{"id": "e1"}]), generation).await);
        assert!(!cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_other_family_invalidation_does_not_taint_fetch() {
        let cache = QueryCache::new(None);
        let key = QueryKey::new(Resource::Achievements, user("u1"));

        let generation = cache.generation(&key).await;
        cache.invalidate(ResourceFamily::Entries, &user("u1")).await;
        cache.invalidate(ResourceFamily::Achievements, &user("u2")).await;

        assert!(cache.store_fetched(key.clone(), json!([]), generation).await);
        assert!(!cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_subscribers_receive_invalidations() {
        let cache = QueryCache::new(None);
        let mut rx = cache.subscribe();

        cache.invalidate(ResourceFamily::Streak, &user("u1")).await;

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.family, ResourceFamily::Streak);
        assert_eq!(signal.user_id, user("u1"));
    }

    #[tokio::test]
    async fn test_evict_user() {
        let cache = QueryCache::new(None);
        cache.store(QueryKey::new(Resource::Entries, user("u1")), json!([])).await;
        cache.store(QueryKey::new(Resource::Entries, user("u2")), json!([])).await;

        cache.evict_user(&user("u1")).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains(&QueryKey::new(Resource::Entries, user("u2"))).await);
    }
}
