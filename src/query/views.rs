//! Typed read views over the shared cache

use super::cache::{QueryCache, QueryKey, Resource};
use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{
    Achievement, ActivityPoint, AnalyticsSummary, BackendUserId, Entry, Streak, UserStats,
};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// State of one view as seen by a reader
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// No backend user id; nothing was requested
    Disabled,
    /// Enabled but no value known yet
    Pending,
    /// Value known; `stale` means the next read will refetch
    Ready { data: T, stale: bool },
    /// The last fetch failed; the cache was left untouched
    Failed(ClientError),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            QueryState::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Not known yet, either disabled or waiting for a first value
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Disabled | QueryState::Pending)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, QueryState::Disabled)
    }
}

/// A cached, user-scoped read of one resource
pub struct ResourceView<T> {
    resource: Resource,
    api: ApiClient,
    cache: Arc<QueryCache>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ResourceView<T> {
    pub fn new(resource: Resource, api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self {
            resource,
            api,
            cache,
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Cached state without touching the network
    pub async fn peek(&self, user_id: Option<&BackendUserId>) -> QueryState<T> {
        let Some(user_id) = user_id else {
            return QueryState::Disabled;
        };
        let key = QueryKey::new(self.resource, user_id.clone());
        match self.cache.get(&key).await {
            Some(read) => match serde_json::from_value(read.data) {
                Ok(data) => QueryState::Ready {
                    data,
                    stale: read.stale,
                },
                Err(_) => QueryState::Pending,
            },
            None => QueryState::Pending,
        }
    }

    /// Read the view, fetching when missing or stale.
    ///
    /// Without a user id no request is made and nothing is cached.
    pub async fn fetch(&self, user_id: Option<&BackendUserId>) -> QueryState<T> {
        let Some(user_id) = user_id else {
            tracing::trace!(resource = %self.resource, "View disabled: no backend user id");
            return QueryState::Disabled;
        };

        if let state @ QueryState::Ready { stale: false, .. } = self.peek(Some(user_id)).await {
            return state;
        }
        self.load(user_id).await
    }

    /// Fetch from the server regardless of cache state
    pub async fn refetch(&self, user_id: Option<&BackendUserId>) -> QueryState<T> {
        match user_id {
            Some(user_id) => self.load(user_id).await,
            None => QueryState::Disabled,
        }
    }

    async fn load(&self, user_id: &BackendUserId) -> QueryState<T> {
        let key = QueryKey::new(self.resource, user_id.clone());
        let generation = self.cache.generation(&key).await;
        let request = ApiRequest::get(self.resource.path()).for_user(user_id);
        let raw = match self.api.call_raw(request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(resource = %self.resource, user_id = %user_id, error = %e, "Query failed");
                return QueryState::Failed(e);
            }
        };

        match serde_json::from_value::<T>(raw.clone()) {
            Ok(data) => {
                let fresh = self.cache.store_fetched(key, raw, generation).await;
                tracing::debug!(resource = %self.resource, user_id = %user_id, fresh, "Query refreshed");
                QueryState::Ready { data, stale: !fresh }
            }
            Err(e) => {
                tracing::warn!(resource = %self.resource, error = %e, "Query returned an unexpected shape");
                QueryState::Failed(e.into())
            }
        }
    }
}

/// Stats, summary and activity for one user
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSnapshot {
    pub stats: QueryState<UserStats>,
    pub summary: QueryState<AnalyticsSummary>,
    pub activity: QueryState<Vec<ActivityPoint>>,
}

impl AnalyticsSnapshot {
    pub fn is_loading(&self) -> bool {
        self.stats.is_loading() || self.summary.is_loading() || self.activity.is_loading()
    }

    pub fn is_error(&self) -> bool {
        self.stats.is_error() || self.summary.is_error() || self.activity.is_error()
    }
}

/// Analytics as three independently cached sub-queries
pub struct AnalyticsView {
    pub stats: ResourceView<UserStats>,
    pub summary: ResourceView<AnalyticsSummary>,
    pub activity: ResourceView<Vec<ActivityPoint>>,
}

impl AnalyticsView {
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self {
            stats: ResourceView::new(Resource::AnalyticsStats, api.clone(), cache.clone()),
            summary: ResourceView::new(Resource::AnalyticsSummary, api.clone(), cache.clone()),
            activity: ResourceView::new(Resource::AnalyticsActivity, api, cache),
        }
    }

    /// Fetch all three; completions are independent of each other
    pub async fn fetch(&self, user_id: Option<&BackendUserId>) -> AnalyticsSnapshot {
        let (stats, summary, activity) = futures::join!(
            self.stats.fetch(user_id),
            self.summary.fetch(user_id),
            self.activity.fetch(user_id),
        );
        AnalyticsSnapshot {
            stats,
            summary,
            activity,
        }
    }

    pub async fn peek(&self, user_id: Option<&BackendUserId>) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            stats: self.stats.peek(user_id).await,
            summary: self.summary.peek(user_id).await,
            activity: self.activity.peek(user_id).await,
        }
    }
}

/// The four read views of the journal
pub struct ResourceQueries {
    pub entries: ResourceView<Vec<Entry>>,
    pub streak: ResourceView<Streak>,
    pub achievements: ResourceView<Vec<Achievement>>,
    pub analytics: AnalyticsView,
}

impl ResourceQueries {
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self {
            entries: ResourceView::new(Resource::Entries, api.clone(), cache.clone()),
            streak: ResourceView::new(Resource::Streak, api.clone(), cache.clone()),
            achievements: ResourceView::new(Resource::Achievements, api.clone(), cache.clone()),
            analytics: AnalyticsView::new(api, cache),
        }
    }
}
