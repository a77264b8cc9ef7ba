//! Resource query layer
//!
//! Four independently keyed views (entries, streak, achievements, analytics)
//! over one shared [`QueryCache`]. A view with no backend user id reports
//! [`QueryState::Disabled`] and never issues a request.

mod cache;
mod views;

pub use cache::{CachedRead, Invalidation, QueryCache, QueryKey, Resource, ResourceFamily};
pub use views::{AnalyticsSnapshot, AnalyticsView, QueryState, ResourceQueries, ResourceView};
