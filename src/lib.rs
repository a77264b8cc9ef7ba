//! LearnLog client SDK
//!
//! Client-side synchronization and submission layer for the LearnLog
//! journal, where every new entry passes an AI authenticity check on the
//! server before it is stored.
//!
//! # Architecture
//!
//! ```text
//! host UI
//!    │
//!    ▼
//! IdentityBridge ──► SubmissionPipeline ──► MutationCoordinator ──► ApiTransport ──► server
//!    │                      │                       │
//!    │                      ▼                       ▼ invalidates entries + streak
//!    │              ValidationFeedback         QueryCache ◄── ResourceQueries
//!    └──────────── backend user id ─────────────────────────────┘
//! ```
//!
//! - **Identity**: OAuth result → backend user id via `POST /users/sync`
//! - **Queries**: entries, streak, achievements, analytics; disabled until a
//!   backend user id exists
//! - **Mutations**: entry creation, the only writer of cache staleness
//! - **Submission**: compose → validate → persist → navigate, with failures
//!   classified into auth-required / validation-failed / network-error
//!
//! # Example
//!
//! ```rust,no_run
//! use learnlog_client::{JournalClient, Navigator, Route, SubmissionState};
//! use std::sync::Arc;
//!
//! struct PrintNavigator;
//!
//! impl Navigator for PrintNavigator {
//!     fn navigate(&self, route: Route) {
//!         println!("-> {}", route.path());
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JournalClient::from_env()?;
//! let pipeline = client.submission_pipeline(Arc::new(PrintNavigator));
//!
//! let user_id = client.identity().backend_user_id().await;
//! if let SubmissionState::Failed(feedback) =
//!     pipeline.submit(user_id.as_ref(), "Today I learned Go channels.").await
//! {
//!     eprintln!("{}", feedback);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod feedback;
pub mod http;
pub mod identity;
pub mod mock;
pub mod mutation;
pub mod query;
pub mod submission;
pub mod theme;
pub mod types;

pub use client::JournalClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use feedback::{classify, ErrorDetail, FeedbackKind, ValidationFeedback, FALLBACK_DETAIL};
pub use http::{ApiClient, ApiRequest, ApiTransport, HttpTransport, Method};
pub use identity::{AuthState, CurrentUser, IdentityBridge, ProviderProfile, SessionToken};
pub use mutation::MutationCoordinator;
pub use query::{
    AnalyticsSnapshot, Invalidation, QueryCache, QueryKey, QueryState, Resource, ResourceFamily,
    ResourceQueries,
};
pub use submission::{Clock, Navigator, Route, SubmissionPipeline, SubmissionState, SystemClock};
pub use theme::{PreferenceStore, Theme, ThemePreference};
pub use types::*;
