//! Journal client: wires identity, queries, mutations and submission
//!
//! Every component receives its collaborators explicitly; the shared cache
//! is one `Arc<QueryCache>` handed to both the read views and the mutation
//! coordinator.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ApiClient, ApiTransport, HttpTransport};
use crate::identity::{CurrentUser, IdentityBridge, ProviderProfile, SessionToken};
use crate::mutation::MutationCoordinator;
use crate::query::{AnalyticsSnapshot, QueryCache, QueryState, ResourceQueries};
use crate::submission::{Navigator, SubmissionPipeline};
use crate::types::{Achievement, Entry, Streak};
use std::sync::Arc;

/// Client for the LearnLog journal
///
/// # Example
///
/// ```rust,no_run
/// use learnlog_client::{ClientConfig, JournalClient, ProviderProfile};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JournalClient::new(ClientConfig::default())?;
///
/// client
///     .sign_in(ProviderProfile {
///         subject_id: "1234".into(),
///         provider: "github".into(),
///         email: Some("ada@example.com".into()),
///         name: Some("Ada".into()),
///         image: None,
///     })
///     .await;
///
/// if let Some(streak) = client.streak().await.data() {
///     println!("current streak: {}", streak.current_streak);
/// }
/// # Ok(())
/// # }
/// ```
pub struct JournalClient {
    config: ClientConfig,
    api: ApiClient,
    cache: Arc<QueryCache>,
    identity: Arc<IdentityBridge>,
    queries: ResourceQueries,
    mutations: Arc<MutationCoordinator>,
}

impl JournalClient {
    /// Create a client talking HTTP to `config.base_url`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client from environment configuration
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ApiTransport>) -> Self {
        let api = ApiClient::new(transport);
        let cache = Arc::new(QueryCache::new(config.stale_after));

        Self {
            identity: Arc::new(IdentityBridge::new(api.clone())),
            queries: ResourceQueries::new(api.clone(), cache.clone()),
            mutations: Arc::new(MutationCoordinator::new(api.clone(), cache.clone())),
            config,
            api,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn identity(&self) -> &Arc<IdentityBridge> {
        &self.identity
    }

    pub fn queries(&self) -> &ResourceQueries {
        &self.queries
    }

    pub fn mutations(&self) -> &Arc<MutationCoordinator> {
        &self.mutations
    }

    /// Build a submission pipeline that navigates through `navigator`
    pub fn submission_pipeline(&self, navigator: Arc<dyn Navigator>) -> SubmissionPipeline {
        SubmissionPipeline::new(self.mutations.clone(), navigator)
            .with_timeout(self.config.submission_timeout)
    }

    pub async fn sign_in(&self, profile: ProviderProfile) -> SessionToken {
        self.identity.sign_in(profile).await
    }

    pub async fn restore(&self, token: SessionToken) {
        self.identity.restore(token).await
    }

    /// Sign out and drop the user's cached views
    pub async fn sign_out(&self) {
        if let Some(user_id) = self.identity.backend_user_id().await {
            self.cache.evict_user(&user_id).await;
        }
        self.identity.sign_out().await;
    }

    pub async fn current_user(&self) -> CurrentUser {
        self.identity.current().await
    }

    pub async fn entries(&self) -> QueryState<Vec<Entry>> {
        let user_id = self.identity.backend_user_id().await;
        self.queries.entries.fetch(user_id.as_ref()).await
    }

    pub async fn streak(&self) -> QueryState<Streak> {
        let user_id = self.identity.backend_user_id().await;
        self.queries.streak.fetch(user_id.as_ref()).await
    }

    pub async fn achievements(&self) -> QueryState<Vec<Achievement>> {
        let user_id = self.identity.backend_user_id().await;
        self.queries.achievements.fetch(user_id.as_ref()).await
    }

    pub async fn analytics(&self) -> AnalyticsSnapshot {
        let user_id = self.identity.backend_user_id().await;
        self.queries.analytics.fetch(user_id.as_ref()).await
    }
}
