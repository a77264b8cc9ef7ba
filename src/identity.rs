//! Identity bridge
//!
//! Maps a third-party authentication result to the backend-issued user id.
//! The exchange with `POST /users/sync` runs once per sign-in; its result is
//! embedded in the [`SessionToken`] so a restored session never repeats it.
//!
//! A failed exchange does not block sign-in: the session lands in
//! [`AuthState::Authenticated`] with no backend id, and every
//! resource-dependent operation treats that as "identity not yet available".

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::types::{BackendUserId, SyncUserRequest, SyncUserResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Identity as supplied by the OAuth provider after a successful handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider-issued subject id
    pub subject_id: String,
    /// Provider name (e.g. "github", "google")
    pub provider: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Avatar URL
    pub image: Option<String>,
}

impl ProviderProfile {
    fn sync_request(&self) -> Option<SyncUserRequest> {
        let email = self.email.as_ref().filter(|e| !e.trim().is_empty())?;
        Some(SyncUserRequest {
            email: email.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            provider: self.provider.clone(),
            provider_id: self.subject_id.clone(),
        })
    }
}

/// Session token carried across page loads.
///
/// Opaque to the host; serialize it with serde to persist it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub profile: ProviderProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_user_id: Option<BackendUserId>,
}

/// Authentication phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Handshake done, backend exchange in flight
    Authenticating,
    Authenticated,
}

/// Snapshot of who is signed in
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub auth_state: AuthState,
    pub profile: Option<ProviderProfile>,
    pub backend_user_id: Option<BackendUserId>,
}

impl CurrentUser {
    fn unauthenticated() -> Self {
        Self {
            auth_state: AuthState::Unauthenticated,
            profile: None,
            backend_user_id: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.auth_state == AuthState::Authenticating
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state == AuthState::Authenticated
    }

    /// Signed in, but the backend id never arrived
    pub fn is_identity_pending(&self) -> bool {
        self.is_authenticated() && self.backend_user_id.is_none()
    }
}

#[derive(Debug, Clone)]
enum Session {
    SignedOut,
    Authenticating(ProviderProfile),
    SignedIn(SessionToken),
}

/// Bridge between the OAuth session and the backend user identity
pub struct IdentityBridge {
    api: ApiClient,
    session: RwLock<Session>,
}

impl IdentityBridge {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session: RwLock::new(Session::SignedOut),
        }
    }

    /// Exchange a provider identity for the backend user id.
    ///
    /// Idempotent on the server: the same provider identity always yields the
    /// same id.
    pub async fn sync_user(&self, profile: &ProviderProfile) -> Result<BackendUserId> {
        let request = profile.sync_request().ok_or_else(|| {
            ClientError::IncompleteIdentity(format!("{} identity has no email", profile.provider))
        })?;
        let response: SyncUserResponse = self
            .api
            .post(ApiRequest::post("/users/sync"), &request)
            .await?;
        Ok(response.id)
    }

    /// Complete sign-in for a fresh OAuth result.
    ///
    /// Never fails: a sync failure is logged and the returned token simply
    /// carries no backend id.
    pub async fn sign_in(&self, profile: ProviderProfile) -> SessionToken {
        *self.session.write().await = Session::Authenticating(profile.clone());

        let backend_user_id = if profile.sync_request().is_none() {
            tracing::warn!(
                provider = %profile.provider,
                "Provider supplied no email; skipping backend user sync"
            );
            None
        } else {
            match self.sync_user(&profile).await {
                Ok(id) => {
                    tracing::info!(provider = %profile.provider, user_id = %id, "Synced user with backend");
                    Some(id)
                }
                Err(e) => {
                    tracing::warn!(provider = %profile.provider, error = %e, "Failed to sync user with backend");
                    None
                }
            }
        };

        let token = SessionToken {
            profile,
            backend_user_id,
        };
        *self.session.write().await = Session::SignedIn(token.clone());
        token
    }

    /// Re-establish a session from a persisted token without re-syncing
    pub async fn restore(&self, token: SessionToken) {
        tracing::debug!(
            provider = %token.profile.provider,
            synced = token.backend_user_id.is_some(),
            "Restoring session"
        );
        *self.session.write().await = Session::SignedIn(token);
    }

    pub async fn sign_out(&self) {
        *self.session.write().await = Session::SignedOut;
    }

    /// Current session token, if signed in
    pub async fn session_token(&self) -> Option<SessionToken> {
        match &*self.session.read().await {
            Session::SignedIn(token) => Some(token.clone()),
            _ => None,
        }
    }

    pub async fn current(&self) -> CurrentUser {
        match &*self.session.read().await {
            Session::SignedOut => CurrentUser::unauthenticated(),
            Session::Authenticating(profile) => CurrentUser {
                auth_state: AuthState::Authenticating,
                profile: Some(profile.clone()),
                backend_user_id: None,
            },
            Session::SignedIn(token) => CurrentUser {
                auth_state: AuthState::Authenticated,
                profile: Some(token.profile.clone()),
                backend_user_id: token.backend_user_id.clone(),
            },
        }
    }

    /// Backend user id of the signed-in user, if known
    pub async fn backend_user_id(&self) -> Option<BackendUserId> {
        match &*self.session.read().await {
            Session::SignedIn(token) => token.backend_user_id.clone(),
            _ => None,
        }
    }
}
