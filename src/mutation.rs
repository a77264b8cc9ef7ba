//! Mutation coordinator: the entry-creation write path

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::query::{QueryCache, ResourceFamily};
use crate::types::{BackendUserId, Entry, NewEntry};
use std::sync::Arc;

/// Views marked stale after a successful entry creation.
///
/// Achievements and analytics lag server-side and refresh on their own.
pub const ENTRY_CREATED_INVALIDATES: [ResourceFamily; 2] =
    [ResourceFamily::Entries, ResourceFamily::Streak];

/// Performs writes and owns cache invalidation
pub struct MutationCoordinator {
    api: ApiClient,
    cache: Arc<QueryCache>,
}

impl MutationCoordinator {
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self { api, cache }
    }

    /// Create an entry for `user_id`.
    ///
    /// Content is forwarded as-is; the server is the authority on length and
    /// quality. On failure the server error is returned untouched and the
    /// cache is left exactly as it was.
    ///
    /// Any 2xx answer means the entry is persisted, so entries and streak are
    /// invalidated before the body is decoded. A body that does not decode
    /// yields [`ClientError::SavedUnreadable`].
    pub async fn create_entry(
        &self,
        user_id: Option<&BackendUserId>,
        entry: &NewEntry,
    ) -> Result<Entry> {
        let user_id = user_id.ok_or(ClientError::IdentityUnavailable)?;

        let request = ApiRequest::post("/entries")
            .for_user(user_id)
            .with_body(serde_json::to_value(entry)?);
        let raw = match self.api.call_raw(request).await {
            Ok(raw) => Ok(raw),
            // transports only report Decode for 2xx bodies
            Err(ClientError::Decode(msg)) => Err(msg),
            Err(e) => return Err(e),
        };

        self.invalidate_after_create(user_id).await;

        let decoded = raw.and_then(|raw| serde_json::from_value::<Entry>(raw).map_err(|e| e.to_string()));
        let created = match decoded {
            Ok(created) => created,
            Err(msg) => {
                tracing::warn!(user_id = %user_id, error = %msg, "Entry saved but response unreadable");
                return Err(ClientError::SavedUnreadable(msg));
            }
        };

        tracing::info!(
            user_id = %user_id,
            entry_id = %created.id,
            date = %created.date,
            word_count = created.word_count,
            "Entry created"
        );
        Ok(created)
    }

    async fn invalidate_after_create(&self, user_id: &BackendUserId) {
        for family in ENTRY_CREATED_INVALIDATES {
            self.cache.invalidate(family, user_id).await;
        }
    }
}
