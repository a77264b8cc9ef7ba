//! Entry submission pipeline
//!
//! Drives compose -> validate -> persist -> navigate for one entry at a time:
//!
//! ```text
//! Idle --submit, no user id--------------------------> Failed(auth-required)
//! Idle --submit--> Submitting --ok-------------------> Succeeded  (navigate to entries)
//!                             --err / timeout--------> Failed(kind)
//! ```
//!
//! The outcome is held until the next `submit` or `reset`. Nothing is
//! retried and identical submissions are not deduplicated; callers disable
//! their trigger while [`SubmissionPipeline::is_submitting`] is true.

use crate::error::{ClientError, Result};
use crate::feedback::{classify, ValidationFeedback, SIGN_IN_AGAIN_DETAIL};
use crate::mutation::MutationCoordinator;
use crate::types::{BackendUserId, Entry, NewEntry};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Destinations the pipeline can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Entries,
    NewEntry,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Entries => "/entries",
            Route::NewEntry => "/entries/new",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Host-provided navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Source of the submission date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always the same day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Pipeline state
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded(Entry),
    Failed(ValidationFeedback),
}

/// Entry submission state machine
pub struct SubmissionPipeline {
    mutations: Arc<MutationCoordinator>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    timeout: Option<Duration>,
    state: RwLock<SubmissionState>,
}

impl SubmissionPipeline {
    pub fn new(mutations: Arc<MutationCoordinator>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            mutations,
            navigator,
            clock: Arc::new(SystemClock),
            timeout: None,
            state: RwLock::new(SubmissionState::Idle),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound each attempt; `None` waits as long as the transport does
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit `content` on behalf of `user_id`.
    ///
    /// Any previous feedback is replaced. Returns the resulting state.
    pub async fn submit(&self, user_id: Option<&BackendUserId>, content: &str) -> SubmissionState {
        let Some(user_id) = user_id else {
            tracing::warn!("Submission blocked: no backend user id");
            let failed =
                SubmissionState::Failed(ValidationFeedback::auth_required(SIGN_IN_AGAIN_DETAIL));
            *self.state.write().await = failed.clone();
            return failed;
        };

        *self.state.write().await = SubmissionState::Submitting;

        let entry = NewEntry::new(content, self.clock.today());
        tracing::debug!(user_id = %user_id, date = %entry.date, words = entry.word_count(), "Submitting entry");

        let outcome = match self.create(user_id, &entry).await {
            Ok(created) => {
                self.navigator.navigate(Route::Entries);
                SubmissionState::Succeeded(created)
            }
            Err(e) => {
                let feedback = classify(&e);
                tracing::warn!(user_id = %user_id, kind = %feedback.kind, error = %e, "Entry submission failed");
                SubmissionState::Failed(feedback)
            }
        };

        *self.state.write().await = outcome.clone();
        outcome
    }

    async fn create(&self, user_id: &BackendUserId, entry: &NewEntry) -> Result<Entry> {
        let write = self.mutations.create_entry(Some(user_id), entry);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .unwrap_or(Err(ClientError::Timeout(limit))),
            None => write.await,
        }
    }

    pub async fn state(&self) -> SubmissionState {
        self.state.read().await.clone()
    }

    /// Feedback of the last failed attempt, until replaced or reset
    pub async fn feedback(&self) -> Option<ValidationFeedback> {
        match &*self.state.read().await {
            SubmissionState::Failed(feedback) => Some(feedback.clone()),
            _ => None,
        }
    }

    pub async fn is_submitting(&self) -> bool {
        matches!(*self.state.read().await, SubmissionState::Submitting)
    }

    /// Drop the held outcome (e.g. the compose view went away)
    pub async fn reset(&self) {
        *self.state.write().await = SubmissionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackKind, FALLBACK_DETAIL, SAVED_HEADLINE, SAVED_UNREADABLE_DETAIL};
    use crate::http::{ApiClient, Method};
    use crate::mock::{MockReply, MockTransport};
    use crate::query::QueryCache;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<Route>>,
    }

    impl RecordingNavigator {
        fn routes(&self) -> Vec<Route> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn pipeline(mock: Arc<MockTransport>) -> (SubmissionPipeline, Arc<RecordingNavigator>) {
        let mutations = Arc::new(MutationCoordinator::new(
            ApiClient::new(mock),
            Arc::new(QueryCache::new(None)),
        ));
        let navigator = Arc::new(RecordingNavigator::default());
        let pipeline = SubmissionPipeline::new(mutations, navigator.clone())
            .with_clock(Arc::new(FixedClock(day())));
        (pipeline, navigator)
    }

    #[tokio::test]
    async fn test_success_navigates_to_entries() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Json(json!({
                "id": "e-1", "content": "Today I learned Go channels.", "date": "2026-10-16",
                "word_count": 5, "created_at": "2026-10-16T09:00:00"
            })),
        )
        .await;
        let (pipeline, navigator) = pipeline(mock.clone());
        let user = BackendUserId::new("u1");

        let state = pipeline.submit(Some(&user), "Today I learned Go channels.").await;

        assert!(matches!(state, SubmissionState::Succeeded(_)));
        assert_eq!(navigator.routes(), vec![Route::Entries]);
        assert!(pipeline.feedback().await.is_none());

        let sent = mock.requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            Some(json!({"content": "Today I learned Go channels.", "date": "2026-10-16"}))
        );
    }

    #[tokio::test]
    async fn test_missing_identity_short_circuits() {
        let mock = Arc::new(MockTransport::new());
        let (pipeline, navigator) = pipeline(mock.clone());

        let state = pipeline.submit(None, "Today I learned Go channels.").await;

        match state {
            SubmissionState::Failed(feedback) => {
                assert_eq!(feedback.kind, FeedbackKind::AuthRequired);
                assert_eq!(feedback.detail, SIGN_IN_AGAIN_DETAIL);
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(mock.total_calls().await, 0);
        assert!(navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_feedback_replaced_by_next_attempt() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::rejected_with_feedback("Too generic, add specifics."),
        )
        .await;
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Error {
                status: 500,
                detail: None,
            },
        )
        .await;
        let (pipeline, navigator) = pipeline(mock);
        let user = BackendUserId::new("u1");

        pipeline.submit(Some(&user), "I did stuff today.").await;
        let first = pipeline.feedback().await.unwrap();
        assert_eq!(first.kind, FeedbackKind::ValidationFailed);
        assert_eq!(first.detail, "Too generic, add specifics.");

        pipeline.submit(Some(&user), "I did stuff today.").await;
        let second = pipeline.feedback().await.unwrap();
        assert_eq!(second.kind, FeedbackKind::NetworkError);
        assert_eq!(second.detail, FALLBACK_DETAIL);

        assert!(navigator.routes().is_empty());
        pipeline.reset().await;
        assert_eq!(pipeline.state().await, SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_repeated_submissions_are_not_deduplicated() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::rejected_with_feedback("Repetitive."),
        )
        .await;
        let (pipeline, _) = pipeline(mock.clone());
        let user = BackendUserId::new("u1");

        pipeline.submit(Some(&user), "same words again").await;
        pipeline.submit(Some(&user), "same words again").await;

        assert_eq!(mock.call_count(Method::Post, "/entries").await, 2);
    }

    #[tokio::test]
    async fn test_timeout_classifies_as_network_error() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Delayed(
                Duration::from_secs(5),
                Box::new(MockReply::Json(json!({}))),
            ),
        )
        .await;
        let (pipeline, navigator) = pipeline(mock);
        let pipeline = pipeline.with_timeout(Some(Duration::from_millis(20)));
        let user = BackendUserId::new("u1");

        let state = pipeline.submit(Some(&user), "Today I learned Go channels.").await;

        match state {
            SubmissionState::Failed(feedback) => {
                assert_eq!(feedback.kind, FeedbackKind::NetworkError);
                assert_eq!(feedback.detail, FALLBACK_DETAIL);
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert!(navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_submitting_visible_while_in_flight() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Delayed(
                Duration::from_millis(200),
                Box::new(MockReply::rejected_with_feedback("Shallow.")),
            ),
        )
        .await;
        let (pipeline, _) = pipeline(mock);
        let pipeline = Arc::new(pipeline);
        let user = BackendUserId::new("u1");

        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.submit(Some(&user), "Shallow entry text").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pipeline.is_submitting().await);

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, SubmissionState::Failed(_)));
        assert!(!pipeline.is_submitting().await);
    }

    #[tokio::test]
    async fn test_prior_feedback_cleared_when_next_attempt_starts() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::rejected_with_feedback("Too generic, add specifics."),
        )
        .await;
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Delayed(
                Duration::from_millis(200),
                Box::new(MockReply::rejected_with_feedback("Still shallow.")),
            ),
        )
        .await;
        let (pipeline, _) = pipeline(mock);
        let pipeline = Arc::new(pipeline);
        let user = BackendUserId::new("u1");

        pipeline.submit(Some(&user), "I did stuff today.").await;
        assert!(pipeline.feedback().await.is_some());

        let task = {
            let pipeline = pipeline.clone();
            let user = user.clone();
            tokio::spawn(async move { pipeline.submit(Some(&user), "I did more stuff today.").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pipeline.is_submitting().await);
        assert!(pipeline.feedback().await.is_none());

        task.await.unwrap();
        assert_eq!(pipeline.feedback().await.unwrap().detail, "Still shallow.");
    }

    #[tokio::test]
    async fn test_saved_but_unreadable_reply_is_reported_apart() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            Method::Post,
            "/entries",
            MockReply::Json(json!({"id": "e-1", "created_at": "yesterday"})),
        )
        .await;
        let (pipeline, navigator) = pipeline(mock);
        let user = BackendUserId::new("u1");

        let state = pipeline.submit(Some(&user), "Today I learned Go channels.").await;

        match state {
            SubmissionState::Failed(feedback) => {
                assert_eq!(feedback.headline, SAVED_HEADLINE);
                assert_eq!(feedback.detail, SAVED_UNREADABLE_DETAIL);
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert!(navigator.routes().is_empty());
    }
}
