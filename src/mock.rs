//! In-process transport for testing.
//!
//! Records every request and answers from scripted replies. `POST /users/sync`
//! is handled natively and is idempotent per `(provider, provider_id)`, like
//! the real backend.

use crate::error::{ClientError, Result};
use crate::http::{ApiRequest, ApiTransport, Method};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted reply for one route
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 2xx with this JSON body
    Json(Value),
    /// Non-2xx with the given (already extracted) detail
    Error { status: u16, detail: Option<String> },
    /// Transport failure
    NetworkFailure(String),
    /// Wait, then answer with the inner reply
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Shorthand for a 422 carrying `{"feedback": ...}` as structured detail
    pub fn rejected_with_feedback(feedback: &str) -> Self {
        MockReply::Error {
            status: 422,
            detail: Some(json!({ "reason": "rejected", "feedback": feedback }).to_string()),
        }
    }
}

#[derive(Default)]
struct MockState {
    requests: Vec<ApiRequest>,
    /// Replies per route; the last one repeats once the queue drains
    routes: HashMap<(Method, String), VecDeque<MockReply>>,
    synced_users: HashMap<(String, String), String>,
    sync_failure: Option<MockReply>,
}

/// Mock transport for tests
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method path`
    pub async fn reply(&self, method: Method, path: &str, reply: MockReply) {
        let mut state = self.state.lock().await;
        state
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Builder form of [`MockTransport::reply`]
    pub async fn with_reply(self, method: Method, path: &str, reply: MockReply) -> Self {
        self.reply(method, path, reply).await;
        self
    }

    /// Make `/users/sync` fail with the given reply
    pub async fn fail_sync(&self, reply: MockReply) {
        self.state.lock().await.sync_failure = Some(reply);
    }

    /// All requests seen so far
    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Number of requests for `method path`
    pub async fn call_count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Total number of requests
    pub async fn total_calls(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    async fn next_reply(&self, request: &ApiRequest) -> MockReply {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());

        if request.method == Method::Post && request.path == "/users/sync" {
            if let Some(failure) = state.sync_failure.clone() {
                return failure;
            }
            let provider = body_str(request, "provider");
            let provider_id = body_str(request, "provider_id");
            let id = state
                .synced_users
                .entry((provider, provider_id))
                .or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone();
            let email = request
                .body
                .as_ref()
                .and_then(|b| b.get("email"))
                .cloned()
                .unwrap_or(Value::Null);
            return MockReply::Json(json!({ "id": id, "email": email, "is_active": true }));
        }

        let key = (request.method, request.path.clone());
        match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> MockReply {
    MockReply::Error {
        status: 404,
        detail: Some("Not Found".to_string()),
    }
}

fn body_str(request: &ApiRequest, field: &str) -> String {
    request
        .body
        .as_ref()
        .and_then(|b| b.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

async fn resolve(reply: MockReply) -> Result<Value> {
    let mut reply = reply;
    loop {
        match reply {
            MockReply::Json(value) => return Ok(value),
            MockReply::Error { status, detail } => return Err(ClientError::Api { status, detail }),
            MockReply::NetworkFailure(msg) => return Err(ClientError::Network(msg)),
            MockReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let reply = self.next_reply(&request).await;
        resolve(reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_repeat_last() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, "/streak", MockReply::Json(json!({"n": 1}))).await;
        mock.reply(Method::Get, "/streak", MockReply::Json(json!({"n": 2}))).await;

        let first = mock.send(ApiRequest::get("/streak")).await.unwrap();
        let second = mock.send(ApiRequest::get("/streak")).await.unwrap();
        let third = mock.send(ApiRequest::get("/streak")).await.unwrap();

        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);
        assert_eq!(third["n"], 2);
        assert_eq!(mock.call_count(Method::Get, "/streak").await, 3);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let mock = MockTransport::new();
        let err = mock.send(ApiRequest::get("/nowhere")).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_per_provider_identity() {
        let mock = MockTransport::new();
        let body = json!({"email": "a@b.c", "provider": "github", "provider_id": "42"});

        let first = mock
            .send(ApiRequest::post("/users/sync").with_body(body.clone()))
            .await
            .unwrap();
        let second = mock
            .send(ApiRequest::post("/users/sync").with_body(body))
            .await
            .unwrap();
        let other = mock
            .send(ApiRequest::post("/users/sync").with_body(
                json!({"email": "a@b.c", "provider": "google", "provider_id": "42"}),
            ))
            .await
            .unwrap();

        assert_eq!(first["id"], second["id"]);
        assert_ne!(first["id"], other["id"]);
    }
}
