//! HTTP client adapter for the LearnLog REST API
//!
//! [`ApiTransport`] is the seam between the client layers and the network.
//! [`HttpTransport`] is the reqwest implementation; [`crate::mock::MockTransport`]
//! is the in-process one used by tests.
//!
//! Non-2xx responses are lifted into [`ClientError::Api`] with the body's
//! `detail` field as the message. Structured `detail` values (objects,
//! arrays) are JSON-encoded rather than dropped.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::types::BackendUserId;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// HTTP verbs used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Scope the request to a backend user (`?user_id=...`)
    pub fn for_user(self, user_id: &BackendUserId) -> Self {
        self.with_query("user_id", user_id.as_str())
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport abstraction for API calls.
///
/// Implementations return the decoded JSON body on 2xx (`Value::Null` for an
/// empty body) and a [`ClientError`] otherwise.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport for the configured base URL
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.path);
        tracing::debug!(method = %request.method, url = %url, "API request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .query(&request.query);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, url = %url, error = %e, "API transport failure");
            ClientError::Network(e.to_string())
        })?;

        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        tracing::warn!(status = status.as_u16(), error = %e, "Failed to read API response body");
        ClientError::Network(format!("reading response body: {}", e))
    })?;

    if !status.is_success() {
        let detail = extract_detail(&body);
        tracing::debug!(status = status.as_u16(), detail = ?detail, "API error response");
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }

    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}

/// Pull the `detail` field out of an error body.
///
/// Strings are returned verbatim, objects and arrays JSON-encoded. Bodies
/// that are not JSON, or carry no non-empty detail, yield `None`.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    match parsed.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Typed helpers over a shared transport
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn ApiTransport> {
        &self.transport
    }

    /// Send a request and decode the response body
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let value = self.transport.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a request and return the raw JSON body
    pub async fn call_raw(&self, request: ApiRequest) -> Result<Value> {
        self.transport.send(request).await
    }

    /// POST a serializable body and decode the response
    pub async fn post<B, T>(&self, request: ApiRequest, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = request.with_body(serde_json::to_value(body)?);
        self.call(request).await
    }
}
