//! Network seam for the listings API.
//!
//! Submissions only ever go out through [`HttpClient`], so the controller can be
//! driven against [`MockHttpClient`] in tests and [`ReqwestHttpClient`] for real.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::{ListingError, Result};

/// An outgoing API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiRequest {
    /// Base URL of the listings API, without a trailing slash
    pub endpoint: String,
    pub method: String,
    /// Path below the endpoint, query included (`/create?console_test=1`)
    pub path: String,
    /// Serialized JSON body
    pub body: String,
}

impl ApiRequest {
    pub fn post_json(endpoint: &str, path: &str, body: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: Method::POST.to_string(),
            path: path.to_string(),
            body,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint, self.path)
    }
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends an [`ApiRequest`] and hands back whatever the server answered.
///
/// Any completed exchange is `Ok`, whatever its status; `Err` means no
/// response arrived (connection failure, timeout, malformed URL). `bearer` is
/// sent as `Authorization: Bearer <bearer>` unless it is empty.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request, bearer), fields(method = %request.method, path = %request.path))]
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            tracing::error!(method = %request.method, error = %e, "Unsupported method");
            anyhow::anyhow!("unsupported method {}: {e}", request.method)
        })?;
        let url = request.url();

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(Duration::from_millis(timeout_ms));
        if !bearer.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {bearer}"));
        }
        if !request.body.is_empty() {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(request.body.clone());
        }

        tracing::debug!(url = %url, timeout_ms, authorized = !bearer.is_empty(), "Sending request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Request did not complete");
                return Err(ListingError::HttpClient(e));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, body_len = body.len(), "Response received");

        Ok(HttpResponse { status, body })
    }
}

/// What a [`MockHttpClient`] sends back for one queued call.
enum Scripted {
    Now(Result<HttpResponse>),
    /// Held until the paired sender fires or is dropped
    Held {
        response: Result<HttpResponse>,
        release: oneshot::Receiver<()>,
    },
}

/// One call seen by a [`MockHttpClient`].
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub endpoint: String,
    pub path: String,
    pub body: String,
    /// Empty when no Authorization header would have been sent
    pub bearer: String,
    pub timeout_ms: u64,
}

impl MockCall {
    pub fn has_authorization(&self) -> bool {
        !self.bearer.is_empty()
    }

    /// The body as JSON, or `Null` when it does not parse.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Scripted [`HttpClient`] for tests.
///
/// Responses are queued per `"{METHOD} {path}"` and consumed first in, first
/// out. A call with nothing queued fails as a transport error.
///
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_json_response("POST /create", 401, json!({"error": "expired"}));
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(&self, key: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub fn add_response(&self, key: &str, response: Result<HttpResponse>) {
        self.enqueue(key, Scripted::Now(response));
    }

    pub fn add_json_response(&self, key: &str, status: u16, body: serde_json::Value) {
        self.add_response(
            key,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Queue a response that stays pending until the returned sender fires.
    pub fn add_response_with_trigger(
        &self,
        key: &str,
        response: Result<HttpResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, release) = oneshot::channel();
        self.enqueue(key, Scripted::Held { response, release });
        tx
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        self.calls.lock().push(MockCall {
            method: request.method.clone(),
            endpoint: request.endpoint.clone(),
            path: request.path.clone(),
            body: request.body.clone(),
            bearer: bearer.to_string(),
            timeout_ms,
        });

        let key = format!("{} {}", request.method, request.path);
        let scripted = self
            .scripts
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Scripted::Now(response)) => response,
            Some(Scripted::Held { response, release }) => {
                let _ = release.await;
                response
            }
            None => Err(ListingError::Other(anyhow::anyhow!(
                "nothing scripted for {key}"
            ))),
        }
    }
}
