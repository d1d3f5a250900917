//! HTTP transport and JSON envelope shared by every service adapter.
//!
//! # Design
//! `HttpClient` holds a `reqwest::Client` and an immutable `ClientConfig`
//! behind an `Arc`, so clones are cheap and safe to use from concurrent
//! tasks. The layering is strict:
//!
//! - `send` performs exactly one request and returns the raw response.
//!   It never looks at the status code.
//! - `send_json` and friends encode the payload, call `send`, and classify
//!   any status >= 400 as `Error::Http`.
//! - Neither layer retries. Callers opt in with `with_retry`.
//!
//! Both the network call and the body read race against the caller's
//! `Context`, so cancellation aborts a request in flight.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::{Error, HttpError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::trace;

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl HttpClient {
    /// Default configuration, with debug tracing read from the environment.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::from_env())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Per-call network timeout. Zero disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        Arc::make_mut(&mut self.config).set_timeout(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        Arc::make_mut(&mut self.config).max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).user_agent = user_agent.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        Arc::make_mut(&mut self.config).debug = debug;
        self
    }

    /// Perform one HTTP request and return the raw response.
    ///
    /// The configured user agent is attached first, then the request's own
    /// headers in order; the last value for a name wins. Any status code is
    /// returned as `Ok`. `status_text` is the canonical reason phrase for the
    /// status code, not the phrase the server wrote, and is empty for codes
    /// without one (such as 599).
    pub async fn send(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse> {
        ctx.check()?;

        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| Error::transport(format!("invalid URL {:?}: {e}", request.url), None))?;

        let mut headers = HeaderMap::new();
        if !self.config.user_agent.is_empty() {
            headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::transport(format!("invalid header name {name:?}: {e}"), None))?;
            headers.insert(name, header_value(value)?);
        }

        if self.config.debug {
            let lines = trace::request_lines(
                request.method,
                url.as_str(),
                headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("<binary>"))),
            );
            for line in lines {
                debug!(target: trace::TARGET, "{line}");
            }
            if let Some(body) = &request.body {
                debug!(target: trace::TARGET, "{}", trace::body_line('>', body));
            }
        }

        let method = request.method;
        let mut builder = self.http.request(method.into(), url.clone()).headers(headers);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|e| Error::transport(format!("{method} {url} failed: {e}"), Some(e)))?;

            let status = response.status();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.bytes().await.map_err(|e| {
                Error::transport(format!("{method} {url}: failed to read body: {e}"), Some(e))
            })?;

            Ok::<_, Error>(HttpResponse {
                status: status.as_u16(),
                // Canonical reason for the code; empty for unregistered codes.
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body: body.to_vec(),
            })
        };

        let response = tokio::select! {
            biased;
            cause = ctx.done() => return Err(cause.into()),
            result = exchange => result?,
        };

        if self.config.debug {
            debug!(target: trace::TARGET, "{}", trace::response_line(&response));
        }
        Ok(response)
    }

    /// Send `payload` as JSON and decode the response body as `T`.
    ///
    /// Returns `Ok(None)` when the response body is empty.
    pub async fn send_json<B, T>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        url: &str,
        payload: Option<&B>,
        headers: &[(String, String)],
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.exchange_json(ctx, method, url, payload, headers).await?;
        if response.body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&response.body)
            .map(Some)
            .map_err(Error::Decoding)
    }

    /// Like `send_json`, writing the decoded value into `dest`.
    ///
    /// An empty response body leaves `dest` untouched.
    pub async fn send_json_into<B, T>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        url: &str,
        payload: Option<&B>,
        dest: &mut T,
        headers: &[(String, String)],
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if let Some(value) = self.send_json(ctx, method, url, payload, headers).await? {
            *dest = value;
        }
        Ok(())
    }

    /// Send `payload` as JSON and discard the response body.
    pub async fn send_json_discard<B>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        url: &str,
        payload: Option<&B>,
        headers: &[(String, String)],
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.exchange_json(ctx, method, url, payload, headers)
            .await
            .map(|_| ())
    }

    /// Run `operation` under this client's retry budget.
    pub async fn with_retry<F, Fut, T>(&self, ctx: &Context, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        RetryPolicy::new(self.config.max_retries)
            .run(ctx, operation)
            .await
    }

    async fn exchange_json<B>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        url: &str,
        payload: Option<&B>,
        headers: &[(String, String)],
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let mut request = HttpRequest::new(method, url);
        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(Error::Encoding)?;
            // Set before the caller's headers so an explicit Content-Type wins.
            request = request
                .header(CONTENT_TYPE.as_str(), "application/json")
                .body(body);
        }
        let request = request.headers(headers);

        let response = self.send(ctx, request).await?;
        if self.config.debug {
            debug!(target: trace::TARGET, "{}", trace::body_line('<', &response.body));
        }

        if response.is_error() {
            return Err(HttpError {
                status: response.status,
                status_text: response.status_text.clone(),
                body: response.text(),
            }
            .into());
        }
        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::transport(format!("invalid header value: {e}"), None))
}
