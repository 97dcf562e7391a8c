/*!
 * HTTP client for talking to the Mite backend.
 *
 * Uses `ureq` — a pure-Rust blocking HTTP client with no async runtime.
 * Blocking I/O is fine here: error reports are sent from the dedicated
 * delivery worker thread, and bug submission / release queries are
 * synchronous, fallible, user-initiated calls.
 *
 * One `ApiClient` is constructed by the facade and shared (via `Arc`)
 * with both reporters. It is not a global: callers own it explicitly.
 *
 * Retry policy: a failed attempt (transport error or non-2xx status) is
 * resubmitted after an exponential backoff of `min(1000 · 2^n, 10000)`
 * milliseconds, up to `max_retries` times. The retry counter is a local
 * variable scoped to each request invocation — independent requests never
 * share retry state.
 */

use std::collections::HashMap;
use std::sync::RwLock;
use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::MiteError;
use crate::protocol::constants::DEFAULT_TIMEOUT;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Construction options for `ApiClient`.
 */
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Backend base URL. A trailing slash is trimmed.
    pub base_url: String,

    /// Total per-request timeout. Defaults to 10 s.
    pub timeout: Option<Duration>,

    /// Maximum retry attempts per failed request. 0 means single attempt.
    pub max_retries: u32,

    /// Default headers applied to every request. Merged with
    /// `Content-Type: application/json` (explicit entries win).
    pub headers: HashMap<String, String>,
}

impl ApiClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            max_retries: 0,
            headers: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

pub struct ApiClient {
    agent: Agent,
    base_url: String,

    /// Mutable via `update_headers`; applied to future requests only.
    default_headers: RwLock<HashMap<String, String>>,

    max_retries: u32,
}

impl ApiClient {
    pub fn new(options: ApiClientOptions) -> Result<Self, MiteError> {
        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut default_headers = options.headers;
        default_headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "application/json".to_string());

        Ok(Self {
            agent,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            default_headers: RwLock::new(default_headers),
            max_retries: options.max_retries,
        })
    }

    /**
     * Merges `headers` into the default headers for all future requests.
     * In-flight requests are unaffected.
     */
    pub fn update_headers(&self, headers: HashMap<String, String>) {
        if let Ok(mut defaults) = self.default_headers.write() {
            defaults.extend(headers);
        }
    }

    // -----------------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------------

    pub fn get<D: DeserializeOwned>(&self, path: &str) -> Result<D, MiteError> {
        self.get_with_headers(path, &[])
    }

    /**
     * GET with additional per-request headers (e.g. a `Bearer` token).
     * Per-request headers override same-named defaults.
     */
    pub fn get_with_headers<D: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<D, MiteError> {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(extra);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.get(&url), &headers).call())?;
        Self::decode(response)
    }

    pub fn post<B, D>(&self, path: &str, body: &B) -> Result<D, MiteError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(&[]);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.post(&url), &headers).send_json(body))?;
        Self::decode(response)
    }

    /**
     * POST with a JSON body where the response body is irrelevant —
     * the fire-and-forget path used by the delivery worker. The status
     * is still checked and failures still propagate to the caller.
     */
    pub fn post_discard<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), MiteError> {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(&[]);
        self.send_with_retry(|| apply_headers(self.agent.post(&url), &headers).send_json(body))?;
        Ok(())
    }

    /**
     * POST with no body — the upload-URL handshake request.
     */
    pub fn post_empty<D: DeserializeOwned>(&self, path: &str) -> Result<D, MiteError> {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(&[]);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.post(&url), &headers).send_empty())?;
        Self::decode(response)
    }

    pub fn put<B, D>(&self, path: &str, body: &B) -> Result<D, MiteError>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(&[]);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.put(&url), &headers).send_json(body))?;
        Self::decode(response)
    }

    /**
     * PUT raw bytes with an explicit content type — the attachment upload
     * leg of the handshake. `url` is typically absolute (server-issued).
     */
    pub fn put_bytes<D: DeserializeOwned>(
        &self,
        url: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<D, MiteError> {
        let url = self.resolve_url(url)?;
        let headers = self.header_pairs(&[("Content-Type", content_type)]);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.put(&url), &headers).send(bytes))?;
        Self::decode(response)
    }

    pub fn delete<D: DeserializeOwned>(&self, path: &str) -> Result<D, MiteError> {
        let url = self.resolve_url(path)?;
        let headers = self.header_pairs(&[]);
        let response =
            self.send_with_retry(|| apply_headers(self.agent.delete(&url), &headers).call())?;
        Self::decode(response)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /**
     * Runs one logical request, resubmitting the original configuration
     * after exponential backoff until it succeeds or retries are exhausted.
     *
     * Failure logging is categorized:
     * - the server responded with an error status,
     * - no response was received (connection, DNS, timeout),
     * - the request could not be set up at all (unserializable body) —
     *   this last category is not retried.
     */
    fn send_with_retry<F>(&self, mut attempt: F) -> Result<ureq::http::Response<Body>, MiteError>
    where
        F: FnMut() -> Result<ureq::http::Response<Body>, ureq::Error>,
    {
        /* Retry state is scoped to this invocation, never to the client. */
        let mut retry_count: u32 = 0;

        loop {
            let failure = match attempt() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response
                        .into_body()
                        .read_to_string()
                        .unwrap_or_else(|_| "<unreadable body>".into());
                    error!(status, body = %body, "server responded with an error status");
                    MiteError::Server { status, body }
                }
                Err(source) => {
                    if matches!(source, ureq::Error::Json(_)) {
                        error!(error = %source, "request setup failed");
                        return Err(MiteError::RequestSetup(source.to_string()));
                    }
                    error!(error = %source, "no response received");
                    MiteError::Network { source }
                }
            };

            if retry_count >= self.max_retries {
                return Err(failure);
            }

            retry_count += 1;
            let backoff = Duration::from_millis(backoff_millis(retry_count));
            warn!(
                attempt = retry_count,
                backoff_ms = backoff.as_millis() as u64,
                "retrying failed request"
            );
            thread::sleep(backoff);
        }
    }

    fn decode<D: DeserializeOwned>(response: ureq::http::Response<Body>) -> Result<D, MiteError> {
        response
            .into_body()
            .read_json::<D>()
            .map_err(|source| MiteError::Decode { source })
    }

    /**
     * Joins a path to the base URL. Absolute `http(s)://` URLs pass
     * through untouched (server-issued upload URLs).
     */
    fn resolve_url(&self, path: &str) -> Result<String, MiteError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        if !path.starts_with('/') {
            return Err(MiteError::RequestSetup(format!(
                "path must be absolute or start with '/': {path}"
            )));
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    /**
     * Snapshot of default headers with per-request extras merged on top
     * (case-insensitive name match; extras win).
     */
    fn header_pairs(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let defaults = self
            .default_headers
            .read()
            .map(|map| map.clone())
            .unwrap_or_default();

        let mut pairs: Vec<(String, String)> = defaults
            .into_iter()
            .filter(|(name, _)| !extra.iter().any(|(e, _)| e.eq_ignore_ascii_case(name)))
            .collect();
        pairs.extend(extra.iter().map(|(name, value)| (name.to_string(), value.to_string())));
        pairs
    }
}

fn apply_headers<Any>(
    mut builder: RequestBuilder<Any>,
    headers: &[(String, String)],
) -> RequestBuilder<Any> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/**
 * Backoff before retry attempt `retry_count` (1-based):
 * `min(1000 · 2^retry_count, 10000)` milliseconds.
 */
pub(crate) fn backoff_millis(retry_count: u32) -> u64 {
    1000u64
        .saturating_mul(2u64.saturating_pow(retry_count))
        .min(10_000)
}
