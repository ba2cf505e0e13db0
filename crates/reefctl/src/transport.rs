//! HTTP transport seam.
//!
//! Command callbacks hand a finalized [`ApiRequest`] to a [`Transport`] and
//! get back a structured response or a typed failure. This layer owns no
//! retry, timeout, or cancellation policy: one blocking call per process
//! invocation, everything else belongs to the server side of the seam.

use std::cell::RefCell;
use std::fmt;

use reef_spec::HttpMethod;
use serde_json::Value;
use tracing::debug;
use url::Url;

use thiserror::Error;

/// A finalized request: method, resource path, query, optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute resource path, already percent-encoded.
    pub path: String,
    /// Query string pairs in append order.
    pub query: Vec<(String, String)>,
    /// JSON body, if the operation carries one.
    pub body: Option<Value>,
}

/// A structured response from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, or the raw text wrapped in a string value.
    pub body: Value,
}

/// Errors from the HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange could not be completed at all.
    #[error("connection error: {0}")]
    Connection(String),

    /// The service answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// The configured base URL is not usable.
    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

/// The blocking transport seam command callbacks delegate to.
pub trait Transport {
    /// Perform one HTTP exchange.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Real transport over `reqwest`'s blocking client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base: Url,
    token: Option<String>,
}

impl HttpTransport {
    /// Build a transport for a base URL and optional bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, TransportError> {
        let base = Url::parse(base_url).map_err(|e| TransportError::BaseUrl(e.to_string()))?;
        Ok(Self {
            client: reqwest::blocking::Client::new(),
            base,
            token,
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "…"))
            .finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        // The path is already encoded; joining strings keeps it that way
        // (Url::join would re-normalize percent sequences in some cases).
        let raw = format!(
            "{}{}",
            self.base.as_str().trim_end_matches('/'),
            request.path
        );
        let mut url = Url::parse(&raw).map_err(|e| TransportError::BaseUrl(e.to_string()))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        debug!(method = %request.method, url = %url, "sending request");

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: text,
            });
        }
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Transport whose target is configured after the command tree is built.
///
/// Command callbacks capture their transport when the tree is generated,
/// but the base URL and token come from the parsed command line; this
/// wrapper closes that startup ordering gap.
#[derive(Default)]
pub struct DeferredTransport {
    inner: RefCell<Option<Box<dyn Transport>>>,
}

impl DeferredTransport {
    /// An unconfigured transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the real transport.
    pub fn configure(&self, transport: impl Transport + 'static) {
        *self.inner.borrow_mut() = Some(Box::new(transport));
    }
}

impl Transport for DeferredTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.inner
            .borrow()
            .as_ref()
            .ok_or_else(|| TransportError::Connection("transport not configured".into()))?
            .send(request)
    }
}

/// In-memory transport that records every request and answers with a
/// canned response. Used by the test suites in place of a live gateway.
#[derive(Debug)]
pub struct RecordingTransport {
    requests: RefCell<Vec<ApiRequest>>,
    response: Value,
}

impl RecordingTransport {
    /// A recording transport answering every request with `response`.
    #[must_use]
    pub fn new(response: Value) -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            response,
        }
    }

    /// All recorded requests, in send order.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        Ok(ApiResponse {
            status: 200,
            body: self.response.clone(),
        })
    }
}
