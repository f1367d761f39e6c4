//! The HTTP transport seam.
//!
//! [`ApiClient`](super::ApiClient) never talks to the network directly: it builds a
//! [`TransportRequest`] and hands it to an [`HttpTransport`]. The default implementation,
//! [`ReqwestTransport`], is backed by [`reqwest`]; any other HTTP library can be plugged in
//! by implementing the trait.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, HeaderValue, PRAGMA};
use http::{HeaderMap, Method};
use indexmap::IndexMap;
use reqwest::{Body, Request};
use tracing::debug;
use url::Url;

use super::RawResponse;

/// A fully prepared request, ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute target URL.
    pub url: Url,
    /// The headers, content type included.
    pub headers: HeaderMap,
    /// The encoded body, if any.
    pub body: Option<Bytes>,
    /// How long to wait for the complete response.
    pub timeout: Duration,
    /// Whether cached responses must be bypassed.
    pub bypass_cache: bool,
}

/// The transport could not produce an HTTP response.
///
/// The message is the transport diagnostic text; it ends up in
/// [`ApiClientError::NotHttpResponse`](super::ApiClientError::NotHttpResponse).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates an error from a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates an error from an underlying error, keeping the text of its whole source chain.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        Self { message }
    }

    /// The diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Executes prepared requests.
///
/// Implementations must produce either the raw response (whatever its status code) or a
/// [`TransportError`] when no HTTP response was received. Status validation and decoding
/// happen later, on the client side.
///
/// # Example
///
/// ```rust
/// use courier_core::{HttpTransport, RawResponse, TransportError, TransportRequest};
/// use http::StatusCode;
///
/// #[derive(Debug)]
/// struct AlwaysOk;
///
/// impl HttpTransport for AlwaysOk {
///     async fn execute(&self, _request: TransportRequest) -> Result<RawResponse, TransportError> {
///         Ok(RawResponse::new(StatusCode::OK).with_body(r#"{"result":true}"#))
///     }
/// }
/// ```
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends the request and collects the response.
    fn execute(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// The default [`HttpTransport`], backed by a [`reqwest::Client`].
///
/// The client is configured by the caller; only the per-request timeout and the cache
/// bypass headers are applied here.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default [`reqwest::Client`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport from a configured [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_request(request: TransportRequest) -> Request {
        let TransportRequest {
            method,
            url,
            mut headers,
            body,
            timeout,
            bypass_cache,
        } = request;

        if bypass_cache {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        let mut result = Request::new(method, url);
        *result.headers_mut() = headers;
        *result.timeout_mut() = Some(timeout);
        if let Some(body) = body {
            *result.body_mut() = Some(Body::from(body));
        }
        result
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let request = Self::build_request(request);

        debug!(?request, "sending...");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|error| TransportError::from_error(&error))?;
        debug!(?response, "...receiving");

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::from_error(&error))?;

        Ok(RawResponse {
            status,
            headers,
            body: (!body.is_empty()).then_some(body),
        })
    }
}

/// Flattens the response headers, joining repeated values with `", "`.
///
/// Values that are not visible ASCII are decoded lossily.
pub(in crate::client) fn collect_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut result = IndexMap::<String, String>::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        result
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    result
}
