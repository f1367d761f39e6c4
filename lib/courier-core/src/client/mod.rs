use std::sync::Arc;
use std::time::Duration;

use http::Method;
use indexmap::IndexMap;

mod builder;
pub use self::builder::{ApiClientBuilder, DEFAULT_TIMEOUT};

mod call;
pub use self::call::ApiCall;

mod request;
pub use self::request::{CallRequest, RequestKind};

mod body;
pub use self::body::CallBody;

mod transport;
pub use self::transport::{HttpTransport, ReqwestTransport, TransportError, TransportRequest};

mod response;
pub use self::response::RawResponse;
pub use self::response::decode::{ENVELOPE_KEY, decode_envelope, decode_object};

mod shape;
pub use self::shape::{
    Discriminated, Outcome, Passthrough, RawMap, RawOutcome, ResponseShape, Typed,
};

mod dispatch;
use self::dispatch::DispatchHandle;
pub use self::dispatch::{ActivityIndicator, ActivitySnapshot};

mod error;
pub use self::error::ApiClientError;

/// HTTP client issuing single-shot calls decoded into typed results.
///
/// `ApiClient` composes each call's URL from its base URL, encodes parameters, runs the
/// request through its [`HttpTransport`], then validates and decodes the response on its
/// completion dispatcher. Use [`ApiClientBuilder`] to create instances.
///
/// Cloning is cheap; clones share the transport, the dispatcher and the activity counter.
///
/// # Example
///
/// ```rust,no_run
/// use courier_core::ApiClient;
/// # use serde::Deserialize;
/// # #[derive(Deserialize)]
/// # struct User { id: u32, name: String }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .with_base_url("https://api.example.com")
///     .build()?;
///
/// // `{"result": {"id": 123, "name": "Alice"}}`
/// let user: User = client.get("/users/123").as_json().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// Calls can be issued concurrently from any task; outcomes are delivered one at a time,
/// on the dispatcher.
#[derive(derive_more::Debug)]
pub struct ApiClient<T = ReqwestTransport> {
    #[debug(skip)]
    transport: Arc<T>,
    base_url: Arc<str>,
    timeout: Duration,
    default_headers: Arc<IndexMap<String, String>>,
    #[debug(skip)]
    dispatcher: DispatchHandle,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: Arc::clone(&self.base_url),
            timeout: self.timeout,
            default_headers: Arc::clone(&self.default_headers),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

// Create
impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }
}

// Configuration
impl<T> ApiClient<T> {
    /// The base URL endpoints are appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The timeout applied to every request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Observes the calls in flight.
    pub fn activity(&self) -> ActivityIndicator {
        self.dispatcher.activity()
    }
}

// Call
impl<T> ApiClient<T>
where
    T: HttpTransport,
{
    /// Creates a call from a request descriptor.
    ///
    /// Nothing is sent until the call is executed.
    pub fn call(&self, request: CallRequest) -> ApiCall<T> {
        ApiCall {
            transport: Arc::clone(&self.transport),
            base_url: Arc::clone(&self.base_url),
            timeout: self.timeout,
            default_headers: Arc::clone(&self.default_headers),
            dispatcher: self.dispatcher.sender(),
            request,
        }
    }

    pub fn get(&self, endpoint: impl Into<String>) -> ApiCall<T> {
        self.call(CallRequest::new(Method::GET, endpoint))
    }

    pub fn post(&self, endpoint: impl Into<String>) -> ApiCall<T> {
        self.call(CallRequest::new(Method::POST, endpoint))
    }

    pub fn put(&self, endpoint: impl Into<String>) -> ApiCall<T> {
        self.call(CallRequest::new(Method::PUT, endpoint))
    }

    pub fn delete(&self, endpoint: impl Into<String>) -> ApiCall<T> {
        self.call(CallRequest::new(Method::DELETE, endpoint))
    }

    pub fn patch(&self, endpoint: impl Into<String>) -> ApiCall<T> {
        self.call(CallRequest::new(Method::PATCH, endpoint))
    }
}
