use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use super::dispatch::DispatchHandle;
use super::{ApiClient, ApiClientError, HttpTransport, ReqwestTransport};

/// The timeout applied to every request, unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_BASE_URL: &str = "http://127.0.0.1/";

/// Builder for creating `ApiClient` instances.
///
/// # Default Configuration
///
/// - **Base URL**: `http://127.0.0.1/`
/// - **Timeout**: 60 seconds ([`DEFAULT_TIMEOUT`])
/// - **Default headers**: none
/// - **Transport**: [`ReqwestTransport`] with a default [`reqwest::Client`]
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use courier_core::ApiClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .with_base_url("https://api.example.com/v1")
///     .with_timeout(Duration::from_secs(10))
///     .with_default_header("Accept", "application/json")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClientBuilder<T = ReqwestTransport> {
    transport: T,
    base_url: String,
    timeout: Duration,
    default_headers: IndexMap<String, String>,
}

impl<T> ApiClientBuilder<T>
where
    T: HttpTransport,
{
    /// Builds the client and spawns its completion dispatcher.
    ///
    /// The base URL is not validated here: it is composed with each endpoint when a call
    /// is executed, and an invalid result is delivered as [`ApiClientError::InvalidUrl`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::Custom`] when called outside of a tokio runtime, since the
    /// dispatcher is a tokio task.
    pub fn build(self) -> Result<ApiClient<T>, ApiClientError> {
        let Self {
            transport,
            base_url,
            timeout,
            default_headers,
        } = self;

        let dispatcher = DispatchHandle::spawn()?;

        Ok(ApiClient {
            transport: Arc::new(transport),
            base_url: Arc::from(base_url),
            timeout,
            default_headers: Arc::new(default_headers),
            dispatcher,
        })
    }
}

impl<T> ApiClientBuilder<T> {
    /// Sets the base URL every endpoint is appended to.
    ///
    /// Trailing slashes of the base URL and leading slashes of the endpoint are trimmed,
    /// and the two are joined with a single `/`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout applied to every request.
    ///
    /// # Default
    ///
    /// [`DEFAULT_TIMEOUT`], 60 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header sent with every request.
    ///
    /// Default headers are applied before the headers of the call, which win on conflict.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Replaces the transport.
    ///
    /// # Example
    ///
    /// ```rust
    /// use courier_core::{ApiClient, HttpTransport, RawResponse, TransportError, TransportRequest};
    /// use http::StatusCode;
    ///
    /// struct Offline;
    ///
    /// impl HttpTransport for Offline {
    ///     async fn execute(&self, _: TransportRequest) -> Result<RawResponse, TransportError> {
    ///         Err(TransportError::new("offline"))
    ///     }
    /// }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ApiClient::builder().with_transport(Offline).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_transport<U>(self, transport: U) -> ApiClientBuilder<U> {
        ApiClientBuilder {
            transport,
            base_url: self.base_url,
            timeout: self.timeout,
            default_headers: self.default_headers,
        }
    }
}

impl ApiClientBuilder<ReqwestTransport> {
    /// Uses a configured [`reqwest::Client`] for the default transport.
    pub fn with_reqwest_client(self, client: reqwest::Client) -> Self {
        self.with_transport(ReqwestTransport::with_client(client))
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            transport: ReqwestTransport::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_headers: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RawResponse, TransportError, TransportRequest};

    #[derive(Debug)]
    struct Offline;

    impl HttpTransport for Offline {
        async fn execute(&self, _: TransportRequest) -> Result<RawResponse, TransportError> {
            Err(TransportError::new("offline"))
        }
    }

    #[tokio::test]
    async fn test_default_builder_targets_localhost() {
        let client = ApiClientBuilder::default()
            .build()
            .expect("should build client");

        insta::assert_snapshot!(client.base_url(), @"http://127.0.0.1/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_builder_with_custom_settings() {
        let client = ApiClientBuilder::default()
            .with_base_url("https://api.example.com/v1/")
            .with_timeout(Duration::from_secs(5))
            .with_default_header("Accept", "application/json")
            .build()
            .expect("should build client");

        insta::assert_snapshot!(client.base_url(), @"https://api.example.com/v1/");
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(
            client
                .default_headers
                .get("Accept")
                .map(String::as_str),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_builder_with_transport_keeps_settings() {
        let client = ApiClientBuilder::default()
            .with_base_url("http://example.com")
            .with_transport(Offline)
            .build()
            .expect("should build client");

        assert_eq!(client.base_url(), "http://example.com");
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let error = ApiClientBuilder::default()
            .build()
            .expect_err("no runtime");

        assert!(matches!(error, ApiClientError::Custom { .. }));
        assert!(error.to_string().starts_with("a tokio runtime is required"));
    }
}
