use serde::Serialize;
use serde_json::{Map, Value};

use super::ApiCall;
use crate::client::{ApiClientError, RequestKind};

impl<T> ApiCall<T> {
    // =============================================================================
    // Parameter Methods
    // =============================================================================

    /// Replaces the request parameters.
    ///
    /// Parameters are sent as the request body, unless the method is `GET`.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.request = self.request.with_parameters(parameters);
        self
    }

    /// Adds a single parameter.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use courier_core::ApiClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ApiClient::builder().build()?;
    /// let call = client
    ///     .post("/users")
    ///     .with_parameter("name", "Alice")
    ///     .with_parameter("age", 42);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request = self.request.with_parameter(name, value);
        self
    }

    /// Replaces the request parameters with the fields of a serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::EncodingError`] if the value does not serialize to a JSON
    /// object.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use courier_core::ApiClient;
    /// # use serde::Serialize;
    /// #[derive(Serialize)]
    /// struct NewUser { name: String }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ApiClient::builder().build()?;
    /// let user = NewUser { name: "Alice".to_string() };
    /// let call = client.post("/users").with_parameters_from(&user)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_parameters_from<P>(mut self, parameters: &P) -> Result<Self, ApiClientError>
    where
        P: Serialize + ?Sized,
    {
        self.request = self.request.with_parameters_from(parameters)?;
        Ok(self)
    }

    // =============================================================================
    // Header Methods
    // =============================================================================

    /// Adds a header, applied after the client default headers.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value);
        self
    }

    /// Adds several headers, in iteration order.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request = self.request.with_headers(headers);
        self
    }

    // =============================================================================
    // Body Encoding Methods
    // =============================================================================

    /// Sets the request kind.
    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.request = self.request.with_kind(kind);
        self
    }

    /// Sends the parameters as `multipart/form-data`.
    pub fn multipart(self) -> Self {
        self.with_kind(RequestKind::Multipart)
    }
}
