use http::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::ApiClientError;

/// How the request parameters are shipped in the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestKind {
    /// Parameters are sent as a JSON object.
    #[default]
    Regular,
    /// Parameters are sent as `multipart/form-data` text parts.
    Multipart,
}

/// Describes one outbound call: endpoint, method, parameters, headers and kind.
///
/// A `CallRequest` is built with the `with_*` methods and is read-only once handed
/// to [`ApiClient::call`](super::ApiClient::call).
///
/// # Example
///
/// ```rust
/// use courier_core::{CallRequest, RequestKind};
/// use http::Method;
///
/// let request = CallRequest::new(Method::POST, "/users")
///     .with_parameter("name", "Alice")
///     .with_parameter("age", 42)
///     .with_header("X-Request-ID", "abc-123");
///
/// assert_eq!(request.endpoint(), "/users");
/// assert_eq!(request.kind(), RequestKind::Regular);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    endpoint: String,
    method: Method,
    parameters: Option<Map<String, Value>>,
    headers: IndexMap<String, String>,
    kind: RequestKind,
}

impl CallRequest {
    /// Creates a request without parameters nor headers.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            parameters: None,
            headers: IndexMap::new(),
            kind: RequestKind::Regular,
        }
    }

    /// Replaces the parameters.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Adds a single parameter, replacing any previous value with the same name.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replaces the parameters with the fields of a serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::EncodingError`] if the value cannot be serialized, or if it
    /// does not serialize to a JSON object.
    pub fn with_parameters_from<P>(self, parameters: &P) -> Result<Self, ApiClientError>
    where
        P: Serialize + ?Sized,
    {
        let value =
            serde_json::to_value(parameters).map_err(|error| ApiClientError::EncodingError {
                message: error.to_string(),
            })?;

        match value {
            Value::Object(parameters) => Ok(self.with_parameters(parameters)),
            other => Err(ApiClientError::EncodingError {
                message: format!("parameters must be a JSON object, got: {other}"),
            }),
        }
    }

    /// Adds a header.
    ///
    /// Headers are applied in insertion order, so a later value for the same name wins.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        // keep the last value at the last position
        self.headers.shift_remove(&name);
        self.headers.insert(name, value.into());
        self
    }

    /// Adds several headers, in iteration order.
    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |request, (name, value)| request.with_header(name, value))
    }

    /// Sets the request kind.
    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }

    /// The endpoint path, appended to the client base URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The parameters, if any.
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }

    /// The headers, in application order.
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// The request kind.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}
