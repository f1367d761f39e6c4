//! Raw responses, validation, and payload decoding.
//!
//! This module provides:
//!
//! - [`RawResponse`] - What the transport hands back for one call
//! - Validation of the transport/status contract (`200 OK` with a body)
//! - Decoding of the JSON payload, either through the `result` envelope into a typed
//!   value, or as the raw top-level object

use bytes::Bytes;
use http::StatusCode;
use indexmap::IndexMap;

mod validation;
pub(in crate::client) use self::validation::validate;

pub(in crate::client) mod decode;

/// The raw data received for one call: status, headers, and body.
///
/// An empty body is represented by `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers, multiple values joined with `", "`.
    pub headers: IndexMap<String, String>,
    /// The response body, `None` when empty.
    pub body: Option<Bytes>,
}

impl RawResponse {
    /// Creates a response without headers nor body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: IndexMap::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body; an empty body is stored as `None`.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    /// Describes the response for diagnostics: status line and headers.
    pub fn description(&self) -> String {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {{ {headers} }}", self.status)
    }
}
