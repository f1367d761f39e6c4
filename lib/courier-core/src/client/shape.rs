//! Output shapes: what a call delivers once it settles.
//!
//! Every call runs the same pipeline (transport, validation, decoding); the
//! [`ResponseShape`] picked by the caller decides how far decoding goes and what the
//! delivered value looks like:
//!
//! | shape | delivers |
//! |---|---|
//! | [`Typed<T>`] | `Result<T, ApiClientError>`, decoded from the `result` envelope |
//! | [`Discriminated<T>`] | [`Outcome<T>`], success or failure |
//! | [`RawMap`] | [`RawOutcome`], the response headers plus the top-level JSON object |
//! | [`Passthrough`] | `Result<Bytes, ApiClientError>`, the validated body, undecoded |

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::response::decode::{decode_envelope, decode_object};
use super::response::validate;
use super::{ApiClientError, RawResponse};

/// Turns the raw outcome of a call into the value delivered to the caller.
///
/// Settling runs on the client's dispatcher. Implementations must not block.
pub trait ResponseShape: Clone + Send + 'static {
    /// The delivered value.
    type Output: Send + 'static;

    /// Validates and decodes the raw outcome.
    fn settle(self, response: Result<RawResponse, ApiClientError>) -> Self::Output;
}

/// Decodes the `result` envelope into `T`.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Creates the shape.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Typed<T> {}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T> ResponseShape for Typed<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Result<T, ApiClientError>;

    fn settle(self, response: Result<RawResponse, ApiClientError>) -> Self::Output {
        let body = validate(response)?;
        decode_envelope(&body)
    }
}

/// Like [`Typed`], delivered as an [`Outcome`].
pub struct Discriminated<T>(PhantomData<fn() -> T>);

impl<T> Discriminated<T> {
    /// Creates the shape.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for Discriminated<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Discriminated<T> {}

impl<T> Default for Discriminated<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Discriminated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discriminated<{}>", std::any::type_name::<T>())
    }
}

impl<T> ResponseShape for Discriminated<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = Outcome<T>;

    fn settle(self, response: Result<RawResponse, ApiClientError>) -> Self::Output {
        Typed::<T>::new().settle(response).into()
    }
}

/// The top-level JSON object, unmodified, along with the response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMap;

impl ResponseShape for RawMap {
    type Output = RawOutcome;

    fn settle(self, response: Result<RawResponse, ApiClientError>) -> Self::Output {
        let headers = response
            .as_ref()
            .map(|response| response.headers.clone())
            .unwrap_or_default();
        let result = validate(response).and_then(|body| decode_object(&body));

        RawOutcome { headers, result }
    }
}

/// The validated body, without decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ResponseShape for Passthrough {
    type Output = Result<Bytes, ApiClientError>;

    fn settle(self, response: Result<RawResponse, ApiClientError>) -> Self::Output {
        validate(response)
    }
}

/// A settled call: either the decoded value or the error that stopped the pipeline.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call succeeded.
    Success(T),
    /// The call failed.
    Failure(ApiClientError),
}

impl<T> Outcome<T> {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the call failed.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The decoded value, if the call succeeded.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The error, if the call failed.
    pub fn error(&self) -> Option<&ApiClientError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// Converts into a [`Result`].
    ///
    /// # Errors
    ///
    /// Returns the error of a failed call.
    pub fn into_result(self) -> Result<T, ApiClientError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<T> From<Result<T, ApiClientError>> for Outcome<T> {
    fn from(result: Result<T, ApiClientError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, ApiClientError> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_result()
    }
}

/// The delivered value of the [`RawMap`] shape.
#[derive(Debug)]
pub struct RawOutcome {
    /// The response headers; empty when no response was received.
    pub headers: IndexMap<String, String>,
    /// The top-level JSON object, or the error that stopped the pipeline.
    pub result: Result<Map<String, Value>, ApiClientError>,
}

impl RawOutcome {
    /// Returns a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Converts into the decoded object, dropping the headers.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed call.
    pub fn into_result(self) -> Result<Map<String, Value>, ApiClientError> {
        self.result
    }
}
