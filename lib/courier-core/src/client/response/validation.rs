use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use super::RawResponse;
use crate::client::ApiClientError;

impl RawResponse {
    /// Checks the transport contract before decoding and hands back the body: a body must
    /// be present and the status must be exactly `200 OK`.
    ///
    /// The body check comes first, so an empty `404` reports
    /// [`ApiClientError::NoDataFromServer`].
    ///
    /// # Errors
    ///
    /// - [`ApiClientError::NoDataFromServer`] when there is no body
    /// - [`ApiClientError::WrongStatusCode`] when the status is not `200`
    pub fn into_body(self) -> Result<Bytes, ApiClientError> {
        if self.body.is_some() && self.status != StatusCode::OK {
            debug!(status = %self.status, "unexpected status code");
            return Err(ApiClientError::WrongStatusCode {
                status_code: self.status.as_u16(),
                description: self.description(),
            });
        }

        self.body.ok_or(ApiClientError::NoDataFromServer)
    }
}

/// Validates the outcome of a transport call; transport errors are passed through unchanged.
pub(in crate::client) fn validate(
    response: Result<RawResponse, ApiClientError>,
) -> Result<Bytes, ApiClientError> {
    response.and_then(RawResponse::into_body)
}
