/// Errors that can occur when using the [`ApiClient`](super::ApiClient).
///
/// Every call delivers exactly one outcome; when that outcome is a failure it is one of
/// these variants. The `Display` implementation is the human-readable description of the
/// failure, and each variant keeps the raw material (body text, response description,
/// decode path) needed to debug it.
///
/// Stages fail fast: the first failing stage produces the error and nothing downstream runs.
/// Nothing is retried.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum ApiClientError {
    /// The base URL and the endpoint could not be composed into a valid URL.
    #[display("Invalid URL '{url}': {error}")]
    InvalidUrl {
        /// The composed URL text that failed to parse.
        url: String,
        /// The underlying parsing error.
        error: url::ParseError,
    },

    /// The request parameters could not be encoded as a request body.
    #[display("Failed to encode request parameters: {message}")]
    EncodingError {
        /// Description of the encoding failure.
        message: String,
    },

    /// A request header name or value is not valid HTTP.
    #[display("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// Why the header was rejected.
        message: String,
    },

    /// The transport did not produce an HTTP response (network, DNS, TLS, timeout...).
    #[display("Not an HTTP response: {message}")]
    NotHttpResponse {
        /// The transport diagnostic text.
        message: String,
    },

    /// The server answered with a status code other than `200 OK`.
    #[display("Wrong status code {status_code}: {description}")]
    WrongStatusCode {
        /// The received status code.
        status_code: u16,
        /// Description of the response (status line and headers).
        description: String,
    },

    /// The server answered without a body.
    #[display("No data from server")]
    NoDataFromServer,

    /// The body is not valid JSON, or not the expected raw JSON object.
    #[display("Server response is not parseable:\n{body}")]
    ServerResponseNotParseable {
        /// The raw body, decoded as UTF-8 (lossy).
        body: String,
    },

    /// The body is JSON, but not an object carrying the `result` envelope field.
    #[display("Server response is not an unboxable dictionary: {reason}\n{body}")]
    ServerResponseIsNotUnboxableDictionary {
        /// What is wrong with the envelope.
        reason: String,
        /// The raw body, decoded as UTF-8 (lossy).
        body: String,
    },

    /// The envelope payload does not match the expected structure.
    #[display("Not expected data structure from server at '{path}': {error}")]
    NotExpectedDataStructureFromServer {
        /// Path of the offending field inside the payload.
        path: String,
        /// The underlying decode error.
        error: serde_json::Error,
    },

    /// The payload reports that the requested operation did not succeed.
    ///
    /// Never raised by the call pipeline itself; reserved for callers inspecting a
    /// successfully decoded payload.
    #[display(
        "Server reported an unsuccessful operation{}",
        message.as_ref().map(|msg| format!(": {msg}")).unwrap_or_default()
    )]
    ServerReportedUnsuccessfulOperation {
        /// Optional message from the server.
        message: Option<String>,
    },

    /// The payload carries an error reported by the server.
    ///
    /// Never raised by the call pipeline itself; reserved for callers inspecting a
    /// successfully decoded payload.
    #[display("Server response returned an error: {message}")]
    ServerResponseReturnedError {
        /// The error reported by the server.
        message: String,
    },

    /// Escape hatch carrying an arbitrary message.
    #[display("{message}")]
    Custom {
        /// The error message.
        message: String,
    },
}

impl ApiClientError {
    /// Creates a [`ApiClientError::Custom`] error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ApiClientError>();
        assert_sync::<ApiClientError>();
    }

    #[test]
    fn test_display_messages() {
        let error = ApiClientError::WrongStatusCode {
            status_code: 404,
            description: "404 Not Found".to_string(),
        };
        insta::assert_snapshot!(error.to_string(), @"Wrong status code 404: 404 Not Found");

        insta::assert_snapshot!(ApiClientError::NoDataFromServer.to_string(), @"No data from server");

        let error = ApiClientError::ServerResponseNotParseable {
            body: "not json".to_string(),
        };
        insta::assert_snapshot!(error.to_string(), @r"
        Server response is not parseable:
        not json
        ");

        insta::assert_snapshot!(ApiClientError::custom("boom").to_string(), @"boom");
    }

    #[test]
    fn test_display_optional_server_message() {
        let without = ApiClientError::ServerReportedUnsuccessfulOperation { message: None };
        assert_eq!(
            without.to_string(),
            "Server reported an unsuccessful operation"
        );

        let with = ApiClientError::ServerReportedUnsuccessfulOperation {
            message: Some("quota exceeded".to_string()),
        };
        assert_eq!(
            with.to_string(),
            "Server reported an unsuccessful operation: quota exceeded"
        );
    }

    #[test]
    fn test_invalid_url_display() {
        let error = "not a url"
            .parse::<url::Url>()
            .expect_err("should not parse");
        let error = ApiClientError::InvalidUrl {
            url: "not a url".to_string(),
            error,
        };

        assert_eq!(
            error.to_string(),
            "Invalid URL 'not a url': relative URL without a base"
        );
    }
}
