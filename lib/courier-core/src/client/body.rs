use bytes::Bytes;
use headers::ContentType;
use http::Method;
use serde_json::{Map, Value};

use super::{ApiClientError, CallRequest, RequestKind};

/// Represents the encoded body of an HTTP request with its content type.
///
/// `CallBody` is produced from the parameters of a [`CallRequest`]: JSON for regular
/// requests, `multipart/form-data` for multipart requests.
#[derive(Clone, derive_more::Debug)]
pub struct CallBody {
    pub(in crate::client) content_type: ContentType,
    #[debug(ignore)]
    pub(in crate::client) data: Bytes,
}

impl CallBody {
    /// Encodes the body of a request, if it has one.
    ///
    /// `GET` requests and requests without parameters have no body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::EncodingError`] if the parameters cannot be encoded for the
    /// request kind.
    pub fn encode(request: &CallRequest) -> Result<Option<Self>, ApiClientError> {
        if request.method() == Method::GET {
            return Ok(None);
        }
        let Some(parameters) = request.parameters() else {
            return Ok(None);
        };

        let body = match request.kind() {
            RequestKind::Regular => Self::json(parameters)?,
            RequestKind::Multipart => Self::multipart(parameters)?,
        };
        Ok(Some(body))
    }

    /// Creates a JSON body from the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::EncodingError`] if serialization fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use courier_core::CallBody;
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut parameters = serde_json::Map::new();
    /// parameters.insert("name".to_string(), "Alice".into());
    ///
    /// let body = CallBody::json(&parameters)?;
    /// assert_eq!(body.data(), br#"{"name":"Alice"}"#);
    /// # Ok(())
    /// # }
    /// ```
    pub fn json(parameters: &Map<String, Value>) -> Result<Self, ApiClientError> {
        let data =
            serde_json::to_vec(parameters).map_err(|error| ApiClientError::EncodingError {
                message: error.to_string(),
            })?;

        Ok(Self {
            content_type: ContentType::json(),
            data: Bytes::from(data),
        })
    }

    /// Creates a `multipart/form-data` body with one text part per parameter.
    ///
    /// Strings are sent verbatim, numbers and booleans as their JSON text, `null` as an
    /// empty part.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::EncodingError`] if a parameter is an array or an object, or
    /// if its name holds a quote or a line break.
    pub fn multipart(parameters: &Map<String, Value>) -> Result<Self, ApiClientError> {
        let boundary = format!("----formdata-courier-{}", uuid::Uuid::new_v4());
        let content_type = format!("multipart/form-data; boundary={boundary}");

        let mut body_data = Vec::new();

        for (name, value) in parameters {
            let name = part_name(name)?;
            let value = part_value(name, value)?;
            body_data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body_data.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body_data.extend_from_slice(value.as_bytes());
            body_data.extend_from_slice(b"\r\n");
        }

        body_data.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let mime = content_type
            .parse::<mime::Mime>()
            .map_err(|error| ApiClientError::EncodingError {
                message: format!("invalid multipart content type '{content_type}': {error}"),
            })?;

        Ok(Self {
            content_type: ContentType::from(mime),
            data: Bytes::from(body_data),
        })
    }

    /// The content type of the body.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// Names end up in a quoted `Content-Disposition` parameter.
fn part_name(name: &str) -> Result<&str, ApiClientError> {
    if name.contains(['"', '\r', '\n']) {
        return Err(ApiClientError::EncodingError {
            message: format!(
                "multipart part name {name:?} must not contain quotes or line breaks"
            ),
        });
    }
    Ok(name)
}

fn part_value(name: &str, value: &Value) -> Result<String, ApiClientError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(ApiClientError::EncodingError {
            message: format!("multipart part '{name}' must be a scalar value, got: {value}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn users_request(method: Method) -> CallRequest {
        CallRequest::new(method, "/users")
            .with_parameter("name", "Alice")
            .with_parameter("age", 30)
            .with_parameter("tags", json!(["admin", "ops"]))
    }

    #[test]
    fn test_get_never_has_a_body() {
        let request = users_request(Method::GET);

        let body = CallBody::encode(&request).expect("should encode");

        assert!(body.is_none());
    }

    #[test]
    fn test_no_parameters_no_body() {
        let request = CallRequest::new(Method::POST, "/users");

        let body = CallBody::encode(&request).expect("should encode");

        assert!(body.is_none());
    }

    #[test]
    fn test_json_body_round_trips_parameters() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let request = users_request(method);

            let body = CallBody::encode(&request)
                .expect("should encode")
                .expect("should have a body");

            assert_eq!(body.content_type, ContentType::json());
            let parsed =
                serde_json::from_slice::<Map<String, Value>>(&body.data).expect("valid JSON");
            assert_eq!(Some(&parsed), request.parameters());
        }
    }

    #[test]
    fn test_empty_parameters_still_encode() {
        let request = CallRequest::new(Method::POST, "/users").with_parameters(Map::new());

        let body = CallBody::encode(&request)
            .expect("should encode")
            .expect("should have a body");

        assert_eq!(body.data(), b"{}");
    }

    #[test]
    fn test_multipart_body_has_one_part_per_parameter() {
        let request = CallRequest::new(Method::POST, "/upload")
            .with_parameter("title", "Holidays")
            .with_parameter("count", 3)
            .with_parameter("public", false)
            .with_parameter("note", Value::Null)
            .with_kind(RequestKind::Multipart);

        let body = CallBody::encode(&request)
            .expect("should encode")
            .expect("should have a body");

        let content_type = body.content_type.to_string();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .expect("multipart content type");
        let text = String::from_utf8(body.data.to_vec()).expect("UTF-8 body");

        assert_eq!(text.matches(&format!("--{boundary}\r\n")).count(), 4);
        assert!(text.contains("name=\"title\"\r\n\r\nHolidays\r\n"));
        assert!(text.contains("name=\"count\"\r\n\r\n3\r\n"));
        assert!(text.contains("name=\"public\"\r\n\r\nfalse\r\n"));
        assert!(text.contains("name=\"note\"\r\n\r\n\r\n"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_multipart_rejects_nested_values() {
        let request = users_request(Method::POST).with_kind(RequestKind::Multipart);

        let error = CallBody::encode(&request).expect_err("should fail");

        insta::assert_snapshot!(error.to_string(), @r#"Failed to encode request parameters: multipart part 'tags' must be a scalar value, got: ["admin","ops"]"#);
    }

    #[rstest]
    #[case::quote("say \"hi\"")]
    #[case::header_injection("title\r\nX-Injected: 1")]
    #[case::line_feed("title\nnote")]
    fn test_multipart_rejects_unsafe_part_names(#[case] name: &str) {
        let request = CallRequest::new(Method::POST, "/upload")
            .with_parameter("title", "Holidays")
            .with_parameter(name, "value")
            .with_kind(RequestKind::Multipart);

        let error = CallBody::encode(&request).expect_err("should fail");

        let ApiClientError::EncodingError { message } = &error else {
            panic!("expected an encoding error, got {error:?}");
        };
        assert_eq!(
            message,
            &format!("multipart part name {name:?} must not contain quotes or line breaks")
        );
    }
}
