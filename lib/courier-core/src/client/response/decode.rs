use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ApiClientError;

/// Name of the envelope field holding the payload of a typed response.
pub const ENVELOPE_KEY: &str = "result";

/// Decodes `{"result": <payload>}` and deserializes the payload into `T`.
///
/// Fields of `T` are matched by name and type; fields of the payload that `T` does not
/// declare are ignored. Either a complete `T` is produced or an error is returned.
///
/// # Errors
///
/// - [`ApiClientError::ServerResponseNotParseable`] if the body is not JSON
/// - [`ApiClientError::ServerResponseIsNotUnboxableDictionary`] if the body is not an object
///   with a `result` field
/// - [`ApiClientError::NotExpectedDataStructureFromServer`] if the payload does not match `T`
pub fn decode_envelope<T>(body: &[u8]) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    let value = parse(body)?;

    let mut envelope = match value {
        Value::Object(envelope) => envelope,
        other => {
            return Err(ApiClientError::ServerResponseIsNotUnboxableDictionary {
                reason: format!("expected a JSON object, got {}", kind_of(&other)),
                body: body_text(body),
            });
        }
    };

    let Some(payload) = envelope.remove(ENVELOPE_KEY) else {
        return Err(ApiClientError::ServerResponseIsNotUnboxableDictionary {
            reason: format!("missing '{ENVELOPE_KEY}' field"),
            body: body_text(body),
        });
    };

    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        debug!(%path, "payload does not match the expected structure");
        ApiClientError::NotExpectedDataStructureFromServer {
            path,
            error: err.into_inner(),
        }
    })
}

/// Decodes the body as a JSON object, returned unmodified.
///
/// # Errors
///
/// Returns [`ApiClientError::ServerResponseNotParseable`] if the body is not JSON or not
/// a JSON object.
pub fn decode_object(body: &[u8]) -> Result<Map<String, Value>, ApiClientError> {
    match parse(body)? {
        Value::Object(object) => Ok(object),
        other => {
            debug!(kind = kind_of(&other), "expected a JSON object");
            Err(ApiClientError::ServerResponseNotParseable {
                body: body_text(body),
            })
        }
    }
}

fn parse(body: &[u8]) -> Result<Value, ApiClientError> {
    serde_json::from_slice(body).map_err(|error| {
        debug!(%error, "invalid JSON body");
        ApiClientError::ServerResponseNotParseable {
            body: body_text(body),
        }
    })
}

fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
