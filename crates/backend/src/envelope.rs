//! Response envelope shared by every quiz API endpoint:
//! `{ "success": bool, "data": ..., "error": { "message", "code" } }`.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::client::BackendError;

/// Longest slice of a raw body quoted back in an error message.
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Detailed {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
    Plain(String),
}

impl ErrorPayload {
    fn into_error(self) -> BackendError {
        match self {
            ErrorPayload::Detailed { message, code } => BackendError::Api { message, code },
            ErrorPayload::Plain(message) => BackendError::Api {
                message,
                code: None,
            },
        }
    }
}

/// Turn an HTTP status and body into the data payload or a `BackendError`.
///
/// `Ok(None)` means the call succeeded without data (`data` absent or `null`).
///
/// # Errors
///
/// - `BackendError::Api` when the body carries `success: false` or an error object,
/// - `BackendError::Status` for non-2xx responses without a readable error,
/// - `BackendError::Malformed` when a 2xx body is not a valid envelope.
pub fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<Option<T>, BackendError> {
    let is_success = (200..300).contains(&status);

    if !is_success {
        let api_error = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|env| env.error);
        return Err(match api_error {
            Some(payload) => payload.into_error(),
            None => BackendError::Status {
                status,
                message: excerpt(body),
            },
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|err| BackendError::Malformed(err.to_string()))?;

    if !envelope.success {
        return Err(envelope.error.map_or_else(
            || BackendError::api("request was not successful", None),
            ErrorPayload::into_error,
        ));
    }

    Ok(envelope.data)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }
    trimmed.chars().take(BODY_EXCERPT_LEN).collect()
}
