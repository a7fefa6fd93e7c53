//! Shared response helpers for the Moodle web-service API.
//!
//! Moodle reports most failures inside HTTP-200 bodies: an object carrying
//! `exception`/`errorcode` (web-service calls) or `error` (the token
//! endpoint). Centralizing the sniffing here keeps the call modules focused
//! on request construction and response mapping.

use serde_json::Value;

use crate::error::MoodleError;

/// Read a response body and surface Moodle-reported errors.
///
/// - Non-success HTTP status → [`MoodleError::Api`] with the status code.
/// - Body containing an exception payload → [`MoodleError::Api`] with
///   Moodle's `errorcode` and message.
/// - Unparseable body → [`MoodleError::Parse`].
pub(crate) async fn read_payload(resp: reqwest::Response) -> Result<Value, MoodleError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(MoodleError::Api {
            code: status.as_u16().to_string(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    let body = resp.text().await?;
    let value: Value =
        serde_json::from_str(&body).map_err(|e| MoodleError::Parse(e.to_string()))?;
    check_payload(value)
}

/// Inspect a decoded body for Moodle error payloads.
///
/// Returns the value unchanged when it carries no error marker. Arrays and
/// `null` (returned by several `mod_assign` functions on success) pass
/// through untouched.
pub(crate) fn check_payload(value: Value) -> Result<Value, MoodleError> {
    let Some(obj) = value.as_object() else {
        return Ok(value);
    };

    if obj.contains_key("exception") || obj.contains_key("errorcode") {
        let code = obj
            .get("errorcode")
            .and_then(Value::as_str)
            .unwrap_or("exception")
            .to_string();
        let message = obj
            .get("message")
            .or_else(|| obj.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("unknown Moodle error")
            .to_string();
        return Err(MoodleError::Api { code, message });
    }

    if let Some(message) = obj.get("error").and_then(Value::as_str) {
        return Err(MoodleError::Api {
            code: "error".to_string(),
            message: message.to_string(),
        });
    }

    Ok(value)
}
