//! Classification of dispatch outcomes into success values or typed errors.

use serde_json::Value;

use super::operation::Operation;
use crate::client::EdgeResponse;
use crate::error::{OptableError, Result};
use crate::storage::TargetingData;

/// Turn a dispatch outcome into the operation's result.
///
/// - transport failure: `"Session error: <description>"`
/// - non-2xx: `"HTTP response.statusCode: <code>"`, followed by
///   `", data: <json>"` when the body is valid JSON
pub fn classify(
    op: Operation,
    outcome: std::result::Result<EdgeResponse, reqwest::Error>,
) -> Result<EdgeResponse> {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Err(OptableError::edge(op, format!("Session error: {e}"))),
    };

    if response.is_success() {
        return Ok(response);
    }

    let mut message = format!("HTTP response.statusCode: {}", response.status.as_u16());
    if let Ok(detail) = response.json::<Value>() {
        message.push_str(&format!(", data: {detail}"));
    }
    Err(OptableError::edge(op, message))
}

/// Decode a successful targeting response body into key/values.
pub fn parse_targeting(response: &EdgeResponse) -> Result<TargetingData> {
    match response.json::<Value>() {
        Ok(Value::Object(keyvalues)) => Ok(keyvalues),
        Ok(_) => Err(OptableError::edge(
            Operation::Targeting,
            "Error parsing JSON response: expected a JSON object",
        )),
        Err(e) => Err(OptableError::edge(
            Operation::Targeting,
            format!("Error parsing JSON response: {e}"),
        )),
    }
}
