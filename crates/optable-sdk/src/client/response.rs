//! A fully received edge response.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Header carrying the visitor passport in both directions.
pub const PASSPORT_HEADER: &str = "X-Optable-Visitor";

pub(crate) fn passport_header() -> HeaderName {
    HeaderName::from_static("x-optable-visitor")
}

/// Status, headers and body of one edge response.
#[derive(Debug, Clone)]
pub struct EdgeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl EdgeResponse {
    /// Status in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Passport header value, matched case-insensitively.
    pub fn passport(&self) -> Option<&str> {
        self.headers
            .get(passport_header())
            .and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// `{"status": <code>, "body": <body>}` for handing to hosts that only
    /// speak JSON. A non-JSON body becomes a string, an empty one `null`.
    /// The passport is left out.
    pub fn summary(&self) -> Value {
        let body = if self.body.is_empty() {
            Value::Null
        } else {
            self.json::<Value>()
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
        };
        json!({
            "status": self.status.as_u16(),
            "body": body,
        })
    }
}
