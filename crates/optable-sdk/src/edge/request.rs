//! Typed edge requests and their JSON bodies.

use serde_json::{Map, Value};

use super::operation::Operation;

/// User traits sent with a profile call.
pub type Traits = Map<String, Value>;

/// Event properties sent with a witness call.
pub type Properties = Map<String, Value>;

/// An operation plus its body, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    pub operation: Operation,
    /// JSON body for POST operations; `None` for targeting.
    pub body: Option<Value>,
}

impl EdgeRequest {
    /// `POST /init` with `[]`.
    pub fn init() -> Self {
        Self {
            operation: Operation::Init,
            body: Some(Value::Array(Vec::new())),
        }
    }

    /// `POST /identify` with the ordered list of prefixed ids.
    pub fn identify<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids.into_iter().map(|id| Value::String(id.into())).collect();
        Self {
            operation: Operation::Identify,
            body: Some(Value::Array(ids)),
        }
    }

    /// `POST /profile` with `{"traits": {...}}`.
    pub fn profile(traits: &Traits) -> Self {
        Self {
            operation: Operation::Profile,
            body: Some(object([("traits", Value::Object(traits.clone()))])),
        }
    }

    /// `GET /targeting`.
    pub fn targeting() -> Self {
        Self {
            operation: Operation::Targeting,
            body: None,
        }
    }

    /// `POST /witness` with `{"event": ..., "properties": {...}}`.
    pub fn witness(event: &str, properties: &Properties) -> Self {
        Self {
            operation: Operation::Witness,
            body: Some(object([
                ("event", Value::String(event.to_string())),
                ("properties", Value::Object(properties.clone())),
            ])),
        }
    }
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}
