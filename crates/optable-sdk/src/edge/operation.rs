//! The edge API operations and their wire shape.

use std::fmt;

use reqwest::Method;

/// One edge API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Identify,
    Profile,
    Targeting,
    Witness,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Init,
        Operation::Identify,
        Operation::Profile,
        Operation::Targeting,
        Operation::Witness,
    ];

    /// Path segment appended after `/{app}/`.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Identify => "identify",
            Self::Profile => "profile",
            Self::Targeting => "targeting",
            Self::Witness => "witness",
        }
    }

    /// HTTP method. Targeting is the only read.
    pub fn method(&self) -> Method {
        match self {
            Self::Targeting => Method::GET,
            _ => Method::POST,
        }
    }

    /// Whether requests for this operation carry a JSON body.
    pub fn has_body(&self) -> bool {
        self.method() == Method::POST
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
