//! Type-prefixed identifier normalization.
//!
//! | Kind          | Prefix | Normalization                          |
//! |---------------|--------|----------------------------------------|
//! | hashed email  | `e:`   | trim, lowercase, SHA-256, lowercase hex |
//! | device ad id  | `a:`   | trim, lowercase                        |
//! | custom id     | `c:`   | trim only (case-significant)           |

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::OptableError;

pub const EMAIL_PREFIX: &str = "e:";
pub const AD_ID_PREFIX: &str = "a:";
pub const CUSTOM_PREFIX: &str = "c:";

/// Type-prefixed SHA-256 of the normalized email.
pub fn eid(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{EMAIL_PREFIX}{}", hex::encode(digest))
}

/// Type-prefixed device advertising id (IDFA / AAID).
pub fn aaid(ad_id: &str) -> String {
    format!("{AD_ID_PREFIX}{}", ad_id.trim().to_lowercase())
}

/// Type-prefixed publisher-provided id. Case is preserved.
pub fn cid(ppid: &str) -> String {
    format!("{CUSTOM_PREFIX}{}", ppid.trim())
}

/// A single piece of identity, held in normalized form without its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Lowercase hex SHA-256 of a normalized email.
    HashedEmail(String),
    /// Lowercased device advertising id.
    DeviceAdId(String),
    /// Trimmed caller-defined id.
    CustomId(String),
}

impl Identifier {
    /// Hash and wrap a raw email address.
    pub fn email(raw: &str) -> Self {
        Self::HashedEmail(eid(raw)[EMAIL_PREFIX.len()..].to_string())
    }

    /// Normalize and wrap a raw device advertising id.
    pub fn ad_id(raw: &str) -> Self {
        Self::DeviceAdId(raw.trim().to_lowercase())
    }

    /// Wrap a raw custom id.
    pub fn custom(raw: &str) -> Self {
        Self::CustomId(raw.trim().to_string())
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::HashedEmail(_) => EMAIL_PREFIX,
            Self::DeviceAdId(_) => AD_ID_PREFIX,
            Self::CustomId(_) => CUSTOM_PREFIX,
        }
    }

    /// The normalized value without prefix.
    pub fn value(&self) -> &str {
        match self {
            Self::HashedEmail(v) | Self::DeviceAdId(v) | Self::CustomId(v) => v,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.value())
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> String {
        id.to_string()
    }
}

/// Parse an already-prefixed identifier such as `"c:abc"`.
///
/// The value after the prefix is taken as-is; hashed emails must be 64 hex
/// characters.
impl FromStr for Identifier {
    type Err = OptableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptableError::InvalidIdentifier(s.to_string());

        if let Some(hash) = s.strip_prefix(EMAIL_PREFIX) {
            if super::deep_link::is_sha256_hex(hash) {
                return Ok(Self::HashedEmail(hash.to_ascii_lowercase()));
            }
            return Err(invalid());
        }

        match (s.strip_prefix(AD_ID_PREFIX), s.strip_prefix(CUSTOM_PREFIX)) {
            (Some(v), _) if !v.is_empty() => Ok(Self::DeviceAdId(v.to_string())),
            (_, Some(v)) if !v.is_empty() => Ok(Self::CustomId(v.to_string())),
            _ => Err(invalid()),
        }
    }
}
