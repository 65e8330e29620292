//! Host-platform capabilities the SDK depends on but does not implement.
//!
//! Mobile and desktop hosts answer these from their own APIs (a hidden web
//! view for the browser user agent, the tracking-authorization prompt for
//! the advertising id). The SDK only consumes the resulting strings.

use async_trait::async_trait;

/// Supplies the user agent string sent with edge requests when none is
/// configured explicitly.
///
/// The client calls this at most once and caches the answer. Returning
/// `None` (or an empty string) means requests carry no `User-Agent`.
#[async_trait]
pub trait UserAgentProvider: Send + Sync {
    async fn user_agent(&self) -> Option<String>;
}

/// Supplies the device advertising id when the user has authorized
/// tracking.
#[async_trait]
pub trait AdvertisingIdProvider: Send + Sync {
    /// The raw advertising id, or `None` when tracking is not authorized or
    /// the id is unavailable.
    async fn advertising_id(&self) -> Option<String>;
}

/// A provider that always answers with the same value.
#[derive(Debug, Clone, Default)]
pub struct FixedValue(pub Option<String>);

impl FixedValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl UserAgentProvider for FixedValue {
    async fn user_agent(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait]
impl AdvertisingIdProvider for FixedValue {
    async fn advertising_id(&self) -> Option<String> {
        self.0.clone()
    }
}
