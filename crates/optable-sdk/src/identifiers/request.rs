//! Assembly of the identify payload from raw caller inputs.

use crate::platform::AdvertisingIdProvider;

use super::normalize::Identifier;

/// Raw inputs for an identify call.
///
/// The resulting id list is always ordered hashed email, device ad id,
/// custom id, each present only when supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifyRequest {
    email: Option<String>,
    ad_id: bool,
    ppid: Option<String>,
}

impl IdentifyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the hashed form of `email`.
    ///
    /// The value is trimmed before the blank check, so an empty or
    /// whitespace-only email is left out.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Include the device advertising id when the platform provides one.
    pub fn ad_id(mut self, enabled: bool) -> Self {
        self.ad_id = enabled;
        self
    }

    /// Include a publisher-provided custom id.
    ///
    /// The value is trimmed before the blank check, so an empty or
    /// whitespace-only ppid is left out.
    pub fn ppid(mut self, ppid: impl Into<String>) -> Self {
        self.ppid = Some(ppid.into());
        self
    }

    /// Normalize the inputs into identifiers, asking `provider` for the
    /// advertising id when requested.
    pub async fn resolve(&self, provider: Option<&dyn AdvertisingIdProvider>) -> Vec<Identifier> {
        let mut ids = Vec::with_capacity(3);

        if let Some(email) = non_blank(self.email.as_deref()) {
            ids.push(Identifier::email(email));
        }

        if self.ad_id {
            match provider {
                Some(provider) => {
                    if let Some(ad_id) = provider.advertising_id().await {
                        if !ad_id.trim().is_empty() {
                            ids.push(Identifier::ad_id(&ad_id));
                        }
                    }
                }
                None => log::debug!("ad id requested but no advertising id provider is set"),
            }
        }

        if let Some(ppid) = non_blank(self.ppid.as_deref()) {
            ids.push(Identifier::custom(ppid));
        }

        ids
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
