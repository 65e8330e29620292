//! Delegate-style integration.
//!
//! Hosts that cannot pass closures (native bridges, UI controllers holding
//! long-lived handlers) implement [`OptableDelegate`] once and issue calls
//! through a [`DelegateAdapter`]. Each call ends in exactly one `*_ok` or
//! `*_err` notification.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::EdgeResponse;
use crate::edge::{Properties, Traits};
use crate::error::OptableError;
use crate::identifiers::IdentifyRequest;
use crate::sdk::OptableSdk;
use crate::storage::TargetingData;

/// Receives the outcome of edge calls made through a [`DelegateAdapter`].
///
/// Init and profile notifications default to no-ops.
pub trait OptableDelegate: Send + Sync {
    fn init_ok(&self, _response: &EdgeResponse) {}
    fn init_err(&self, _error: &OptableError) {}

    fn identify_ok(&self, response: &EdgeResponse);
    fn identify_err(&self, error: &OptableError);

    fn profile_ok(&self, _response: &EdgeResponse) {}
    fn profile_err(&self, _error: &OptableError) {}

    fn targeting_ok(&self, keyvalues: &TargetingData);
    fn targeting_err(&self, error: &OptableError);

    fn witness_ok(&self, response: &EdgeResponse);
    fn witness_err(&self, error: &OptableError);
}

/// Routes edge call outcomes to an [`OptableDelegate`].
#[derive(Clone)]
pub struct DelegateAdapter {
    sdk: OptableSdk,
    delegate: Arc<dyn OptableDelegate>,
}

impl DelegateAdapter {
    pub fn new(sdk: OptableSdk, delegate: Arc<dyn OptableDelegate>) -> Self {
        Self { sdk, delegate }
    }

    pub fn sdk(&self) -> &OptableSdk {
        &self.sdk
    }

    pub fn init(&self) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk.spawn_init(move |result| match result {
            Ok(response) => delegate.init_ok(&response),
            Err(e) => delegate.init_err(&e),
        })
    }

    pub fn identify(&self, ids: Vec<String>) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk
            .spawn_identify(ids, move |result| notify_identify(&*delegate, result))
    }

    pub fn identify_with(&self, request: IdentifyRequest) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk
            .spawn_identify_with(request, move |result| notify_identify(&*delegate, result))
    }

    pub fn profile(&self, traits: Traits) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk.spawn_profile(traits, move |result| match result {
            Ok(response) => delegate.profile_ok(&response),
            Err(e) => delegate.profile_err(&e),
        })
    }

    pub fn targeting(&self) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk.spawn_targeting(move |result| match result {
            Ok(keyvalues) => delegate.targeting_ok(&keyvalues),
            Err(e) => delegate.targeting_err(&e),
        })
    }

    pub fn witness(&self, event: String, properties: Properties) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk
            .spawn_witness(event, properties, move |result| match result {
                Ok(response) => delegate.witness_ok(&response),
                Err(e) => delegate.witness_err(&e),
            })
    }

    /// Identify from a deep link. No notification is sent when the link
    /// carries no valid `oeid`.
    pub fn try_identify_from_url(&self, link: String) -> JoinHandle<()> {
        let delegate = Arc::clone(&self.delegate);
        self.sdk
            .spawn_try_identify_from_url(link, move |result| match result {
                Ok(Some(response)) => delegate.identify_ok(&response),
                Ok(None) => {}
                Err(e) => delegate.identify_err(&e),
            })
    }
}

fn notify_identify(delegate: &dyn OptableDelegate, result: crate::error::Result<EdgeResponse>) {
    match result {
        Ok(response) => delegate.identify_ok(&response),
        Err(e) => delegate.identify_err(&e),
    }
}
