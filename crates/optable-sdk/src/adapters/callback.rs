//! Completion-callback variants of the edge operations.
//!
//! Each `spawn_*` method runs the operation on the current Tokio runtime and
//! calls `completion` exactly once with its result. They must be called from
//! within a runtime context.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::client::EdgeResponse;
use crate::edge::{Properties, Traits};
use crate::error::Result;
use crate::identifiers::IdentifyRequest;
use crate::sdk::OptableSdk;
use crate::storage::TargetingData;

fn spawn_with<T, Fut, F>(operation: Fut, completion: F) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    F: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(async move { completion(operation.await) })
}

impl OptableSdk {
    pub fn spawn_init<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<EdgeResponse>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(async move { sdk.init().await }, completion)
    }

    pub fn spawn_identify<F>(&self, ids: Vec<String>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<EdgeResponse>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(async move { sdk.identify(ids).await }, completion)
    }

    pub fn spawn_identify_with<F>(&self, request: IdentifyRequest, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<EdgeResponse>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(async move { sdk.identify_with(&request).await }, completion)
    }

    pub fn spawn_profile<F>(&self, traits: Traits, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<EdgeResponse>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(async move { sdk.profile(&traits).await }, completion)
    }

    pub fn spawn_targeting<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<TargetingData>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(async move { sdk.targeting().await }, completion)
    }

    pub fn spawn_witness<F>(
        &self,
        event: String,
        properties: Properties,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<EdgeResponse>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(
            async move { sdk.witness(&event, &properties).await },
            completion,
        )
    }

    /// Completion receives `Ok(None)` when the link carried no valid `oeid`.
    pub fn spawn_try_identify_from_url<F>(&self, link: String, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Option<EdgeResponse>>) + Send + 'static,
    {
        let sdk = self.clone();
        spawn_with(
            async move { sdk.try_identify_from_url(&link).await },
            completion,
        )
    }
}
