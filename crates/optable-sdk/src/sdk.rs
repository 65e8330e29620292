//! The SDK entry point, one instance per sandbox.
//!
//! `OptableSdk` refers to the sandbox named by its [`Config`]. Several
//! instances may exist side by side; instances for the same host and app
//! share passport and targeting state through their [`KeyValueStore`].
//!
//! Every edge call is a single-shot future with exactly one outcome. Calls
//! may run concurrently; they are not queued, and concurrent passport
//! updates resolve last-write-wins.

use std::sync::Arc;

use crate::client::{Client, EdgeResponse};
use crate::config::Config;
use crate::edge::{classify, parse_targeting, EdgeRequest, Properties, Traits};
use crate::error::Result;
use crate::identifiers::{eid_from_url, IdentifyRequest};
use crate::platform::{AdvertisingIdProvider, UserAgentProvider};
use crate::storage::{default_store, KeyValueStore, LocalStorage, TargetingData};

/// Client for one Optable sandbox. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OptableSdk {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    ad_id_provider: Option<Arc<dyn AdvertisingIdProvider>>,
}

impl OptableSdk {
    /// Create an SDK instance over `store` with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `OptableError::InvalidConfig` if `config` does not resolve to
    /// valid edge URLs.
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::builder(config).store(store).build()
    }

    pub fn builder(config: Config) -> OptableSdkBuilder {
        OptableSdkBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        self.inner.client.config()
    }

    pub fn storage(&self) -> &LocalStorage {
        self.inner.client.storage()
    }

    /// Open a session with the edge. A 2xx response normally issues the
    /// first passport.
    pub async fn init(&self) -> Result<EdgeResponse> {
        self.call(EdgeRequest::init()).await
    }

    /// Send already-prefixed identifiers (`e:`, `a:`, `c:`) in the given
    /// order.
    pub async fn identify<I, S>(&self, ids: I) -> Result<EdgeResponse>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call(EdgeRequest::identify(ids)).await
    }

    /// Normalize raw inputs and identify with them.
    ///
    /// The device ad id is included only when requested and the configured
    /// [`AdvertisingIdProvider`] yields one.
    pub async fn identify_with(&self, request: &IdentifyRequest) -> Result<EdgeResponse> {
        let ids = request.resolve(self.inner.ad_id_provider.as_deref()).await;
        self.identify(ids).await
    }

    /// Attach traits to the current visitor.
    pub async fn profile(&self, traits: &Traits) -> Result<EdgeResponse> {
        self.call(EdgeRequest::profile(traits)).await
    }

    /// Fetch targeting key/values for the current visitor and cache them.
    pub async fn targeting(&self) -> Result<TargetingData> {
        let response = self.call(EdgeRequest::targeting()).await?;
        let keyvalues = parse_targeting(&response)?;

        let cached = keyvalues.clone();
        let write = self
            .storage()
            .blocking(move |storage| storage.set_targeting(&cached))
            .await;
        if let Err(e) = write {
            log::warn!("failed to cache targeting data: {e}");
        }
        Ok(keyvalues)
    }

    /// Targeting key/values from the last successful [`targeting`](Self::targeting)
    /// call, without network activity.
    pub fn targeting_from_cache(&self) -> Result<Option<TargetingData>> {
        self.storage().get_targeting()
    }

    pub fn targeting_clear_cache(&self) -> Result<()> {
        self.storage().clear_targeting()
    }

    /// Log an event such as `"app.screenView"` with free-form properties.
    pub async fn witness(&self, event: &str, properties: &Properties) -> Result<EdgeResponse> {
        self.call(EdgeRequest::witness(event, properties)).await
    }

    /// Identify with the hashed email carried in `link`'s `oeid` parameter.
    ///
    /// Returns `Ok(None)` without any network activity when the link carries
    /// no valid `oeid`.
    pub async fn try_identify_from_url(&self, link: &str) -> Result<Option<EdgeResponse>> {
        match eid_from_url(link) {
            Some(eid) => self.identify([eid]).await.map(Some),
            None => {
                log::debug!("no valid oeid in link; skipping identify");
                Ok(None)
            }
        }
    }

    async fn call(&self, request: EdgeRequest) -> Result<EdgeResponse> {
        let outcome = self.inner.client.send(&request).await?;
        classify(request.operation, outcome)
    }
}

impl std::fmt::Debug for OptableSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptableSdk")
            .field("config", self.config())
            .finish_non_exhaustive()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builder for [`OptableSdk`].
///
/// Without an explicit store the SDK uses [`default_store`], shared by every
/// store-less instance in the process.
pub struct OptableSdkBuilder {
    config: Config,
    store: Option<Arc<dyn KeyValueStore>>,
    http: Option<reqwest::Client>,
    user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
    ad_id_provider: Option<Arc<dyn AdvertisingIdProvider>>,
}

impl OptableSdkBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            http: None,
            user_agent_provider: None,
            ad_id_provider: None,
        }
    }

    /// Backend for the passport and targeting cache.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// HTTP client to send requests with. Timeouts and proxies configured
    /// on it apply to every edge call.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Source of the user agent when the config has none.
    pub fn user_agent_provider(mut self, provider: Arc<dyn UserAgentProvider>) -> Self {
        self.user_agent_provider = Some(provider);
        self
    }

    /// Source of the device advertising id for [`IdentifyRequest::ad_id`].
    pub fn ad_id_provider(mut self, provider: Arc<dyn AdvertisingIdProvider>) -> Self {
        self.ad_id_provider = Some(provider);
        self
    }

    /// Validate the configuration and build the SDK.
    pub fn build(self) -> Result<OptableSdk> {
        self.config.edge_url("")?;

        let store = self.store.unwrap_or_else(default_store);
        let storage = LocalStorage::new(&self.config, store);
        let client = Client::new(
            self.config,
            self.http.unwrap_or_default(),
            storage,
            self.user_agent_provider,
        );

        Ok(OptableSdk {
            inner: Arc::new(Inner {
                client,
                ad_id_provider: self.ad_id_provider,
            }),
        })
    }
}
