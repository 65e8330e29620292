//! Request construction and dispatch.
//!
//! Every edge request carries JSON `Content-Type`/`Accept` headers, the
//! stored visitor passport (if any) and a user agent (if known). After a
//! response with a 2xx status is fully received, a passport header on it
//! replaces the stored one. Nothing else ever writes the passport.

pub mod response;

pub use response::{EdgeResponse, PASSPORT_HEADER};

use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::edge::EdgeRequest;
use crate::error::{OptableError, Result};
use crate::platform::UserAgentProvider;
use crate::storage::LocalStorage;

const APPLICATION_JSON: &str = "application/json";

/// HTTP client bound to one sandbox configuration and its passport storage.
pub struct Client {
    config: Config,
    http: reqwest::Client,
    storage: LocalStorage,
    user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
    user_agent: OnceCell<Option<HeaderValue>>,
}

impl Client {
    pub fn new(
        config: Config,
        http: reqwest::Client,
        storage: LocalStorage,
        user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
    ) -> Self {
        Self {
            config,
            http,
            storage,
            user_agent_provider,
            user_agent: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Build the HTTP request for `edge`, attaching the passport stored at
    /// this moment.
    ///
    /// # Errors
    ///
    /// Returns `OptableError::InvalidConfig` if the edge URL cannot be
    /// resolved, or the operation's error variant if the request cannot be
    /// assembled.
    pub async fn build_request(&self, edge: &EdgeRequest) -> Result<reqwest::Request> {
        let op = edge.operation;
        let url = self.config.edge_url(op.path())?;

        let mut builder = self
            .http
            .request(op.method(), url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON);

        if let Some(passport) = self.passport_header_value().await {
            builder = builder.header(response::passport_header(), passport);
        }

        if let Some(ua) = self.user_agent().await {
            builder = builder.header(USER_AGENT, ua.clone());
        }

        if let Some(body) = &edge.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| OptableError::SerializationError(e.to_string()))?;
            builder = builder.body(bytes);
        }

        builder
            .build()
            .map_err(|e| OptableError::edge(op, format!("Request error: {e}")))
    }

    /// Send `request` and fully receive the response.
    ///
    /// On a 2xx status the passport header, if present, is persisted.
    /// Transport errors are returned unmodified and leave storage untouched.
    pub async fn dispatch(
        &self,
        request: reqwest::Request,
    ) -> std::result::Result<EdgeResponse, reqwest::Error> {
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        log::debug!("{method} {path} -> {status} ({} bytes)", body.len());

        let response = EdgeResponse {
            status,
            headers,
            body,
        };
        if response.is_success() {
            self.capture_passport(&response).await;
        }
        Ok(response)
    }

    /// Build and dispatch in one step.
    pub async fn send(
        &self,
        edge: &EdgeRequest,
    ) -> Result<std::result::Result<EdgeResponse, reqwest::Error>> {
        let request = self.build_request(edge).await?;
        Ok(self.dispatch(request).await)
    }

    async fn capture_passport(&self, response: &EdgeResponse) {
        let passport = match response.passport() {
            Some(passport) => passport.to_string(),
            None => {
                if response.headers.contains_key(response::passport_header()) {
                    log::warn!("visitor passport header is not a readable string; ignoring it");
                }
                return;
            }
        };
        match self
            .storage
            .blocking(move |storage| storage.set_passport(&passport))
            .await
        {
            Ok(()) => log::debug!("stored updated visitor passport"),
            Err(e) => log::warn!("failed to store visitor passport: {e}"),
        }
    }

    async fn passport_header_value(&self) -> Option<HeaderValue> {
        let passport = match self.storage.blocking(|storage| storage.get_passport()).await {
            Ok(passport) => passport?,
            Err(e) => {
                log::warn!("failed to read visitor passport: {e}");
                return None;
            }
        };
        match HeaderValue::from_str(&passport) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("stored visitor passport is not a valid header value; omitting it");
                None
            }
        }
    }

    /// The user agent for this client, resolved once.
    async fn user_agent(&self) -> Option<&HeaderValue> {
        self.user_agent
            .get_or_init(|| async {
                let ua = match (&self.config.user_agent, &self.user_agent_provider) {
                    (Some(ua), _) => Some(ua.clone()),
                    (None, Some(provider)) => provider.user_agent().await,
                    (None, None) => None,
                };
                ua.filter(|ua| !ua.is_empty())
                    .and_then(|ua| match HeaderValue::from_str(&ua) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            log::warn!("ignoring user agent that is not a valid header value");
                            None
                        }
                    })
            })
            .await
            .as_ref()
    }
}
