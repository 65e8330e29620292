//! Sandbox configuration and edge endpoint resolution.
//!
//! A `Config` names exactly one Optable sandbox (`host` + `app`). Every edge
//! URL is `{scheme}://{host}/{app}/{operation}?osdk={SDK_VERSION}`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OptableError, Result};

/// SDK version string reported to the edge on every request.
pub const SDK_VERSION: &str = concat!("rust-", env!("CARGO_PKG_VERSION"));

/// Query parameter carrying [`SDK_VERSION`].
pub const SDK_VERSION_PARAM: &str = "osdk";

/// Environment variables read by [`Config::from_env`].
pub const ENV_HOST: &str = "OPTABLE_HOST";
pub const ENV_APP: &str = "OPTABLE_APP";
pub const ENV_INSECURE: &str = "OPTABLE_INSECURE";
pub const ENV_USER_AGENT: &str = "OPTABLE_USER_AGENT";

/// Directory for the default persistent store; see
/// [`default_state_dir`](crate::storage::default_state_dir).
pub const ENV_STATE_DIR: &str = "OPTABLE_STATE_DIR";

/// Endpoint configuration for one sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox host, optionally with a port (e.g. `sandbox.optable.co`).
    pub host: String,
    /// Application (site) slug within the sandbox.
    pub app: String,
    /// Use plain `http` instead of `https`.
    #[serde(default)]
    pub insecure: bool,
    /// Explicit `User-Agent`; when unset the client may detect one.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Create a TLS configuration for `host` and `app`.
    pub fn new(host: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            app: app.into(),
            insecure: false,
            user_agent: None,
        }
    }

    /// Use plain `http` when `insecure` is true.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Send this `User-Agent` instead of a detected one.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a configuration from `OPTABLE_*` environment variables.
    ///
    /// `OPTABLE_HOST` and `OPTABLE_APP` are required. `OPTABLE_INSECURE`
    /// accepts `1`, `true` or `yes` (any case).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup(ENV_HOST)
            .ok_or_else(|| OptableError::InvalidConfig(format!("{ENV_HOST} is not set")))?;
        let app = lookup(ENV_APP)
            .ok_or_else(|| OptableError::InvalidConfig(format!("{ENV_APP} is not set")))?;
        let insecure = lookup(ENV_INSECURE)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut config = Self::new(host, app).insecure(insecure);
        if let Some(ua) = lookup(ENV_USER_AGENT).filter(|ua| !ua.is_empty()) {
            config = config.user_agent(ua);
        }
        Ok(config)
    }

    /// URL scheme implied by `insecure`.
    pub fn scheme(&self) -> &'static str {
        if self.insecure {
            "http"
        } else {
            "https"
        }
    }

    /// Resolve the edge URL for an operation path such as `"identify"`.
    ///
    /// # Errors
    ///
    /// Returns `OptableError::InvalidConfig` when `host` or `app` is empty or
    /// the composed string is not a valid URL.
    pub fn edge_url(&self, path: &str) -> Result<Url> {
        if self.host.trim().is_empty() {
            return Err(OptableError::InvalidConfig("host is empty".into()));
        }
        if self.app.trim().is_empty() {
            return Err(OptableError::InvalidConfig("app is empty".into()));
        }

        let raw = format!("{}://{}/{}/{}", self.scheme(), self.host, self.app, path);
        let mut url = Url::parse(&raw)
            .map_err(|e| OptableError::InvalidConfig(format!("invalid edge URL {raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair(SDK_VERSION_PARAM, SDK_VERSION);
        Ok(url)
    }
}
