//! Optable SDK: client for the Optable edge identity-resolution API.
//!
//! Resolves and tags visitor identity against an Optable sandbox, keeps the
//! server-issued visitor passport across launches, and caches targeting
//! key/values for ad requests.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use optable_sdk::{Config, FileStore, IdentifyRequest, OptableSdk};
//!
//! # async fn run() -> optable_sdk::Result<()> {
//! let store = Arc::new(FileStore::new("/var/lib/myapp/optable")?);
//! let sdk = OptableSdk::new(Config::new("sandbox.optable.co", "my-app"), store)?;
//!
//! sdk.init().await?;
//! sdk.identify_with(&IdentifyRequest::new().email("someone@example.com")).await?;
//! let keyvalues = sdk.targeting().await?;
//! println!("{keyvalues:?}");
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod client;
pub mod config;
pub mod edge;
pub mod error;
pub mod identifiers;
pub mod platform;
pub mod sdk;
pub mod storage;

// Re-export primary types
pub use adapters::{DelegateAdapter, OptableDelegate};
pub use client::{EdgeResponse, PASSPORT_HEADER};
pub use config::{Config, SDK_VERSION};
pub use edge::{Operation, Properties, Traits};
pub use error::{OptableError, Result};
pub use identifiers::{aaid, cid, eid, eid_from_url, Identifier, IdentifyRequest};
pub use platform::{AdvertisingIdProvider, FixedValue, UserAgentProvider};
pub use sdk::{OptableSdk, OptableSdkBuilder};
pub use storage::{
    default_store, FileStore, KeyValueStore, LocalStorage, MemoryStore, TargetingData,
};
