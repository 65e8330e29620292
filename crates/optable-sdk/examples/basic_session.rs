//! Basic Session: init, identify, profile, targeting and witness against a
//! sandbox configured from the environment.
//!
//! Run with:
//!   OPTABLE_HOST=sandbox.optable.co OPTABLE_APP=my-app \
//!   cargo run --example basic_session -p optable-sdk

use std::sync::Arc;

use optable_sdk::{Config, FileStore, IdentifyRequest, OptableSdk};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // ── 1. Configure from the environment ───────────────────────────────────
    //
    // State goes to a temp directory so repeated runs share one passport.
    let config = Config::from_env()?;
    let state_dir = std::env::temp_dir().join("optable-basic-session");
    let sdk = OptableSdk::new(config, Arc::new(FileStore::new(&state_dir)?))?;

    println!("Sandbox:    {}", sdk.config().host);
    println!("App:        {}", sdk.config().app);
    println!("State dir:  {}", state_dir.display());
    println!(
        "Passport:   {}",
        sdk.storage()
            .get_passport()?
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!();

    // ── 2. Open the session ─────────────────────────────────────────────────
    let response = sdk.init().await?;
    println!("init        -> {}", response.status);

    // ── 3. Identify with an email and a publisher id ────────────────────────
    let request = IdentifyRequest::new()
        .email("someone@example.com")
        .ppid("publisher-user-42");
    let response = sdk.identify_with(&request).await?;
    println!("identify    -> {}", response.status);

    // ── 4. Attach traits ────────────────────────────────────────────────────
    let traits = json!({"plan": "trial", "onboarded": true});
    if let Some(traits) = traits.as_object() {
        let response = sdk.profile(traits).await?;
        println!("profile     -> {}", response.status);
    }

    // ── 5. Fetch and cache targeting ────────────────────────────────────────
    let keyvalues = sdk.targeting().await?;
    println!("targeting   -> {}", serde_json::Value::Object(keyvalues));

    // ── 6. Log an event ─────────────────────────────────────────────────────
    let properties = json!({"screen": "home"});
    if let Some(properties) = properties.as_object() {
        let response = sdk.witness("app.screenView", properties).await?;
        println!("witness     -> {}", response.status);
    }

    println!();
    println!(
        "Cached targeting: {}",
        sdk.targeting_from_cache()?.is_some()
    );
    Ok(())
}
