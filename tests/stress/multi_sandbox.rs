//! Stress tests: many sandbox/app pairs sharing one backing store.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use optable_sdk::storage::local_storage::storage_key;
use optable_sdk::{Config, FileStore, KeyValueStore, LocalStorage, MemoryStore, OptableSdk, PASSPORT_HEADER};

/// Echoes the app segment of the path back as the passport.
struct PassportPerApp;

impl Respond for PassportPerApp {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let app = request.url.path().split('/').nth(1).unwrap_or_default();
        ResponseTemplate::new(200)
            .insert_header(PASSPORT_HEADER, format!("pass-{app}").as_str())
            .set_body_json(json!({ "app": app }))
    }
}

#[tokio::test]
async fn apps_keep_separate_passports_and_targeting() {
    let server = MockServer::start().await;
    Mock::given(path_regex(r"^/app-\d+/(init|targeting)$"))
        .respond_with(PassportPerApp)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let sdks: Vec<OptableSdk> = (0..20)
        .map(|i| {
            let config =
                Config::new(server.address().to_string(), format!("app-{i}")).insecure(true);
            OptableSdk::new(config, Arc::new(store.clone())).unwrap()
        })
        .collect();

    for sdk in &sdks {
        sdk.init().await.unwrap();
        sdk.targeting().await.unwrap();
    }

    // One passport and one targeting entry per app.
    assert_eq!(store.len(), 40);

    for (i, sdk) in sdks.iter().enumerate() {
        assert_eq!(
            sdk.storage().get_passport().unwrap(),
            Some(format!("pass-app-{i}"))
        );
        let cached = sdk.targeting_from_cache().unwrap().unwrap();
        assert_eq!(cached.get("app"), Some(&json!(format!("app-{i}"))));
    }

    sdks[3].targeting_clear_cache().unwrap();
    assert_eq!(sdks[3].targeting_from_cache().unwrap(), None);
    assert!(sdks[4].targeting_from_cache().unwrap().is_some());
}

#[test]
fn storage_keys_are_unique_across_many_sandboxes() {
    let mut keys = HashSet::new();
    for host in 0..25 {
        for app in 0..25 {
            let config = Config::new(format!("sandbox-{host}.optable.co"), format!("app-{app}"));
            assert!(keys.insert(storage_key(&config)));
        }
    }
    assert_eq!(keys.len(), 625);
}

#[test]
fn file_store_isolates_sandboxes_with_slash_heavy_keys() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).unwrap());

    // Base64 of these host/app pairs contains '/' and '+' characters.
    let configs = [
        Config::new("???.example", "a"),
        Config::new(">>>.example", "b"),
        Config::new("sandbox.optable.co", "app?"),
    ];
    let storages: Vec<LocalStorage> = configs
        .iter()
        .map(|c| LocalStorage::new(c, Arc::clone(&store)))
        .collect();

    for (i, storage) in storages.iter().enumerate() {
        storage.set_passport(&format!("p{i}")).unwrap();
    }
    for (i, storage) in storages.iter().enumerate() {
        assert_eq!(storage.get_passport().unwrap(), Some(format!("p{i}")));
    }
}
