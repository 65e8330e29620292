//! Integration test: edge calls against a mock sandbox.
//!
//! Covers the passport lifecycle end to end:
//! 1. init issues a passport
//! 2. later calls carry it
//! 3. successful responses rotate it
//! 4. failed responses never touch it
//! 5. targeting fills and clears the cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use optable_sdk::config::ENV_STATE_DIR;
use optable_sdk::{
    eid, Config, FileStore, FixedValue, IdentifyRequest, KeyValueStore, MemoryStore, OptableError,
    OptableSdk, Properties, Traits, PASSPORT_HEADER, SDK_VERSION,
};

const APP: &str = "tests";

fn config(server: &MockServer) -> Config {
    Config::new(server.address().to_string(), APP).insecure(true)
}

fn sdk(server: &MockServer, store: &MemoryStore) -> OptableSdk {
    OptableSdk::new(config(server), Arc::new(store.clone())).expect("valid config")
}

fn ok_with_passport(passport: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header(PASSPORT_HEADER, passport)
}

fn passport_of(request: &Request) -> Option<String> {
    request
        .headers
        .get(PASSPORT_HEADER)
        .map(|v| v.to_str().unwrap().to_string())
}

fn map(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

/// A store that counts writes, for asserting that failures never write.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    sets: AtomicUsize,
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> optable_sdk::Result<Option<Value>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> optable_sdk::Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> optable_sdk::Result<()> {
        self.inner.remove(key)
    }
}

#[tokio::test]
async fn passport_issued_attached_and_rotated() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    Mock::given(method("POST"))
        .and(path("/tests/init"))
        .and(body_json(json!([])))
        .respond_with(ok_with_passport("pass-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tests/identify"))
        .respond_with(ok_with_passport("pass-2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tests/targeting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    // ── Step 1: no passport before the first call ───────────────────────
    assert_eq!(sdk.storage().get_passport().unwrap(), None);

    sdk.init().await.expect("init should succeed");
    assert_eq!(
        sdk.storage().get_passport().unwrap().as_deref(),
        Some("pass-1")
    );

    // ── Step 2: identify carries pass-1 and receives pass-2 ─────────────
    sdk.identify(vec![eid("a@b.com")])
        .await
        .expect("identify should succeed");
    assert_eq!(
        sdk.storage().get_passport().unwrap().as_deref(),
        Some("pass-2")
    );

    // ── Step 3: targeting carries the rotated passport ──────────────────
    sdk.targeting().await.expect("targeting should succeed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(passport_of(&requests[0]), None);
    assert_eq!(passport_of(&requests[1]).as_deref(), Some("pass-1"));
    assert_eq!(passport_of(&requests[2]).as_deref(), Some("pass-2"));
}

#[tokio::test]
async fn every_request_carries_json_headers_and_sdk_version() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    Mock::given(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(query_param("osdk", SDK_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"k": "v"})))
        .expect(5)
        .mount(&server)
        .await;

    sdk.init().await.unwrap();
    sdk.identify(vec!["c:x"]).await.unwrap();
    sdk.profile(&Traits::new()).await.unwrap();
    sdk.targeting().await.unwrap();
    sdk.witness("e", &Properties::new()).await.unwrap();
}

#[tokio::test]
async fn non_2xx_never_writes_passport() {
    let server = MockServer::start().await;
    let store = Arc::new(CountingStore::default());
    let sdk = OptableSdk::new(config(&server), store.clone()).unwrap();

    Mock::given(method("POST"))
        .and(path("/tests/identify"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header(PASSPORT_HEADER, "should-not-store")
                .set_body_json(json!({"error": "unauthorized"})),
        )
        .mount(&server)
        .await;

    let err = sdk.identify(vec!["c:x"]).await.unwrap_err();
    match err {
        OptableError::Identify(msg) => assert_eq!(
            msg,
            r#"HTTP response.statusCode: 401, data: {"error":"unauthorized"}"#
        ),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    assert_eq!(sdk.storage().get_passport().unwrap(), None);
}

#[tokio::test]
async fn non_2xx_with_non_json_body_gives_short_message() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    Mock::given(path("/tests/witness"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = sdk.witness("app.open", &Properties::new()).await.unwrap_err();
    match err {
        OptableError::Witness(msg) => assert_eq!(msg, "HTTP response.statusCode: 503"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transport_error_is_session_error_and_leaves_store_alone() {
    // Nothing listens on port 9 locally; the connect fails.
    let config = Config::new("127.0.0.1:9", APP).insecure(true);
    let store = Arc::new(CountingStore::default());
    let sdk = OptableSdk::new(config, store.clone()).unwrap();

    let err = sdk.init().await.unwrap_err();
    match err {
        OptableError::Init(msg) => assert!(msg.starts_with("Session error: "), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn passport_header_is_matched_case_insensitively() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    Mock::given(path("/tests/init"))
        .respond_with(ResponseTemplate::new(204).insert_header("x-optable-visitor", "lower"))
        .mount(&server)
        .await;

    sdk.init().await.unwrap();
    assert_eq!(
        sdk.storage().get_passport().unwrap().as_deref(),
        Some("lower")
    );
}

#[tokio::test]
async fn success_without_passport_header_keeps_existing() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);
    sdk.storage().set_passport("existing").unwrap();

    Mock::given(path("/tests/witness"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    sdk.witness("app.open", &Properties::new()).await.unwrap();
    assert_eq!(
        sdk.storage().get_passport().unwrap().as_deref(),
        Some("existing")
    );
}

#[tokio::test]
async fn profile_and_witness_bodies() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    Mock::given(method("POST"))
        .and(path("/tests/profile"))
        .and(body_json(json!({"traits": {"plan": "pro", "visits": 3}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tests/witness"))
        .and(body_json(json!({
            "event": "app.screenView",
            "properties": {"screen": "home", "tabs": ["a", "b"]}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    sdk.profile(&map(json!({"plan": "pro", "visits": 3})))
        .await
        .unwrap();
    sdk.witness(
        "app.screenView",
        &map(json!({"screen": "home", "tabs": ["a", "b"]})),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn targeting_caches_and_clear_removes() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    let body = json!({"gender": "F", "age": ["18-24", "25-34"], "score": 7});
    Mock::given(method("GET"))
        .and(path("/tests/targeting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    assert_eq!(sdk.targeting_from_cache().unwrap(), None);

    let keyvalues = sdk.targeting().await.unwrap();
    assert_eq!(Value::Object(keyvalues.clone()), body);
    assert_eq!(sdk.targeting_from_cache().unwrap(), Some(keyvalues));

    sdk.targeting_clear_cache().unwrap();
    assert_eq!(sdk.targeting_from_cache().unwrap(), None);
}

#[tokio::test]
async fn targeting_with_bad_json_fails_and_keeps_cache() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    let mut cached = Traits::new();
    cached.insert("previous".into(), json!(true));
    sdk.storage().set_targeting(&cached).unwrap();

    Mock::given(path("/tests/targeting"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = sdk.targeting().await.unwrap_err();
    match err {
        OptableError::Targeting(msg) => {
            assert!(msg.starts_with("Error parsing JSON response: "), "{msg}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sdk.targeting_from_cache().unwrap(), Some(cached));
}

#[tokio::test]
async fn identify_with_orders_ids_and_uses_providers() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = OptableSdk::builder(config(&server))
        .store(Arc::new(store.clone()))
        .ad_id_provider(Arc::new(FixedValue::new(
            " EA7583CD-A667-48BC-B806-42ECB2B48606 ",
        )))
        .user_agent_provider(Arc::new(FixedValue::new("Mozilla/5.0 (Test)")))
        .build()
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/tests/identify"))
        .and(header("user-agent", "Mozilla/5.0 (Test)"))
        .and(body_json(json!([
            eid("a@b.com"),
            "a:ea7583cd-a667-48bc-b806-42ecb2b48606",
            "c:Foo-1"
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = IdentifyRequest::new()
        .email(" A@B.com ")
        .ad_id(true)
        .ppid(" Foo-1 ");
    sdk.identify_with(&request).await.unwrap();
}

#[tokio::test]
async fn try_identify_from_url_sends_hashed_email() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let sdk = sdk(&server, &store);

    let hash = "A665A45920422F9D417E4867EFDC4FB8A04A1F3FFF1FA07E998E86F7F7A27AE3";
    Mock::given(path("/tests/identify"))
        .and(body_json(json!([format!("e:{}", hash.to_lowercase())])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sent = sdk
        .try_identify_from_url(&format!("https://example.com/offer?OEID={hash}"))
        .await
        .unwrap();
    assert!(sent.is_some());

    let skipped = sdk
        .try_identify_from_url("https://example.com/offer?oeid=short")
        .await
        .unwrap();
    assert!(skipped.is_none());
}

#[tokio::test]
async fn configured_user_agent_is_sent() {
    let server = MockServer::start().await;
    let sdk = OptableSdk::builder(config(&server).user_agent("MyApp/1.2"))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap();

    Mock::given(header("user-agent", "MyApp/1.2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    sdk.init().await.unwrap();
}

#[tokio::test]
async fn instances_for_same_sandbox_share_passport() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let first = sdk(&server, &store);
    let second = sdk(&server, &store);
    let other_config = Config::new(server.address().to_string(), "other").insecure(true);
    let other_app = OptableSdk::new(other_config, Arc::new(store.clone())).unwrap();

    Mock::given(path("/tests/init"))
        .respond_with(ok_with_passport("shared-pass"))
        .mount(&server)
        .await;

    first.init().await.unwrap();
    assert_eq!(
        second.storage().get_passport().unwrap().as_deref(),
        Some("shared-pass")
    );
    assert_eq!(other_app.storage().get_passport().unwrap(), None);
}

#[tokio::test]
async fn instances_built_without_store_share_durable_passport() {
    // The only test in this binary that builds without a store, so the
    // process-wide default is opened here, under this directory.
    let state = std::env::temp_dir().join(format!("optable-default-store-{}", std::process::id()));
    std::env::set_var(ENV_STATE_DIR, &state);

    let server = MockServer::start().await;
    Mock::given(path("/tests/init"))
        .respond_with(ok_with_passport("default-pass"))
        .expect(1)
        .mount(&server)
        .await;

    let first = OptableSdk::builder(config(&server)).build().unwrap();
    let second = OptableSdk::builder(config(&server)).build().unwrap();
    let other_config = Config::new(server.address().to_string(), "other").insecure(true);
    let other_app = OptableSdk::builder(other_config).build().unwrap();

    first.init().await.unwrap();
    assert_eq!(
        second.storage().get_passport().unwrap().as_deref(),
        Some("default-pass")
    );
    assert_eq!(other_app.storage().get_passport().unwrap(), None);

    // A later process reopening the directory sees the same passport.
    let relaunched = OptableSdk::new(config(&server), Arc::new(FileStore::new(&state).unwrap()))
        .unwrap();
    assert_eq!(
        relaunched.storage().get_passport().unwrap().as_deref(),
        Some("default-pass")
    );

    let _ = std::fs::remove_dir_all(&state);
}
