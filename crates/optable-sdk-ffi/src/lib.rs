//! Optable SDK C FFI bindings.
//!
//! Exposes the edge operations to native hosts through an opaque handle.
//! Network operations complete through a C callback; local operations
//! (identifier normalization, the targeting cache) return synchronously.
//!
#![allow(clippy::doc_overindented_list_items)]
//! # Memory contract
//!
//! - All `*mut c_char` output strings are heap-allocated via [`CString`] and
//!   **must** be freed by the caller using [`optable_free_string`].
//! - The handle returned by [`optable_sdk_new`] owns a Tokio runtime and
//!   **must** be released with [`optable_sdk_free`]. Do not free it from
//!   inside a completion callback.
//! - The `json` pointer passed to a completion callback is only valid for the
//!   duration of the call; copy it if needed.
//! - The static string returned by [`optable_version`] must **not** be freed.
//!
//! # Completion callbacks
//!
//! `callback(ctx, code, json)` is invoked exactly once per dispatched call, on
//! a runtime worker thread. On success `code` is `OPTABLE_OK` and `json` is
//! `{"status": …, "body": …}` (the key/values object for targeting). On
//! failure `code` is one of `OPTABLE_ERR_*` and `json` is `{"error": "…"}`.
//! A null callback makes the call fire-and-forget.
//!
//! # Error codes
//!
//! | Constant                    | Value | Meaning                              |
//! |-----------------------------|-------|--------------------------------------|
//! | `OPTABLE_OK`                | 0     | Success                              |
//! | `OPTABLE_ERR_NULL_PTR`      | -1    | A required pointer was null          |
//! | `OPTABLE_ERR_INVALID_UTF8`  | -2    | A string was not valid UTF-8         |
//! | `OPTABLE_ERR_CONFIG`        | -3    | Host or app missing or malformed     |
//! | `OPTABLE_ERR_IO`            | -4    | Filesystem I/O failure               |
//! | `OPTABLE_ERR_SERIALIZATION` | -5    | JSON or identifier parse failure     |
//! | `OPTABLE_ERR_STORAGE`       | -6    | Passport / targeting storage failure |
//! | `OPTABLE_ERR_EDGE`          | -7    | Edge call failed (transport or HTTP) |
//! | `OPTABLE_ERR_RUNTIME`       | -8    | The async runtime could not start    |

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::runtime::Runtime;

use optable_sdk::{
    aaid, cid, eid, eid_from_url, Config, EdgeResponse, FileStore, Identifier, OptableError,
    OptableSdk, Result as SdkResult, TargetingData,
};

// ── Error codes ───────────────────────────────────────────────────────────────

/// Success.
pub const OPTABLE_OK: i32 = 0;
/// A required pointer argument was null.
pub const OPTABLE_ERR_NULL_PTR: i32 = -1;
/// A string argument contained invalid UTF-8.
pub const OPTABLE_ERR_INVALID_UTF8: i32 = -2;
/// The host or app is missing or does not form a valid URL.
pub const OPTABLE_ERR_CONFIG: i32 = -3;
/// A filesystem I/O operation failed.
pub const OPTABLE_ERR_IO: i32 = -4;
/// A JSON argument or identifier could not be parsed.
pub const OPTABLE_ERR_SERIALIZATION: i32 = -5;
/// Reading or writing the passport or targeting cache failed.
pub const OPTABLE_ERR_STORAGE: i32 = -6;
/// An edge call failed: transport error, non-2xx status or bad response body.
pub const OPTABLE_ERR_EDGE: i32 = -7;
/// The Tokio runtime backing the handle could not be created.
pub const OPTABLE_ERR_RUNTIME: i32 = -8;

/// Completion callback: `(ctx, code, json)`.
pub type OptableCallback = Option<unsafe extern "C" fn(*mut c_void, i32, *const c_char)>;

/// Opaque SDK handle.
pub struct OptableHandle {
    runtime: Runtime,
    sdk: OptableSdk,
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Convert a `*const c_char` to a `&str`, returning an error code on failure.
///
/// # Safety
///
/// `ptr` must either be null (handled gracefully) or point to a valid,
/// null-terminated C string that remains valid for the duration of `'a`.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(OPTABLE_ERR_NULL_PTR);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| OPTABLE_ERR_INVALID_UTF8)
}

/// Like [`cstr_to_str`], treating null as `None`.
unsafe fn optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, i32> {
    if ptr.is_null() {
        Ok(None)
    } else {
        cstr_to_str(ptr).map(Some)
    }
}

/// Allocate a `CString` and write it into `*out`, returning an error code on
/// failure.
///
/// # Safety
///
/// `out` must be non-null.
unsafe fn write_string_out(s: String, out: *mut *mut c_char) -> i32 {
    if out.is_null() {
        return OPTABLE_ERR_NULL_PTR;
    }
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            OPTABLE_OK
        }
        Err(_) => OPTABLE_ERR_SERIALIZATION,
    }
}

/// Borrow the handle behind `ptr`.
unsafe fn handle_ref<'a>(ptr: *const OptableHandle) -> Result<&'a OptableHandle, i32> {
    ptr.as_ref().ok_or(OPTABLE_ERR_NULL_PTR)
}

/// Parse a JSON object argument; null means an empty object.
unsafe fn json_object_arg(ptr: *const c_char) -> Result<Map<String, Value>, i32> {
    match optional_str(ptr)? {
        None => Ok(Map::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(OPTABLE_ERR_SERIALIZATION),
        },
    }
}

/// Map an [`OptableError`] to one of the `OPTABLE_ERR_*` constants.
fn map_error(e: &OptableError) -> i32 {
    match e {
        OptableError::InvalidConfig(_) => OPTABLE_ERR_CONFIG,
        OptableError::Io(_) => OPTABLE_ERR_IO,
        OptableError::SerializationError(_)
        | OptableError::InvalidFileFormat(_)
        | OptableError::InvalidIdentifier(_) => OPTABLE_ERR_SERIALIZATION,
        OptableError::StorageError(_) => OPTABLE_ERR_STORAGE,
        OptableError::Init(_)
        | OptableError::Identify(_)
        | OptableError::Profile(_)
        | OptableError::Targeting(_)
        | OptableError::Witness(_) => OPTABLE_ERR_EDGE,
    }
}

/// Caller context pointer carried to the completion thread.
struct CallbackCtx(*mut c_void);

// SAFETY: the pointer is opaque to Rust and only handed back to the caller's
// callback; thread-safety of what it points to is the caller's contract.
unsafe impl Send for CallbackCtx {}

fn complete(callback: OptableCallback, ctx: CallbackCtx, code: i32, payload: Value) {
    let Some(callback) = callback else {
        return;
    };
    // Serialized JSON escapes NUL, so this cannot fail in practice.
    let json = CString::new(payload.to_string()).unwrap_or_default();
    // SAFETY: the caller supplied `callback` for exactly this invocation.
    unsafe { callback(ctx.0, code, json.as_ptr()) };
}

fn complete_response(callback: OptableCallback, ctx: CallbackCtx, result: SdkResult<EdgeResponse>) {
    match result {
        Ok(response) => complete(callback, ctx, OPTABLE_OK, response.summary()),
        Err(e) => complete(callback, ctx, map_error(&e), json!({ "error": e.to_string() })),
    }
}

fn complete_targeting(
    callback: OptableCallback,
    ctx: CallbackCtx,
    result: SdkResult<TargetingData>,
) {
    match result {
        Ok(keyvalues) => complete(callback, ctx, OPTABLE_OK, Value::Object(keyvalues)),
        Err(e) => complete(callback, ctx, map_error(&e), json!({ "error": e.to_string() })),
    }
}

// ── Version ───────────────────────────────────────────────────────────────────

/// Return the SDK version string (`rust-<version>`) as a null-terminated C
/// string. The caller **must not** free this pointer.
#[no_mangle]
pub extern "C" fn optable_version() -> *const c_char {
    static VERSION: &str = concat!("rust-", env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// ── Handle lifecycle ──────────────────────────────────────────────────────────

/// Create an SDK handle for `host`/`app`, keeping state under `state_dir`.
///
/// # Parameters
///
/// - `host`:         sandbox host, optionally with a port.
/// - `app`:          application slug.
/// - `insecure`:     non-zero to use `http` instead of `https`.
/// - `user_agent`:   `User-Agent` to send; pass `NULL` for none.
/// - `state_dir`:    directory for the passport and targeting cache; created
///                    if missing.
/// - `handle_out`:   on success, receives a handle the caller must release
///                    with [`optable_sdk_free`].
///
/// # Returns
///
/// `OPTABLE_OK` on success; one of `OPTABLE_ERR_*` on failure.
///
/// # Safety
///
/// All pointer arguments (except `user_agent`) must be non-null, valid C
/// strings; `handle_out` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn optable_sdk_new(
    host: *const c_char,
    app: *const c_char,
    insecure: i32,
    user_agent: *const c_char,
    state_dir: *const c_char,
    handle_out: *mut *mut OptableHandle,
) -> i32 {
    let host = match cstr_to_str(host) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let app = match cstr_to_str(app) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let user_agent = match optional_str(user_agent) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let state_dir = match cstr_to_str(state_dir) {
        Ok(s) => s,
        Err(e) => return e,
    };
    if handle_out.is_null() {
        return OPTABLE_ERR_NULL_PTR;
    }

    let mut config = Config::new(host, app).insecure(insecure != 0);
    if let Some(ua) = user_agent {
        config = config.user_agent(ua);
    }

    let store = match FileStore::new(state_dir) {
        Ok(store) => store,
        Err(e) => return map_error(&e),
    };
    let sdk = match OptableSdk::new(config, Arc::new(store)) {
        Ok(sdk) => sdk,
        Err(e) => return map_error(&e),
    };
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("optable-sdk")
        .build()
    {
        Ok(rt) => rt,
        Err(_) => return OPTABLE_ERR_RUNTIME,
    };

    *handle_out = Box::into_raw(Box::new(OptableHandle { runtime, sdk }));
    OPTABLE_OK
}

/// Release a handle from [`optable_sdk_new`]. Calls still in flight are
/// cancelled and their callbacks never run.
///
/// Passing `NULL` is a no-op.
///
/// # Safety
///
/// `handle` must be either null or a pointer returned by [`optable_sdk_new`]
/// that has not already been freed.
#[no_mangle]
pub unsafe extern "C" fn optable_sdk_free(handle: *mut OptableHandle) {
    if !handle.is_null() {
        let OptableHandle { runtime, sdk } = *Box::from_raw(handle);
        drop(sdk);
        runtime.shutdown_background();
    }
}

// ── Edge operations (async) ───────────────────────────────────────────────────

/// Open a session with the edge.
///
/// # Returns
///
/// `OPTABLE_OK` once dispatched; the outcome arrives through `callback`.
///
/// # Safety
///
/// `handle` must be a live handle from [`optable_sdk_new`].
#[no_mangle]
pub unsafe extern "C" fn optable_init(
    handle: *const OptableHandle,
    callback: OptableCallback,
    ctx: *mut c_void,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let ctx = CallbackCtx(ctx);

    let _guard = handle.runtime.enter();
    handle
        .sdk
        .spawn_init(move |result| complete_response(callback, ctx, result));
    OPTABLE_OK
}

/// Identify with a JSON array of prefixed identifiers, e.g.
/// `["e:…", "c:user-1"]`.
///
/// # Returns
///
/// `OPTABLE_OK` once dispatched; `OPTABLE_ERR_SERIALIZATION` without calling
/// `callback` if `ids_json` is not an array of valid identifiers.
///
/// # Safety
///
/// `handle` must be a live handle; `ids_json` a valid C string.
#[no_mangle]
pub unsafe extern "C" fn optable_identify(
    handle: *const OptableHandle,
    ids_json: *const c_char,
    callback: OptableCallback,
    ctx: *mut c_void,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let raw = match cstr_to_str(ids_json) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let ids: Vec<String> = match serde_json::from_str(raw) {
        Ok(ids) => ids,
        Err(_) => return OPTABLE_ERR_SERIALIZATION,
    };
    if let Some(e) = ids.iter().find_map(|id| Identifier::from_str(id).err()) {
        return map_error(&e);
    }
    let ctx = CallbackCtx(ctx);

    let _guard = handle.runtime.enter();
    handle
        .sdk
        .spawn_identify(ids, move |result| complete_response(callback, ctx, result));
    OPTABLE_OK
}

/// Attach traits (a JSON object; `NULL` for none) to the visitor.
///
/// # Safety
///
/// `handle` must be a live handle; `traits_json` null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn optable_profile(
    handle: *const OptableHandle,
    traits_json: *const c_char,
    callback: OptableCallback,
    ctx: *mut c_void,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let traits = match json_object_arg(traits_json) {
        Ok(map) => map,
        Err(e) => return e,
    };
    let ctx = CallbackCtx(ctx);

    let _guard = handle.runtime.enter();
    handle
        .sdk
        .spawn_profile(traits, move |result| complete_response(callback, ctx, result));
    OPTABLE_OK
}

/// Fetch targeting key/values. On success the callback receives the
/// key/values object and the cache is updated.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn optable_targeting(
    handle: *const OptableHandle,
    callback: OptableCallback,
    ctx: *mut c_void,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let ctx = CallbackCtx(ctx);

    let _guard = handle.runtime.enter();
    handle
        .sdk
        .spawn_targeting(move |result| complete_targeting(callback, ctx, result));
    OPTABLE_OK
}

/// Log `event` with properties (a JSON object; `NULL` for none).
///
/// # Safety
///
/// `handle` must be a live handle; `event` a valid C string;
/// `properties_json` null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn optable_witness(
    handle: *const OptableHandle,
    event: *const c_char,
    properties_json: *const c_char,
    callback: OptableCallback,
    ctx: *mut c_void,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let event = match cstr_to_str(event) {
        Ok(s) => s.to_owned(),
        Err(e) => return e,
    };
    let properties = match json_object_arg(properties_json) {
        Ok(map) => map,
        Err(e) => return e,
    };
    let ctx = CallbackCtx(ctx);

    let _guard = handle.runtime.enter();
    handle
        .sdk
        .spawn_witness(event, properties, move |result| {
            complete_response(callback, ctx, result)
        });
    OPTABLE_OK
}

// ── Targeting cache (sync) ────────────────────────────────────────────────────

/// Write the cached targeting key/values as JSON into `*json_out`, or `NULL`
/// when nothing is cached.
///
/// # Safety
///
/// `handle` must be a live handle; `json_out` non-null.
#[no_mangle]
pub unsafe extern "C" fn optable_targeting_from_cache(
    handle: *const OptableHandle,
    json_out: *mut *mut c_char,
) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    if json_out.is_null() {
        return OPTABLE_ERR_NULL_PTR;
    }

    match handle.sdk.targeting_from_cache() {
        Ok(Some(keyvalues)) => write_string_out(Value::Object(keyvalues).to_string(), json_out),
        Ok(None) => {
            *json_out = std::ptr::null_mut();
            OPTABLE_OK
        }
        Err(e) => map_error(&e),
    }
}

/// Remove the cached targeting key/values.
///
/// # Safety
///
/// `handle` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn optable_targeting_clear_cache(handle: *const OptableHandle) -> i32 {
    let handle = match handle_ref(handle) {
        Ok(h) => h,
        Err(e) => return e,
    };
    match handle.sdk.targeting_clear_cache() {
        Ok(()) => OPTABLE_OK,
        Err(e) => map_error(&e),
    }
}

// ── Identifiers (sync) ────────────────────────────────────────────────────────

/// Write `e:<sha256 hex>` of the normalized `email` into `*out`.
///
/// # Safety
///
/// `email` must be a valid C string; `out` non-null.
#[no_mangle]
pub unsafe extern "C" fn optable_eid(email: *const c_char, out: *mut *mut c_char) -> i32 {
    match cstr_to_str(email) {
        Ok(s) => write_string_out(eid(s), out),
        Err(e) => e,
    }
}

/// Write `a:<lowercased id>` into `*out`.
///
/// # Safety
///
/// `ad_id` must be a valid C string; `out` non-null.
#[no_mangle]
pub unsafe extern "C" fn optable_aaid(ad_id: *const c_char, out: *mut *mut c_char) -> i32 {
    match cstr_to_str(ad_id) {
        Ok(s) => write_string_out(aaid(s), out),
        Err(e) => e,
    }
}

/// Write `c:<trimmed id>` into `*out`.
///
/// # Safety
///
/// `ppid` must be a valid C string; `out` non-null.
#[no_mangle]
pub unsafe extern "C" fn optable_cid(ppid: *const c_char, out: *mut *mut c_char) -> i32 {
    match cstr_to_str(ppid) {
        Ok(s) => write_string_out(cid(s), out),
        Err(e) => e,
    }
}

/// Write the hashed email id carried in `url`'s `oeid` parameter into
/// `*out`, or `NULL` when the link carries no valid `oeid`.
///
/// # Safety
///
/// `url` must be a valid C string; `out` non-null.
#[no_mangle]
pub unsafe extern "C" fn optable_eid_from_url(url: *const c_char, out: *mut *mut c_char) -> i32 {
    let url = match cstr_to_str(url) {
        Ok(s) => s,
        Err(e) => return e,
    };
    if out.is_null() {
        return OPTABLE_ERR_NULL_PTR;
    }
    match eid_from_url(url) {
        Some(id) => write_string_out(id, out),
        None => {
            *out = std::ptr::null_mut();
            OPTABLE_OK
        }
    }
}

// ── Memory management ─────────────────────────────────────────────────────────

/// Free a string previously returned by this library.
///
/// Passing `NULL` is a no-op.
///
/// # Safety
///
/// `s` must be either null or a pointer written by one of the `optable_*`
/// functions that has not already been freed.
#[no_mangle]
pub unsafe extern "C" fn optable_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
