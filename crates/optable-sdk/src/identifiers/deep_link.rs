//! Hashed-email hand-off through inbound links.
//!
//! Marketing emails and other deep links may carry `oeid=<sha256 hex>` in
//! their query string. The SDK can identify with it directly, without the
//! app ever seeing the address.

use url::Url;

use super::normalize::EMAIL_PREFIX;

/// Query parameter carrying a pre-hashed email (matched case-insensitively).
pub const OEID_PARAM: &str = "oeid";

/// Base used to resolve relative link strings such as `/path?oeid=...`.
const RELATIVE_BASE: &str = "app://localhost/";

/// Return `true` if `s` is exactly 64 hex digits (any case).
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Extract a type-prefixed hashed email from the `oeid` query parameter of
/// `link`.
///
/// The first parameter whose name equals `oeid` ignoring case is used.
/// Returns `None` when the link cannot be parsed, has no query string, has no
/// `oeid` parameter, or its value is not a 64-character hex string.
pub fn eid_from_url(link: &str) -> Option<String> {
    let url = parse_link(link)?;
    url.query()?;

    let (_, oeid) = url
        .query_pairs()
        .find(|(name, _)| name.eq_ignore_ascii_case(OEID_PARAM))?;

    if !is_sha256_hex(&oeid) {
        return None;
    }

    Some(format!("{EMAIL_PREFIX}{}", oeid.to_ascii_lowercase()))
}

fn parse_link(link: &str) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE).ok()?;
            base.join(link).ok()
        }
        Err(_) => None,
    }
}
