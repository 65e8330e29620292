//! Edge cases for identifier normalization and deep-link extraction.

use std::collections::HashSet;
use std::str::FromStr;

use optable_sdk::{aaid, cid, eid, eid_from_url, Identifier};

const HASH_123: &str = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

// ── eid ──────────────────────────────────────────────────────────────────────

#[test]
fn eid_whitespace_and_case_variants_collapse() {
    let variants = [
        "test@example.com",
        "TEST@EXAMPLE.COM",
        "  Test@Example.com",
        "test@example.com\n",
        "\t tEsT@eXaMpLe.CoM \r\n",
    ];
    let hashes: HashSet<String> = variants.iter().map(|v| eid(v)).collect();
    assert_eq!(hashes.len(), 1);
}

#[test]
fn eid_interior_whitespace_is_significant() {
    assert_ne!(eid("a b@example.com"), eid("ab@example.com"));
}

#[test]
fn eid_unicode_email_is_hashed_as_utf8() {
    let upper = eid("ÜSER@EXAMPLE.COM");
    let lower = eid("üser@example.com");
    assert_eq!(upper, lower);
    assert!(upper.starts_with("e:"));
    assert_eq!(upper.len(), 2 + 64);
}

#[test]
fn eid_of_empty_string_is_still_a_hash() {
    assert_eq!(
        eid(""),
        "e:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(eid("   "), eid(""));
}

#[test]
fn eid_known_vector() {
    assert_eq!(eid("123"), format!("e:{HASH_123}"));
}

// ── aaid / cid ───────────────────────────────────────────────────────────────

#[test]
fn aaid_lowercases_and_trims() {
    assert_eq!(
        aaid("\tEA7583CD-A667-48BC-B806-42ECB2B48606  "),
        "a:ea7583cd-a667-48bc-b806-42ecb2b48606"
    );
}

#[test]
fn cid_keeps_case_and_interior_characters() {
    assert_eq!(cid(" User:42/Ab "), "c:User:42/Ab");
    assert_eq!(cid("ünïcödé"), "c:ünïcödé");
}

// ── Identifier parsing ───────────────────────────────────────────────────────

#[test]
fn identifier_parse_round_trips_display() {
    for raw in [eid("x@y.z"), aaid("ID-1"), cid("ppid-9")] {
        let parsed = Identifier::from_str(&raw).unwrap();
        assert_eq!(parsed.to_string(), raw);
    }
}

#[test]
fn identifier_rejects_malformed_inputs() {
    for bad in [
        "",
        "e:",
        "e:abc",
        "e:zz65a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3",
        "a:",
        "c:",
        "x:value",
        "plain",
    ] {
        assert!(Identifier::from_str(bad).is_err(), "accepted {bad:?}");
    }
}

// ── eid_from_url ─────────────────────────────────────────────────────────────

#[test]
fn oeid_in_many_link_shapes() {
    let expected = Some(format!("e:{HASH_123}"));
    let links = [
        format!("https://example.com/?oeid={HASH_123}"),
        format!("https://example.com/path?utm=1&oeid={HASH_123}&x=y"),
        format!("myapp://open/offer?OEID={}", HASH_123.to_uppercase()),
        format!("myapp://home?OeId={HASH_123}#fragment"),
        format!("/relative/path?oeid={HASH_123}"),
    ];
    for link in &links {
        assert_eq!(eid_from_url(link), expected, "link {link}");
    }
}

#[test]
fn oeid_first_occurrence_wins() {
    let other = "b".repeat(64);
    let link = format!("https://example.com/?oeid={HASH_123}&oeid={other}");
    assert_eq!(eid_from_url(&link), Some(format!("e:{HASH_123}")));
}

#[test]
fn oeid_rejections() {
    let long = "a".repeat(65);
    let non_hex = "g".repeat(64);
    let links = [
        "https://example.com/".to_string(),
        "https://example.com/?".to_string(),
        "https://example.com/?other=1".to_string(),
        "https://example.com/?oeid=".to_string(),
        format!("https://example.com/?oeid={long}"),
        format!("https://example.com/?oeid={non_hex}"),
        format!("https://example.com/#oeid={HASH_123}"),
        "http://[::1".to_string(),
    ];
    for link in &links {
        assert_eq!(eid_from_url(link), None, "link {link}");
    }
}
