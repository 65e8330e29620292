//! Identifier normalization for hashed emails, device advertising ids and
//! custom ids, plus extraction of hashed emails from inbound links.

pub mod deep_link;
pub mod normalize;
pub mod request;

pub use deep_link::{eid_from_url, is_sha256_hex, OEID_PARAM};
pub use normalize::{aaid, cid, eid, Identifier};
pub use request::IdentifyRequest;
