//! Strong ETags for exported calendars.
//!
//! The export is byte-stable for unchanged data, so hashing the rendered
//! body is enough to let subscribers revalidate cheaply.

use sha2::{Digest, Sha256};

/// Quoted hex SHA-256 of `body`.
pub fn compute_etag(body: &str) -> String {
  let hash = Sha256::digest(body.as_bytes());
  format!("\"{}\"", hex::encode(hash))
}

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Handles `*`, comma-separated lists, and weak validators (weak comparison
/// is what RFC 9110 prescribes for `If-None-Match`).
pub fn if_none_match(header: &str, etag: &str) -> bool {
  header.split(',').map(str::trim).any(|candidate| {
    candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
  })
}
