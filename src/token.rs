//! Correlation token generation.
//!
//! A token is a 128-bit digest of the request URL, the peer address and the
//! instant the request was picked up, rendered as 32 lowercase hex chars:
//!
//! ```text
//! plain      3f1a0c9e4b7d22a8e61f05b9c4d7e203
//! key-value  request_id=3f1a0c9e4b7d22a8e61f05b9c4d7e203
//! ```
//!
//! The instant is hashed at nanosecond resolution, so two requests for the
//! same URL from the same peer still get distinct tokens. Nothing here is
//! secret or collision-proof; the token only has to tell concurrent log
//! lines apart.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Label used by [`TokenFormat::KeyValue`].
pub const KEY: &str = "request_id";

/// Number of digest bytes kept (128 bits).
const DIGEST_LEN: usize = 16;

/// Shape of a generated token.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TokenFormat {
    /// Bare hex digest.
    #[default]
    Plain,
    /// `request_id=<digest>`, friendlier to log parsers that index on
    /// key-value pairs.
    KeyValue,
}

/// Hex digest of `url`, `remote_addr` and `at`.
pub fn digest(url: &str, remote_addr: &str, at: SystemTime) -> String {
    let nanos = at.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(remote_addr.as_bytes());
    hasher.update(nanos.to_string().as_bytes());
    let hash = hasher.finalize();

    hex::encode(&hash[..DIGEST_LEN])
}

/// Token for one request, in the requested shape.
pub fn generate(url: &str, remote_addr: &str, at: SystemTime, format: TokenFormat) -> String {
    let digest = digest(url, remote_addr, at);
    match format {
        TokenFormat::Plain    => digest,
        TokenFormat::KeyValue => format!("{KEY}={digest}"),
    }
}
