//! Unified error type.

use thiserror::Error;

/// Result alias for tsu-trace's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by tsu-trace's fallible operations.
///
/// A missing token is not an error: lookups for a request that was never
/// traced return an empty string. This type surfaces misuse (asking for a
/// capability the sink lacks, reading a token in the wrong shape) and
/// infrastructure failures in the server adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection takeover was requested on a sink that cannot hand off
    /// its connection.
    #[error("hijack not supported")]
    HijackNotSupported,

    /// The bound token is not a single `key=value` pair.
    #[error("malformed request token: {0}")]
    MalformedToken(String),

    /// The pending protocol upgrade failed to complete.
    #[error("upgrade: {0}")]
    Upgrade(#[from] hyper::Error),

    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
