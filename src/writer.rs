//! Outbound response sink.
//!
//! Handlers do not return a response value; they write one into a
//! [`ResponseWriter`]. That lets wrappers sit between the handler and the
//! connection and observe what goes out (see
//! [`StatusRecorder`](crate::StatusRecorder)).
//!
//! # Connection takeover
//!
//! Some sinks can hand the raw connection to the handler, for protocols
//! that upgrade past HTTP (websockets, custom tunnels). That capability is
//! optional and discovered at runtime through [`ResponseWriter::hijacker`]:
//!
//! ```text
//! w.hijacker()   → Some(&mut dyn Hijacker)  sink can take over the connection
//!                → None                     it cannot
//! w.upgrade()    → Ok(Upgrade)              shorthand for the above
//!                → Err(HijackNotSupported)
//! ```
//!
//! With hyper the takeover only completes once a `101 Switching Protocols`
//! response has gone out, so the handler sets the status, returns, and
//! awaits [`Upgrade::connection`] on a spawned task.

use std::io;

use bytes::Bytes;
use http::header::HeaderMap;
use http::StatusCode;
use http_body_util::Full;
use hyper::upgrade::{OnUpgrade, Upgraded};
use hyper_util::rt::TokioIo;
use tracing::warn;

use crate::error::{Error, Result};

// ── Traits ────────────────────────────────────────────────────────────────────

/// Where a handler writes its response.
pub trait ResponseWriter {
    /// Headers to send. Changes after the header is committed have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the status code and commits the header.
    fn write_header(&mut self, status: StatusCode);

    /// Appends to the body, committing the header with `200 OK` if no
    /// status was set.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes())
    }

    /// Capability query for connection takeover.
    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// Takes over the connection, or fails with
    /// [`Error::HijackNotSupported`] when the sink cannot.
    fn upgrade(&mut self) -> Result<Upgrade> {
        self.hijacker().ok_or(Error::HijackNotSupported)?.hijack()
    }
}

/// A sink that can hand off its underlying connection.
pub trait Hijacker {
    fn hijack(&mut self) -> Result<Upgrade>;
}

// ── Upgrade ───────────────────────────────────────────────────────────────────

/// A pending connection handoff.
pub struct Upgrade(OnUpgrade);

impl Upgrade {
    /// Resolves to the raw connection once the `101` response is on the wire.
    pub async fn connection(self) -> Result<TokioIo<Upgraded>> {
        let upgraded = self.0.await?;
        Ok(TokioIo::new(upgraded))
    }
}

impl From<OnUpgrade> for Upgrade {
    fn from(on: OnUpgrade) -> Self {
        Self(on)
    }
}

// ── ResponseBuffer ────────────────────────────────────────────────────────────

/// In-memory [`ResponseWriter`] that the server turns into a hyper response.
///
/// Follows the usual commit rules: the first `write_header` (or the first
/// `write`, which implies `200 OK`) fixes the status; later `write_header`
/// calls are logged and ignored.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
    upgrade: Option<OnUpgrade>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that can hand off the connection through `on`.
    pub fn with_upgrade(on: OnUpgrade) -> Self {
        Self { upgrade: Some(on), ..Self::default() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.committed {
            warn!(current = %self.status, ignored = %status, "superfluous write_header call");
            return;
        }
        self.status = status;
        self.committed = true;
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.committed = true;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if self.upgrade.is_some() { Some(self as &mut dyn Hijacker) } else { None }
    }
}

impl Hijacker for ResponseBuffer {
    fn hijack(&mut self) -> Result<Upgrade> {
        self.upgrade.take().map(Upgrade).ok_or(Error::HijackNotSupported)
    }
}
