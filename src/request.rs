//! Incoming HTTP request type.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri, Version};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one [`Request`].
///
/// Assigned once at construction and never reused, so per-request state can
/// be keyed by it even when two requests look identical on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An incoming HTTP request with its body already collected.
///
/// Deliberately not `Clone`: every value carries its own [`RequestId`].
///
/// The server builds these from hyper requests. Tests and embedders build
/// them directly:
///
/// ```rust
/// use tsu_trace::Request;
/// use http::{Method, Uri};
///
/// let req = Request::new(Method::GET, Uri::from_static("/foo"))
///     .with_remote_addr("1.2.3.4:5");
///
/// assert_eq!(req.remote_addr(), "1.2.3.4:5");
/// ```
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: String,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: RequestId::next(),
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: String::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self {
            id: RequestId::next(),
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr: remote_addr.to_string(),
            body,
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> RequestId { self.id }
    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Peer address as `host:port`, or empty when unknown.
    pub fn remote_addr(&self) -> &str { &self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_request_gets_a_fresh_id() {
        let a = Request::new(Method::GET, Uri::from_static("/same"));
        let b = Request::new(Method::GET, Uri::from_static("/same"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::POST, Uri::from_static("/"))
            .with_header(HeaderName::from_static("x-forwarded-for"), HeaderValue::from_static("10.0.0.1"));
        assert_eq!(req.header("X-Forwarded-For"), Some("10.0.0.1"));
        assert_eq!(req.header("x-missing"), None);
    }
}
