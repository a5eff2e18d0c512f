//! Token accessors and the token-prefixed logging facade.

use std::fmt::{self, Display, Write};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::log::{LogSink, TracingSink};
use crate::middleware::{Trace, TraceOptions};
use crate::request::Request;
use crate::scope::ScopeStore;
use crate::token::TokenFormat;

/// Scope key the middleware binds the token under.
pub const TOKEN_KEY: &str = "_token";

/// Shared handle to a scope store and a log sink.
///
/// Build one at startup, wrap your top-level handler with it, and clone it
/// into any handler that wants to log:
///
/// ```rust
/// use tsu_trace::{Request, ResponseWriter, Tracer};
///
/// let tracer = Tracer::new();
/// let log = tracer.clone();
///
/// let app = tracer.handler(move |w: &mut dyn ResponseWriter, req: &Request| {
///     log.logf(req, format_args!("looking up {}", req.uri().path()));
///     let _ = w.write_str(&log.token(req));
/// });
/// # let _ = app;
/// ```
///
/// Cloning is two `Arc` increments; every clone sees the same bindings and
/// writes to the same sink.
#[derive(Clone)]
pub struct Tracer {
    store: Arc<ScopeStore>,
    sink: Arc<dyn LogSink>,
}

impl Tracer {
    /// Tracer with a fresh store, logging through [`TracingSink`].
    pub fn new() -> Self {
        Self::with_sink(TracingSink::new())
    }

    /// Tracer with a fresh store, logging to `sink`.
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        Self { store: Arc::new(ScopeStore::new()), sink: Arc::new(sink) }
    }

    /// Replaces the store, e.g. to share one between tracers.
    pub fn with_store(mut self, store: Arc<ScopeStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &ScopeStore { &self.store }

    // ── Middleware constructors ───────────────────────────────────────────────

    /// Wraps `h` with logging, cleanup and plain tokens.
    pub fn handler<H: Handler>(&self, h: H) -> Trace<H> {
        self.wrap(h, TraceOptions::default())
    }

    /// Like [`handler`](Self::handler) without the start/end lines.
    pub fn no_log_handler<H: Handler>(&self, h: H) -> Trace<H> {
        self.wrap(h, TraceOptions { log: false, ..TraceOptions::default() })
    }

    /// Like [`handler`](Self::handler) but never releases the scope entry.
    ///
    /// For handlers that outlive the call (hijacked connections that keep
    /// logging). Every request leaves one entry behind. Capture `req.id()`
    /// before handing the connection off and call
    /// [`ScopeStore::release_id`] when it ends.
    pub fn no_clear_handler<H: Handler>(&self, h: H) -> Trace<H> {
        self.wrap(h, TraceOptions { clear: false, ..TraceOptions::default() })
    }

    /// No start/end lines and no cleanup. Same leak caveat as
    /// [`no_clear_handler`](Self::no_clear_handler).
    pub fn no_log_clear_handler<H: Handler>(&self, h: H) -> Trace<H> {
        self.wrap(h, TraceOptions { log: false, clear: false, ..TraceOptions::default() })
    }

    /// Like [`handler`](Self::handler) with `request_id=<token>` tokens.
    pub fn kvp_handler<H: Handler>(&self, h: H) -> Trace<H> {
        self.wrap(h, TraceOptions { format: TokenFormat::KeyValue, ..TraceOptions::default() })
    }

    pub fn wrap<H: Handler>(&self, h: H, options: TraceOptions) -> Trace<H> {
        Trace::new(h, self.clone(), options)
    }

    // ── Token accessors ───────────────────────────────────────────────────────

    /// The token bound to `req`, label included in key-value mode.
    /// Empty when the request is not traced.
    pub fn token(&self, req: &Request) -> String {
        self.store
            .get::<String>(req, TOKEN_KEY)
            .map(|tok| tok.as_str().to_owned())
            .unwrap_or_default()
    }

    /// The token bound to `req` without its `key=` label.
    ///
    /// Empty when the request is not traced.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedToken`] if the token does not split on `=` into
    /// exactly two parts. Plain tokens have no `=` and always fail here.
    pub fn token_plain(&self, req: &Request) -> Result<String> {
        let tok = self.token(req);
        if tok.is_empty() {
            return Ok(tok);
        }
        let mut parts = tok.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(value), None) => Ok(value.to_owned()),
            _ => Err(Error::MalformedToken(tok)),
        }
    }

    // ── Logging facade ────────────────────────────────────────────────────────

    /// Token, a space, then `vals` back to back.
    pub fn log(&self, req: &Request, vals: &[&dyn Display]) {
        let mut line = self.token(req);
        line.push(' ');
        for val in vals {
            let _ = write!(line, "{val}");
        }
        self.sink.write_line(&line);
    }

    /// Token and `vals`, separated by single spaces.
    pub fn logln(&self, req: &Request, vals: &[&dyn Display]) {
        let mut line = self.token(req);
        for val in vals {
            let _ = write!(line, " {val}");
        }
        self.sink.write_line(&line);
    }

    /// Token, a space, then the formatted message.
    pub fn logf(&self, req: &Request, args: fmt::Arguments<'_>) {
        let line = format!("{} {args}", self.token(req));
        self.sink.write_line(&line);
    }
}

impl Default for Tracer {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("live_requests", &self.store.len())
            .finish_non_exhaustive()
    }
}
