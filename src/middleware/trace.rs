//! Request tracing middleware.
//!
//! For every request [`Trace`] does, in order:
//!
//! 1. generate a token from the URL, the peer address and the current time
//! 2. bind it to the request in the tracer's [`ScopeStore`](crate::ScopeStore)
//! 3. log `new request <method> <url>`
//! 4. wrap the response sink in a [`StatusRecorder`]
//! 5. call the inner handler, once
//! 6. log `done, status: <code> <reason> time: <elapsed>`
//! 7. release the binding
//!
//! [`TraceOptions`] switches off 3/4/6 (`log`) and 7 (`clear`) and picks the
//! token shape. Steps 1 and 2 always run before the inner handler.
//!
//! # Nesting
//!
//! A request that already carries a token keeps it: an inner [`Trace`]
//! skips steps 1 and 2 and logs under the outer token. Only the wrapper
//! that bound the token releases it, so the outer completion line still
//! finds it.
//!
//! # Panicking handlers
//!
//! A panic in the inner handler is never caught here. Step 7 still runs
//! (it lives in a drop guard), and when logging is on the guard writes
//! `panicked, time: <elapsed>` before releasing. Step 6 only runs when the
//! handler returns.

use std::time::{Instant, SystemTime};

use crate::handler::Handler;
use crate::recorder::StatusRecorder;
use crate::request::Request;
use crate::token::{self, TokenFormat};
use crate::tracer::{TOKEN_KEY, Tracer};
use crate::writer::ResponseWriter;

/// What a [`Trace`] wrapper does around the inner handler.
///
/// The default logs, cleans up and uses plain tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TraceOptions {
    /// Emit the start and completion lines.
    pub log: bool,
    /// Release the scope entry when the handler is done. Turning this off
    /// leaves one entry per request in the store until released by hand.
    pub clear: bool,
    /// Token shape.
    pub format: TokenFormat,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self { log: true, clear: true, format: TokenFormat::Plain }
    }
}

/// Handler wrapper that gives each request a correlation token.
///
/// Build through [`Tracer::handler`] and friends.
pub struct Trace<H> {
    inner: H,
    tracer: Tracer,
    options: TraceOptions,
}

impl<H: Handler> Trace<H> {
    pub fn new(inner: H, tracer: Tracer, options: TraceOptions) -> Self {
        Self { inner, tracer, options }
    }

    pub fn options(&self) -> TraceOptions { self.options }
    pub fn tracer(&self) -> &Tracer { &self.tracer }
}

impl<H: Handler> Handler for Trace<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let url = req.uri().to_string();
        let owner = self.tracer.store().get::<String>(req, TOKEN_KEY).is_none();
        if owner {
            let token = token::generate(&url, req.remote_addr(), SystemTime::now(), self.options.format);
            self.tracer.store().bind(req, TOKEN_KEY, token);
        }

        let mut guard = Guard {
            tracer: &self.tracer,
            req,
            release: self.options.clear && owner,
            log: self.options.log,
            start: Instant::now(),
        };

        if !self.options.log {
            self.inner.serve(w, req);
            return;
        }

        self.tracer.logln(req, &[&"new request", req.method(), &url]);

        let mut recorder = StatusRecorder::new(w);
        guard.start = Instant::now();
        self.inner.serve(&mut recorder, req);

        let elapsed = format!("{:?}", guard.start.elapsed());
        self.tracer.logln(req, &[&"done, status:", &recorder.status_line(), &"time:", &elapsed]);
    }
}

/// Runs the end-of-request work that must happen even if the handler panics.
struct Guard<'a> {
    tracer: &'a Tracer,
    req: &'a Request,
    release: bool,
    log: bool,
    start: Instant,
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        if self.log && std::thread::panicking() {
            let elapsed = format!("{:?}", self.start.elapsed());
            self.tracer.logln(self.req, &[&"panicked, time:", &elapsed]);
        }
        if self.release {
            self.tracer.store().release(self.req);
        }
    }
}
