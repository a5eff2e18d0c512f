//! Handler trait and type erasure.
//!
//! # Handler shape
//!
//! A handler is a plain synchronous function: it reads the request and
//! writes its response into a sink.
//!
//! ```text
//! fn hello(w: &mut dyn ResponseWriter, req: &Request) { … }   ← user writes this
//!        ↓ tracer.handler(hello)
//! Trace { inner: hello, … }                                ← also a Handler
//!        ↓ Server::serve(traced)
//! Arc<dyn Handler>                                         ← shared by every connection
//!        ↓
//! spawn_blocking(|| handler.serve(&mut buffer, &req))      ← one call per request
//! ```
//!
//! Because wrappers are handlers too, they nest: `tracer.handler(auth(app))`
//! traces the whole chain.

use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// Implemented for every request handler.
///
/// Closures and `fn` items with the signature below satisfy it through the
/// blanket impl; middleware types such as [`Trace`](crate::middleware::Trace)
/// implement it directly.
///
/// ```text
/// fn name(w: &mut dyn ResponseWriter, req: &Request)
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

/// A type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership: one atomic increment per
/// request, no copy of the handler.
pub(crate) type BoxedHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self(w, req)
    }
}
