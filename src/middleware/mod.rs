//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and is itself a handler,
//! so layers compose by nesting. This is the place for cross-cutting
//! concerns that need to see every request.
//!
//! Built-in middleware:
//! - [`trace`] — per-request correlation token, start/end lines with
//!   method, URL, status and latency

pub mod trace;

pub use trace::{Trace, TraceOptions};
