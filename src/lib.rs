//! # tsu-trace
//!
//! Per-request correlation tokens for services that log from many requests
//! at once. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Wrap your top-level handler. Every request gets a token; every line you
//! log through the [`Tracer`] starts with it. `grep` the token and you have
//! the story of one request, pulled out of a stream where hundreds of them
//! interleave:
//!
//! ```text
//! 3f1a0c9e4b7d22a8e61f05b9c4d7e203 new request GET /users/42
//! 9b20d5e1c07a4f3d8e6b11a2f4c8d905 new request POST /users
//! 3f1a0c9e4b7d22a8e61f05b9c4d7e203 cache miss for user 42
//! 3f1a0c9e4b7d22a8e61f05b9c4d7e203 done, status: 200 OK time: 3.1ms
//! ```
//!
//! What this crate intentionally ignores:
//!
//! - **Cross-service propagation** — the token is local to one hop
//! - **Log shipping and rotation** — that is the subscriber's job
//! - **Persistence** — a token lives exactly as long as its request
//!
//! What's left:
//!
//! - Token generation — 128-bit digest of URL, peer and time, plain or `request_id=`
//! - Per-request scope — a concurrent store keyed by request identity
//! - Status capture — a sink wrapper that sees the status without hiding hijack
//! - Five middleware variants — with or without logging, cleanup, key-value tokens
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_trace::{Request, ResponseWriter, Server, Tracer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tracer = Tracer::new();
//!     let log = tracer.clone();
//!
//!     let app = tracer.handler(move |w: &mut dyn ResponseWriter, req: &Request| {
//!         log.logln(req, &[&"serving", req.uri()]);
//!         let _ = w.write_str(&log.token(req));
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod error;
mod handler;
mod log;
mod recorder;
mod request;
mod scope;
mod server;
mod tracer;
mod writer;

pub mod middleware;
pub mod token;

pub use error::{Error, Result};
pub use handler::Handler;
pub use log::{LogSink, TracingSink};
pub use recorder::StatusRecorder;
pub use request::{Request, RequestId};
pub use scope::ScopeStore;
pub use server::Server;
pub use token::TokenFormat;
pub use tracer::{TOKEN_KEY, Tracer};
pub use writer::{Hijacker, ResponseBuffer, ResponseWriter, Upgrade};
