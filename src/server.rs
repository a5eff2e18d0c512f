//! HTTP server and graceful shutdown.
//!
//! # Handlers on the blocking pool
//!
//! Handlers are synchronous. Each request is read in full on the async
//! side, then handed to tokio's blocking pool together with a fresh
//! [`ResponseBuffer`]; the buffer comes back as the hyper response. One
//! request, one thread for the duration of the handler, so a slow handler
//! never stalls the accept loop or other connections.
//!
//! # Shutdown
//!
//! [`Server::serve`] stops on SIGTERM or Ctrl-C; [`Server::serve_listener`]
//! takes any future as the trigger. Either way the listener stops accepting
//! at once and the call returns once every open connection has finished.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::Result;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::writer::ResponseBuffer;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tsu_trace::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: impl Handler) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        Self::serve_listener(listener, handler, shutdown_signal()).await
    }

    /// Serves connections from an already-bound `listener` until `shutdown`
    /// resolves, then drains in-flight connections.
    ///
    /// Useful when the port is picked by the OS (`127.0.0.1:0`) or the
    /// shutdown trigger is not a process signal.
    pub async fn serve_listener<F>(listener: TcpListener, handler: impl Handler, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handler: BoxedHandler = Arc::new(handler);

        info!(addr = %listener.local_addr()?, "tsu-trace listening");

        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => match res {
                    Ok((stream, remote_addr)) => {
                        tasks.spawn(connection(stream, remote_addr, Arc::clone(&handler)));
                    }
                    Err(e) => error!("accept error: {e}"),
                },

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tsu-trace stopped");
        Ok(())
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Serves every request on one accepted connection, upgrades included.
async fn connection(stream: TcpStream, remote_addr: SocketAddr, handler: BoxedHandler) {
    let svc = service_fn(move |req| dispatch(Arc::clone(&handler), req, remote_addr));
    let served = ConnBuilder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(stream), svc)
        .await;
    if let Err(e) = served {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through `handler` and produces one response.
///
/// The error type is [`Infallible`]: body read failures answer `400` and a
/// panicking handler answers `500`, so hyper never sees an error.
async fn dispatch(
    handler: BoxedHandler,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> std::result::Result<http::Response<Full<Bytes>>, Infallible> {
    let (mut parts, body) = req.into_parts();
    let upgrade = parts.extensions.remove::<OnUpgrade>();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(empty(StatusCode::BAD_REQUEST));
        }
    };

    let request = Request::from_parts(parts, body, remote_addr);
    let mut writer = match upgrade {
        Some(on) => ResponseBuffer::with_upgrade(on),
        None => ResponseBuffer::new(),
    };

    let served = tokio::task::spawn_blocking(move || {
        handler.serve(&mut writer, &request);
        writer
    })
    .await;

    match served {
        Ok(writer) => Ok(writer.into_response()),
        Err(e) => {
            error!(peer = %remote_addr, "handler failed: {e}");
            Ok(empty(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn empty(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// SIGTERM or SIGINT on Unix, Ctrl-C elsewhere.
///
/// # Panics
///
/// Panics if the signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
