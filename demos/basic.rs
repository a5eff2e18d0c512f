//! Minimal tsu-trace example — traced endpoints plus a hijacked echo socket.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/missing
//!   curl -i -H 'connection: upgrade' -H 'upgrade: echo' http://localhost:3000/echo
//!
//! Every line a request logs starts with that request's token. Run two curls
//! at once and grep one token out of the output.

use http::{StatusCode, header};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tsu_trace::{Request, ResponseWriter, Server, Tracer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let tracer = Tracer::new();
    let log = tracer.clone();

    let app = tracer.handler(move |w: &mut dyn ResponseWriter, req: &Request| {
        match req.uri().path() {
            "/echo" => echo(&log, w, req),
            path if path.starts_with("/users/") => {
                let id = &path["/users/".len()..];
                log.logf(req, format_args!("looking up user {id}"));
                // Hand the token back so clients can quote it in bug reports.
                if let Ok(value) = log.token(req).parse() {
                    w.headers_mut().insert("x-request-id", value);
                }
                let _ = w.write_str(&format!(r#"{{"id":"{id}","name":"alice"}}"#));
            }
            _ => {
                log.logln(req, &[&"no route for", req.uri()]);
                w.write_header(StatusCode::NOT_FOUND);
            }
        }
    });

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /echo with `upgrade: echo` → 101, then the raw socket echoes bytes back.
//
// The handler only claims the connection; the copy loop runs on its own task
// once hyper has flushed the 101.
fn echo(log: &Tracer, w: &mut dyn ResponseWriter, req: &Request) {
    let upgrade = match w.upgrade() {
        Ok(upgrade) => upgrade,
        Err(e) => {
            log.logln(req, &[&"cannot upgrade:", &e]);
            w.write_header(StatusCode::UPGRADE_REQUIRED);
            return;
        }
    };

    w.headers_mut().insert(header::CONNECTION, header::HeaderValue::from_static("upgrade"));
    w.headers_mut().insert(header::UPGRADE, header::HeaderValue::from_static("echo"));
    w.write_header(StatusCode::SWITCHING_PROTOCOLS);

    let token = log.token(req);
    tokio::spawn(async move {
        let mut io = match upgrade.connection().await {
            Ok(io) => io,
            Err(e) => {
                tracing::error!("{token} upgrade failed: {e}");
                return;
            }
        };
        let mut buf = [0_u8; 1024];
        loop {
            match io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if io.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("{token} echo closed");
    });
}
