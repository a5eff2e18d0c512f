//! End-to-end behaviour of the tracing middleware, driven in-process.

use std::sync::{Arc, Barrier, Mutex};

use http::{Method, StatusCode, Uri};
use tsu_trace::{Handler, Request, ResponseBuffer, ResponseWriter, TOKEN_KEY, Tracer};

fn capture() -> (Tracer, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let tracer = Tracer::with_sink(move |line: &str| sink.lock().unwrap().push(line.to_owned()));
    (tracer, lines)
}

fn foo_request() -> Request {
    Request::new(Method::GET, Uri::from_static("/foo")).with_remote_addr("1.2.3.4:5")
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

fn echo_token(t: Tracer) -> impl Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static {
    move |w, req| {
        let _ = w.write_str(&t.token(req));
    }
}

#[test]
fn plain_handler_echoes_a_hex_token() {
    let tracer = Tracer::new();
    let app = tracer.handler(echo_token(tracer.clone()));

    let mut buf = ResponseBuffer::new();
    app.serve(&mut buf, &foo_request());

    let body = String::from_utf8(buf.body().to_vec()).unwrap();
    assert!(is_hex_digest(&body), "{body}");
}

#[test]
fn kvp_handler_echoes_a_labelled_token() {
    let tracer = Tracer::new();
    let app = tracer.kvp_handler(echo_token(tracer.clone()));

    let mut buf = ResponseBuffer::new();
    app.serve(&mut buf, &foo_request());

    let body = String::from_utf8(buf.body().to_vec()).unwrap();
    let digest = body.strip_prefix("request_id=").unwrap();
    assert!(is_hex_digest(digest), "{body}");
}

#[test]
fn token_plain_reads_through_the_kvp_label() {
    let tracer = Tracer::new();
    let t = tracer.clone();
    let app = tracer.kvp_handler(move |w: &mut dyn ResponseWriter, req: &Request| {
        let plain = t.token_plain(req).unwrap();
        assert_eq!(format!("request_id={plain}"), t.token(req));
        let _ = w.write_str(&plain);
    });

    let mut buf = ResponseBuffer::new();
    app.serve(&mut buf, &foo_request());
    assert_eq!(buf.body().len(), 32);
}

#[test]
fn server_error_shows_up_in_the_completion_line() {
    let (tracer, lines) = capture();
    let app = tracer.handler(|w: &mut dyn ResponseWriter, _req: &Request| {
        w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        let _ = w.write_str("it broke");
    });

    let mut buf = ResponseBuffer::new();
    app.serve(&mut buf, &foo_request());

    assert_eq!(buf.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let lines = lines.lock().unwrap();
    assert!(lines.last().unwrap().contains("500 Internal Server Error"));
}

#[test]
fn handler_logs_carry_the_same_token_as_the_middleware() {
    let (tracer, lines) = capture();
    let t = tracer.clone();
    let app = tracer.handler(move |_w: &mut dyn ResponseWriter, req: &Request| {
        t.logf(req, format_args!("step {}", 1));
        t.log(req, &[&"step ", &2]);
    });

    app.serve(&mut ResponseBuffer::new(), &foo_request());

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 4);
    let token = lines[0].split(' ').next().unwrap();
    assert!(is_hex_digest(token));
    assert_eq!(lines[1], format!("{token} step 1"));
    assert_eq!(lines[2], format!("{token} step 2"));
    assert!(lines.iter().all(|l| l.starts_with(token)));
}

#[test]
fn concurrent_requests_never_see_each_others_tokens() {
    const THREADS: usize = 16;

    let tracer = Tracer::new();
    let barrier = Arc::new(Barrier::new(THREADS));
    let (t, b) = (tracer.clone(), Arc::clone(&barrier));

    let app = tracer.handler(move |w: &mut dyn ResponseWriter, req: &Request| {
        let before = t.token(req);
        // Every request is bound before any of them reads again.
        b.wait();
        assert_eq!(t.token(req), before);
        let _ = w.write_str(&before);
    });

    let tokens: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let app = &app;
                s.spawn(move || {
                    let req = Request::new(Method::GET, Uri::from_static("/foo"))
                        .with_remote_addr(format!("10.0.0.{i}:80"));
                    let mut buf = ResponseBuffer::new();
                    app.serve(&mut buf, &req);
                    String::from_utf8(buf.body().to_vec()).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut unique = tokens.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), THREADS);
    assert!(tracer.store().is_empty());
}

#[test]
fn arbitrary_state_can_ride_along_with_the_token() {
    let tracer = Tracer::new();
    let t = tracer.clone();
    let app = tracer.handler(move |w: &mut dyn ResponseWriter, req: &Request| {
        t.store().bind(req, "user", String::from("alice"));
        let user = t.store().get::<String>(req, "user").unwrap();
        assert!(t.store().get::<String>(req, TOKEN_KEY).is_some());
        let _ = w.write_str(&user);
    });

    let req = foo_request();
    let mut buf = ResponseBuffer::new();
    app.serve(&mut buf, &req);

    assert_eq!(buf.body(), b"alice");
    assert!(tracer.store().get::<String>(&req, "user").is_none());
}
