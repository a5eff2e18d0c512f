//! Response status capture.

use std::io;

use http::header::HeaderMap;
use http::StatusCode;

use crate::error::{Error, Result};
use crate::writer::{Hijacker, ResponseWriter, Upgrade};

/// Wraps a [`ResponseWriter`] and remembers the status sent through it.
///
/// Every call is forwarded untouched. The recorder keeps the last status
/// passed to `write_header`; a body write with no explicit status records
/// `200 OK`, which is what the sink sends implicitly.
///
/// The takeover capability is forwarded as well: the recorder always answers
/// [`ResponseWriter::hijacker`], and hijacking through it either reaches the
/// wrapped sink or fails with [`Error::HijackNotSupported`].
///
/// ```rust
/// use tsu_trace::{ResponseBuffer, ResponseWriter, StatusRecorder};
/// use http::StatusCode;
///
/// let mut buf = ResponseBuffer::new();
/// let mut rec = StatusRecorder::new(&mut buf);
/// rec.write_header(StatusCode::NOT_FOUND);
/// assert_eq!(rec.status_line(), "404 Not Found");
/// ```
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, status: None }
    }

    /// Recorded status, `200 OK` if nothing was written yet.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// `"<code> <reason>"`, for log lines.
    pub fn status_line(&self) -> String {
        let status = self.status();
        match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None         => status.as_u16().to_string(),
        }
    }
}

impl ResponseWriter for StatusRecorder<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status = Some(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.inner.write(buf)
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self as &mut dyn Hijacker)
    }
}

impl Hijacker for StatusRecorder<'_> {
    fn hijack(&mut self) -> Result<Upgrade> {
        match self.inner.hijacker() {
            Some(hijacker) => hijacker.hijack(),
            None           => Err(Error::HijackNotSupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ResponseBuffer;

    #[test]
    fn body_without_status_reports_ok() {
        let mut buf = ResponseBuffer::new();
        let mut rec = StatusRecorder::new(&mut buf);
        rec.write_str("hi").unwrap();
        assert_eq!(rec.status_line(), "200 OK");
    }

    #[test]
    fn nothing_written_reports_ok() {
        let mut buf = ResponseBuffer::new();
        let rec = StatusRecorder::new(&mut buf);
        assert_eq!(rec.status(), StatusCode::OK);
    }

    #[test]
    fn explicit_status_is_recorded_and_forwarded() {
        let mut buf = ResponseBuffer::new();
        {
            let mut rec = StatusRecorder::new(&mut buf);
            rec.write_header(StatusCode::NOT_FOUND);
            rec.write_str("missing").unwrap();
            assert_eq!(rec.status_line(), "404 Not Found");
        }
        assert_eq!(buf.status(), StatusCode::NOT_FOUND);
        assert_eq!(buf.body(), b"missing");
    }

    #[test]
    fn last_explicit_status_wins() {
        let mut buf = ResponseBuffer::new();
        let mut rec = StatusRecorder::new(&mut buf);
        rec.write_header(StatusCode::ACCEPTED);
        rec.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.status_line(), "500 Internal Server Error");
    }

    #[test]
    fn unknown_codes_render_without_reason() {
        let mut buf = ResponseBuffer::new();
        let mut rec = StatusRecorder::new(&mut buf);
        rec.write_header(StatusCode::from_u16(599).unwrap());
        assert_eq!(rec.status_line(), "599");
    }

    #[test]
    fn headers_reach_the_wrapped_sink() {
        let mut buf = ResponseBuffer::new();
        {
            let mut rec = StatusRecorder::new(&mut buf);
            rec.headers_mut().insert("x-request-id", "abc".parse().unwrap());
        }
        assert_eq!(buf.headers()["x-request-id"], "abc");
    }

    #[test]
    fn hijack_fails_when_the_sink_cannot() {
        let mut buf = ResponseBuffer::new();
        let mut rec = StatusRecorder::new(&mut buf);
        assert!(rec.hijacker().is_some());
        assert!(matches!(rec.upgrade(), Err(Error::HijackNotSupported)));
    }

    #[test]
    fn hijack_is_forwarded_when_the_sink_can() {
        let on = hyper::upgrade::on(http::Request::new(()));
        let mut buf = ResponseBuffer::with_upgrade(on);
        let mut rec = StatusRecorder::new(&mut buf);
        assert!(rec.upgrade().is_ok());
    }
}
