use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<u16>,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// Shared handle used by handlers and renderers to build a response.
///
/// Semantics follow the usual writer contract: the first status written wins,
/// writing body bytes implies `200` when no status was written, and headers
/// changed after the status is written are still recorded (the transport
/// decides what to do with them).
#[derive(Clone, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<ResponseState>>,
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ResponseWriter")
            .field("status", &state.status)
            .field("body_len", &state.body.len())
            .finish()
    }
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the status code. Ignored once a status has been written.
    pub fn write_header(&self, status: u16) {
        let mut state = self.state();
        if state.status.is_none() {
            state.status = Some(status);
        }
    }

    /// Append body bytes, writing `200` first if no status was written.
    pub fn write(&self, data: &[u8]) {
        let mut state = self.state();
        if state.status.is_none() {
            state.status = Some(200);
        }
        state.body.extend_from_slice(data);
    }

    /// Replace a header. Invalid names or values are logged and skipped.
    pub fn set_header(&self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.state().headers.insert(n, v);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }

    /// Add a header value without removing existing ones.
    pub fn append_header(&self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.state().headers.append(n, v);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.state()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Status written so far.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.state().status
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.state().status.is_some()
    }

    /// Snapshot of the response. A writer nobody wrote to reports `200`.
    #[must_use]
    pub fn finish(&self) -> RecordedResponse {
        let state = self.state();
        RecordedResponse {
            status: state.status.unwrap_or(200),
            headers: state.headers.clone(),
            body: state.body.clone(),
        }
    }
}

impl std::io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        ResponseWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Completed response as produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedResponse {
    /// Plain-text response, used for panics and middleware short-circuits.
    #[must_use]
    pub fn text(status: u16, message: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: message.as_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replace a header. Invalid names or values are ignored.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_status_wins() {
        let w = ResponseWriter::new();
        w.write_header(201);
        w.write_header(500);
        w.write(b"ok");
        let r = w.finish();
        assert_eq!(r.status, 201);
        assert_eq!(r.body, b"ok");
    }

    #[test]
    fn test_write_implies_200() {
        let w = ResponseWriter::new();
        w.write(b"x");
        w.write_header(404);
        assert_eq!(w.finish().status, 200);
    }

    #[test]
    fn test_headers_and_clones_share_state() {
        let w = ResponseWriter::new();
        let other = w.clone();
        other.set_header("X-Trace", "abc");
        other.append_header("Set-Cookie", "a=1");
        other.append_header("Set-Cookie", "b=2");
        w.set_header("bad header", "x");
        let r = w.finish();
        assert_eq!(r.header("x-trace"), Some("abc"));
        assert_eq!(r.headers.get_all("set-cookie").iter().count(), 2);
        assert!(!w.is_written());
    }
}
