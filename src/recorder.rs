//! In-memory response sink for testing handlers.

use std::io;

use http::HeaderMap;

use crate::error::WriteError;
use crate::sink::{BoxFuture, Flush, ResponseSink};

/// Records everything a handler does to its response.
///
/// Flush-capable, not hijack-capable. An optional capacity limit makes
/// writes past the limit fail part-way, for exercising partial writes.
///
/// ```rust
/// use interceptor::{ResponseRecorder, ResponseSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut rec = ResponseRecorder::new();
/// rec.write_header(404);
/// rec.write(b"missing").await.unwrap();
///
/// assert_eq!(rec.status(), Some(404));
/// assert_eq!(rec.body(), b"missing");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    status: Option<u16>,
    body: Vec<u8>,
    flushes: usize,
    limit: Option<usize>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that accepts at most `limit` body bytes in total.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }

    /// The status last passed to `write_header`.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// How many times the recorder was flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ResponseSink for ResponseRecorder {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<usize, WriteError>> {
        Box::pin(async move {
            let room = match self.limit {
                Some(limit) => limit.saturating_sub(self.body.len()),
                None => buf.len(),
            };
            let accepted = room.min(buf.len());
            self.body.extend_from_slice(&buf[..accepted]);

            if accepted < buf.len() {
                let source = io::Error::new(io::ErrorKind::WriteZero, "recorder capacity exhausted");
                return Err(WriteError::new(accepted, source));
            }
            Ok(accepted)
        })
    }

    fn write_header(&mut self, status: u16) {
        self.status = Some(status);
    }

    fn as_flush(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }
}

impl Flush for ResponseRecorder {
    fn flush(&mut self) -> BoxFuture<'_, ()> {
        self.flushes += 1;
        Box::pin(async {})
    }
}
