//! Byte and status accounting around a response sink.
//!
//! [`ResponseObserver`] stands in for the real sink while a handler chain
//! runs. Everything passes straight through; the observer only remembers what
//! went by so the layer that created it can log or meter the exchange
//! afterwards.
//!
//! ```rust
//! use interceptor::{ResponseObserver, ResponseRecorder, ResponseSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut recorder = ResponseRecorder::new();
//! let mut observer = ResponseObserver::new(&mut recorder);
//!
//! observer.write_header(201);
//! observer.write(b"KEDA").await.unwrap();
//!
//! assert_eq!(observer.status_code(), 201);
//! assert_eq!(observer.bytes_written(), 4);
//! # }
//! ```

use http::HeaderMap;

use crate::error::{Error, WriteError};
use crate::sink::{BoxFuture, Hijack, Hijacked, ResponseSink};

/// Records bytes written and the status set through a borrowed sink.
///
/// `status_code` stays `0` until a handler sets a status explicitly, even
/// though the transport will send `200 OK` by default. `0` means
/// "unobserved", not "success".
///
/// Every write is followed by a flush of the downstream sink when it can
/// flush, so streamed bodies (SSE, long-poll) leave the proxy as they are
/// produced.
pub struct ResponseObserver<'a, S: ResponseSink + ?Sized> {
    downstream: &'a mut S,
    bytes_written: usize,
    status_code: u16,
}

impl<'a, S: ResponseSink + ?Sized> ResponseObserver<'a, S> {
    pub fn new(downstream: &'a mut S) -> Self {
        Self { downstream, bytes_written: 0, status_code: 0 }
    }

    /// Total bytes the downstream sink accepted, failed writes included.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// The last explicitly set status, or `0`.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for ResponseObserver<'_, S> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.downstream.headers()
    }

    fn write<'b>(&'b mut self, buf: &'b [u8]) -> BoxFuture<'b, Result<usize, WriteError>> {
        Box::pin(async move {
            let result = self.downstream.write(buf).await;
            if let Some(flusher) = self.downstream.as_flush() {
                flusher.flush().await;
            }

            self.bytes_written += match &result {
                Ok(n) => *n,
                Err(e) => e.written(),
            };

            result
        })
    }

    fn write_header(&mut self, status: u16) {
        self.downstream.write_header(status);

        self.status_code = status;
    }

    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        Some(self)
    }
}

impl<S: ResponseSink + ?Sized> Hijack for ResponseObserver<'_, S> {
    fn hijack(&mut self) -> BoxFuture<'_, Result<Hijacked, Error>> {
        match self.downstream.as_hijack() {
            Some(hijacker) => hijacker.hijack(),
            None => Box::pin(async { Err(Error::CapabilityNotSupported { capability: "hijack" }) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};

    use super::*;
    use crate::recorder::ResponseRecorder;
    use crate::sink::Connection;

    /// A sink that can only be hijacked; remembers that it was.
    #[derive(Default)]
    struct HijackTester {
        headers: HeaderMap,
        called: bool,
        peer: Option<tokio::io::DuplexStream>,
    }

    impl ResponseSink for HijackTester {
        fn headers(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write<'a>(&'a mut self, _buf: &'a [u8]) -> BoxFuture<'a, Result<usize, WriteError>> {
            Box::pin(async { Ok(0) })
        }

        fn write_header(&mut self, _status: u16) {}

        fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
            Some(self)
        }
    }

    impl Hijack for HijackTester {
        fn hijack(&mut self) -> BoxFuture<'_, Result<Hijacked, Error>> {
            self.called = true;
            let (ours, theirs) = tokio::io::duplex(64);
            self.peer = Some(theirs);
            Box::pin(async move { Ok(BufStream::new(Box::new(ours) as Box<dyn Connection>)) })
        }
    }

    /// Accepts every byte, offers no capabilities.
    #[derive(Default)]
    struct Unflushable {
        headers: HeaderMap,
        body: Vec<u8>,
    }

    impl ResponseSink for Unflushable {
        fn headers(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<usize, WriteError>> {
            Box::pin(async move {
                self.body.extend_from_slice(buf);
                Ok(buf.len())
            })
        }

        fn write_header(&mut self, _status: u16) {}
    }

    #[test]
    fn new_starts_with_zeroed_counters() {
        let mut recorder = ResponseRecorder::new();
        let observer = ResponseObserver::new(&mut recorder);

        assert_eq!(observer.bytes_written(), 0);
        assert_eq!(observer.status_code(), 0);
    }

    #[test]
    fn headers_are_the_downstream_map() {
        let mut recorder = ResponseRecorder::new();
        {
            let mut observer = ResponseObserver::new(&mut recorder);
            observer.headers().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        assert_eq!(recorder.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn downstream_headers_are_visible_through_the_observer() {
        let mut recorder = ResponseRecorder::new();
        recorder.headers().insert("x-upstream", HeaderValue::from_static("backend-1"));

        let mut observer = ResponseObserver::new(&mut recorder);
        assert_eq!(observer.headers()["x-upstream"], "backend-1");
    }

    #[tokio::test]
    async fn write_forwards_and_counts() {
        let mut recorder = ResponseRecorder::new();
        let mut observer = ResponseObserver::new(&mut recorder);

        let n = observer.write(b"KEDA").await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(observer.bytes_written(), 4);

        assert_eq!(recorder.body(), b"KEDA");
    }

    #[tokio::test]
    async fn writes_accumulate_and_flush_every_time() {
        let mut recorder = ResponseRecorder::new();
        let mut observer = ResponseObserver::new(&mut recorder);

        for chunk in ["data: one\n\n", "data: two\n\n", "data: three\n\n"] {
            observer.write(chunk.as_bytes()).await.unwrap();
        }
        assert_eq!(observer.bytes_written(), 11 + 11 + 13);

        assert_eq!(recorder.flushes(), 3);
        assert_eq!(recorder.body(), b"data: one\n\ndata: two\n\ndata: three\n\n");
    }

    #[tokio::test]
    async fn partial_write_counts_accepted_bytes_and_keeps_the_error() {
        let mut recorder = ResponseRecorder::with_capacity_limit(6);
        let mut observer = ResponseObserver::new(&mut recorder);

        assert_eq!(observer.write(b"abcd").await.unwrap(), 4);

        let err = observer.write(b"efgh").await.unwrap_err();
        assert_eq!(err.written(), 2);
        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(observer.bytes_written(), 6);

        let err = observer.write(b"ij").await.unwrap_err();
        assert_eq!(err.written(), 0);
        assert_eq!(observer.bytes_written(), 6);

        // Failed writes are flushed too.
        assert_eq!(recorder.flushes(), 3);
        assert_eq!(recorder.body(), b"abcdef");
    }

    #[tokio::test]
    async fn write_through_a_sink_without_flush() {
        let mut sink = Unflushable::default();
        let mut observer = ResponseObserver::new(&mut sink);

        assert_eq!(observer.write(b"plain").await.unwrap(), 5);
        assert_eq!(observer.write(b" text").await.unwrap(), 5);
        assert_eq!(observer.bytes_written(), 10);

        assert_eq!(sink.body, b"plain text");
    }

    #[tokio::test]
    async fn writes_alone_leave_status_unobserved() {
        let mut recorder = ResponseRecorder::new();
        let mut observer = ResponseObserver::new(&mut recorder);

        observer.write(b"body without a status").await.unwrap();
        observer.write(b"more").await.unwrap();

        assert_eq!(observer.status_code(), 0);
    }

    #[test]
    fn write_header_forwards_and_records_the_latest() {
        let mut recorder = ResponseRecorder::new();
        let mut observer = ResponseObserver::new(&mut recorder);

        observer.write_header(StatusCode::OK.as_u16());
        observer.write_header(StatusCode::IM_A_TEAPOT.as_u16());
        assert_eq!(observer.status_code(), 418);

        assert_eq!(recorder.status(), Some(418));
    }

    #[tokio::test]
    async fn hijack_delegates_to_a_hijacking_sink() {
        let mut tester = HijackTester::default();
        {
            let mut observer = ResponseObserver::new(&mut tester);
            let mut conn = observer.hijack().await.unwrap();

            conn.write_all(b"ping").await.unwrap();
            conn.flush().await.unwrap();

            assert_eq!(observer.bytes_written(), 0);
            assert_eq!(observer.status_code(), 0);
        }

        assert!(tester.called);
        let mut peer = tester.peer.take().unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn hijack_without_support_is_an_error() {
        let mut recorder = ResponseRecorder::new();
        let mut observer = ResponseObserver::new(&mut recorder);

        let Err(err) = observer.hijack().await else {
            panic!("hijack succeeded without a hijacking sink");
        };
        assert!(matches!(err, Error::CapabilityNotSupported { capability: "hijack" }));
    }

    #[tokio::test]
    async fn nested_observers_each_see_the_traffic() {
        let mut recorder = ResponseRecorder::new();
        let mut outer = ResponseObserver::new(&mut recorder);
        {
            let mut inner = ResponseObserver::new(&mut outer as &mut dyn ResponseSink);
            inner.write_header(204);
            inner.write(b"ab").await.unwrap();
            assert_eq!(inner.bytes_written(), 2);
        }

        assert_eq!(outer.status_code(), 204);
        assert_eq!(outer.bytes_written(), 2);
    }
}
