//! The hyper-backed response sink.
//!
//! A [`ResponseWriter`] is what a handler writes into when the server
//! dispatches a request. The response head (status + headers) goes out the
//! first time it is committed: an explicit `write_header`, the first body
//! write, a flush, or the handler returning. Body bytes are buffered up to
//! one chunk and shipped to hyper as frames; a flush ships them immediately.
//!
//! You should not need to construct one yourself. Take the
//! `&mut dyn ResponseSink` your handler receives and write to it.

use std::convert::Infallible;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use hyper::body::{Body, Frame};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::BufStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, WriteError};
use crate::sink::{BoxFuture, Connection, Flush, Hijack, Hijacked, ResponseSink};

/// Buffered bytes are shipped as a frame once they reach this size.
const CHUNK_SIZE: usize = 4096;

/// Frames in flight between a handler and hyper before writes wait.
const BODY_CHANNEL_CAPACITY: usize = 16;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`respond`].
pub enum ContentType {
    EventStream,  // text/event-stream  (SSE)
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventStream => "text/event-stream",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

/// Writes a complete response in one go: content type, content length,
/// status, body.
///
/// ```rust
/// use interceptor::{ContentType, ResponseRecorder, respond};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut rec = ResponseRecorder::new();
/// respond(&mut rec, 201, ContentType::Json, br#"{"id":42}"#).await.unwrap();
/// assert_eq!(rec.status(), Some(201));
/// # }
/// ```
pub async fn respond(
    res: &mut dyn ResponseSink,
    status: u16,
    content_type: ContentType,
    body: &[u8],
) -> Result<usize, WriteError> {
    let headers = res.headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    res.write_header(status);
    res.write(body).await
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The response sink connected to a live hyper connection.
///
/// Flush-capable always. Hijack-capable only when the request asked for a
/// protocol upgrade.
pub struct ResponseWriter {
    headers: HeaderMap,
    status: Option<StatusCode>,
    head: Option<oneshot::Sender<http::Response<()>>>,
    body: Option<mpsc::Sender<Bytes>>,
    buf: BytesMut,
    upgrade: Option<OnUpgrade>,
}

impl ResponseWriter {
    pub(crate) fn new(upgrade: Option<OnUpgrade>) -> (Self, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

        let writer = Self {
            headers: HeaderMap::new(),
            status: None,
            head: Some(head_tx),
            body: Some(body_tx),
            buf: BytesMut::new(),
            upgrade,
        };
        let pending = PendingResponse { head: head_rx, body: ResponseBody { rx: body_rx } };
        (writer, pending)
    }

    /// Whether the status line and headers have been handed to the transport.
    pub fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    /// Commits the head, with `default` as status unless one was set.
    /// Header changes after this point do not reach the client.
    fn commit(&mut self, default: StatusCode) {
        let Some(tx) = self.head.take() else { return };

        let mut head = http::Response::new(());
        *head.status_mut() = *self.status.get_or_insert(default);
        *head.headers_mut() = self.headers.clone();

        // The receiver is only gone when the connection already is.
        let _ = tx.send(head);
    }

    /// Sends buffered bytes as one body frame.
    async fn ship(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        match &self.body {
            Some(tx) => tx.send(chunk).await.map_err(|_| disconnected()),
            None => Err(hijacked()),
        }
    }

    /// Ends the exchange: commits `200 OK` if nothing was committed, ships
    /// the remaining bytes and closes the body.
    pub(crate) async fn finish(mut self) {
        self.commit(StatusCode::OK);
        if let Err(e) = self.ship().await {
            debug!(error = %e, "dropping unsent response bytes");
        }
    }
}

impl ResponseSink for ResponseWriter {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<usize, WriteError>> {
        Box::pin(async move {
            match &self.body {
                None => return Err(WriteError::new(0, hijacked())),
                Some(tx) if tx.is_closed() => return Err(WriteError::new(0, disconnected())),
                Some(_) => {}
            }

            self.commit(StatusCode::OK);
            self.buf.extend_from_slice(buf);
            if self.buf.len() >= CHUNK_SIZE {
                self.ship().await.map_err(|e| WriteError::new(0, e))?;
            }
            Ok(buf.len())
        })
    }

    fn write_header(&mut self, status: u16) {
        if self.is_committed() {
            warn!(status, "superfluous write_header call, response head already sent");
            return;
        }

        let code = match StatusCode::from_u16(status) {
            Ok(code) => code,
            Err(_) => {
                warn!(status, "ignoring invalid status code");
                return;
            }
        };

        // 1xx other than 101 would be taken for the final response.
        if code.is_informational() && code != StatusCode::SWITCHING_PROTOCOLS {
            debug!(status, "informational status not forwarded");
            return;
        }

        self.status = Some(code);
        self.commit(code);
    }

    fn as_flush(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }

    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        if self.upgrade.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl Flush for ResponseWriter {
    fn flush(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.commit(StatusCode::OK);
            if let Err(e) = self.ship().await {
                debug!(error = %e, "flush failed");
            }
        })
    }
}

impl Hijack for ResponseWriter {
    fn hijack(&mut self) -> BoxFuture<'_, Result<Hijacked, Error>> {
        Box::pin(async move {
            let Some(upgrade) = self.upgrade.take() else {
                return Err(Error::CapabilityNotSupported { capability: "hijack" });
            };

            self.commit(StatusCode::SWITCHING_PROTOCOLS);
            self.buf.clear();
            // hyper hands over the connection once the (empty) body is done.
            self.body = None;

            let upgraded = upgrade.await?;
            Ok(BufStream::new(Box::new(TokioIo::new(upgraded)) as Box<dyn Connection>))
        })
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

fn hijacked() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection was hijacked")
}

// ── Server side ───────────────────────────────────────────────────────────────

/// The server's end of a [`ResponseWriter`]: the head once committed and the
/// body stream behind it.
pub(crate) struct PendingResponse {
    head: oneshot::Receiver<http::Response<()>>,
    body: ResponseBody,
}

impl PendingResponse {
    /// Waits for the head. A writer dropped without committing (the handler
    /// panicked) turns into `500 Internal Server Error`.
    pub(crate) async fn into_response(self) -> http::Response<ResponseBody> {
        match self.head.await {
            Ok(head) => head.map(|()| self.body),
            Err(_) => {
                error!("handler exited without committing a response");
                let mut res = http::Response::new(ResponseBody::empty());
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

/// Streaming response body fed by a [`ResponseWriter`].
pub(crate) struct ResponseBody {
    rx: mpsc::Receiver<Bytes>,
}

impl ResponseBody {
    fn empty() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self { rx }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(|data| Ok(Frame::data(data))))
    }
}
