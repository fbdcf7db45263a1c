//! The response sink contract handlers write through.
//!
//! A [`ResponseSink`] is the handler-facing side of one HTTP exchange:
//! headers, a status, and a stream of body bytes. Two capabilities are
//! optional and probed at runtime, the way a proxy layer asks "can the thing
//! I wrap do this?":
//!
//! | Capability | Probe | Fallback when absent |
//! |---|---|---|
//! | [`Flush`] | [`ResponseSink::as_flush`] | nothing to flush, skip |
//! | [`Hijack`] | [`ResponseSink::as_hijack`] | caller decides (usually an error) |
//!
//! Sinks that support a capability override the probe to return `Some(self)`.

use std::future::Future;
use std::pin::Pin;

use http::HeaderMap;
use tokio::io::{AsyncRead, AsyncWrite, BufStream};

use crate::error::{Error, WriteError};

/// A heap-allocated, type-erased future borrowing from `'a`.
///
/// `Send` lets tokio move the future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The response half of one exchange.
///
/// Exactly one task owns a sink at a time; `&mut self` on every operation
/// makes that a compile-time guarantee rather than a locking concern.
pub trait ResponseSink: Send {
    /// The response header map. Mutations made before the head is committed
    /// are what the client receives.
    fn headers(&mut self) -> &mut HeaderMap;

    /// Writes body bytes, returning how many were accepted.
    fn write<'a>(&'a mut self, buf: &'a [u8]) -> BoxFuture<'a, Result<usize, WriteError>>;

    /// Sets the response status. Cannot fail; sinks that reject a code log it.
    fn write_header(&mut self, status: u16);

    /// Returns the flush capability, if this sink has one.
    fn as_flush(&mut self) -> Option<&mut dyn Flush> {
        None
    }

    /// Returns the hijack capability, if this sink has one.
    fn as_hijack(&mut self) -> Option<&mut dyn Hijack> {
        None
    }
}

/// Pushes buffered body bytes to the transport immediately.
pub trait Flush: Send {
    fn flush(&mut self) -> BoxFuture<'_, ()>;
}

/// Seizes the raw transport connection, e.g. for WebSocket tunnelling.
///
/// After a successful hijack the HTTP layer is done with the connection;
/// further body writes on the sink fail.
pub trait Hijack: Send {
    fn hijack(&mut self) -> BoxFuture<'_, Result<Hijacked, Error>>;
}

/// Any bidirectional byte stream a hijacked exchange can hand out.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// A hijacked connection behind a read/write buffer.
///
/// `get_mut` / `into_inner` reach the raw connection. Bytes the client sent
/// ahead of the upgrade are delivered by the first reads.
pub type Hijacked = BufStream<Box<dyn Connection>>;
