//! Unified error types.

use std::io;

use thiserror::Error;

/// Boxed error used for request bodies of any origin.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by the crate's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed by writing a
/// status through the [`ResponseSink`](crate::ResponseSink), not as `Error`s.
/// This type surfaces infrastructure failures and the one failure the
/// response observer originates itself: a missing sink capability.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// The wrapped response sink does not offer the requested capability.
    #[error("{capability} is not implemented by the wrapped response sink")]
    CapabilityNotSupported { capability: &'static str },

    /// hyper refused or aborted the protocol upgrade.
    #[error("protocol upgrade failed: {0}")]
    Upgrade(#[from] hyper::Error),

    #[error("invalid service url: {0}")]
    ServiceUrl(#[from] url::ParseError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("request body: {0}")]
    Body(BoxError),
}

/// A failed body write.
///
/// Carries the number of bytes the sink accepted before failing, so callers
/// that count traffic still see bytes that made it out.
#[derive(Debug, Error)]
#[error("write failed after {written} bytes: {source}")]
pub struct WriteError {
    written: usize,
    #[source]
    source: io::Error,
}

impl WriteError {
    pub fn new(written: usize, source: io::Error) -> Self {
        Self { written, source }
    }

    /// Bytes accepted before the failure.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}
