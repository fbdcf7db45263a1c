//! Per-request access logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::info;

use crate::handler::Handler;
use crate::observer::ResponseObserver;
use crate::request::Request;
use crate::sink::{BoxFuture, ResponseSink};

/// What one exchange looked like from the outside.
#[derive(Clone, Debug)]
pub struct AccessRecord {
    pub method: Method,
    pub path: String,
    /// Explicit status set by the handler chain, `0` when none was.
    pub status: u16,
    pub bytes: usize,
    pub elapsed: Duration,
}

type OnComplete = Arc<dyn Fn(&AccessRecord) + Send + Sync>;

/// Runs the inner handler against a [`ResponseObserver`] and logs the result.
///
/// ```rust
/// use interceptor::{Method, Router, health};
/// use interceptor::middleware::AccessLog;
///
/// let app = Router::new()
///     .on(Method::GET, "/healthz", AccessLog::new(health::liveness));
/// ```
pub struct AccessLog<H> {
    inner: H,
    on_complete: Option<OnComplete>,
}

impl<H: Handler> AccessLog<H> {
    pub fn new(inner: H) -> Self {
        Self { inner, on_complete: None }
    }

    /// Hands every finished [`AccessRecord`] to `f` as well, e.g. to feed a
    /// metrics sink.
    pub fn on_complete(mut self, f: impl Fn(&AccessRecord) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }
}

impl<H: Handler> Handler for AccessLog<H> {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.path().to_owned();
            let started = Instant::now();

            let mut observer = ResponseObserver::new(res);
            self.inner.call(req, &mut observer).await;

            let record = AccessRecord {
                method,
                path,
                status: observer.status_code(),
                bytes: observer.bytes_written(),
                elapsed: started.elapsed(),
            };

            info!(
                method = %record.method,
                path = %record.path,
                status = record.status,
                bytes = record.bytes,
                elapsed_ms = record.elapsed.as_secs_f64() * 1000.0,
                "request served",
            );

            if let Some(f) = &self.on_complete {
                f(&record);
            }
        })
    }
}
