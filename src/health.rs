//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router:
//!
//! ```rust,no_run
//! use interceptor::{Method, Router, health};
//!
//! let app = Router::new()
//!     .on(Method::GET, "/healthz", health::liveness)
//!     .on(Method::GET, "/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler to gate on dependencies.

use tracing::debug;

use crate::request::Request;
use crate::response::{ContentType, respond};
use crate::sink::{BoxFuture, ResponseSink};

/// Liveness probe. Always `200 OK`, body `"ok"`.
pub fn liveness<'a>(_req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if let Err(e) = respond(res, 200, ContentType::Text, b"ok").await {
            debug!(error = %e, "liveness response not delivered");
        }
    })
}

/// Readiness probe (default implementation). `200 OK`, body `"ready"`.
pub fn readiness<'a>(_req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if let Err(e) = respond(res, 200, ContentType::Text, b"ready").await {
            debug!(error = %e, "readiness response not delivered");
        }
    })
}
