//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and is itself a handler,
//! so it composes by nesting: `AccessLog::new(inner)`. It is the right place
//! for cross-cutting concerns that need to see the whole exchange.
//!
//! Built-in middleware:
//! - [`AccessLog`]: one structured event per request with method, path,
//!   status, bytes written and latency, counted by a
//!   [`ResponseObserver`](crate::ResponseObserver).

mod access_log;

pub use access_log::{AccessLog, AccessRecord};
