//! Handler trait and type erasure.
//!
//! # Shape of a handler
//!
//! A handler receives the request by value and the response sink by mutable
//! borrow, and writes its response through the sink:
//!
//! ```text
//! fn hello<'a>(req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()>
//! ```
//!
//! The sink is borrowed rather than owned so a layer can put a decorator in
//! front of it (see [`AccessLog`](crate::middleware::AccessLog)), run the
//! rest of the chain, and read the decorator back once the chain is done.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* types in a single
//! `HashMap<Method, Tree>`, so every handler is stored as
//! `Arc<dyn Handler>`:
//!
//! ```text
//! fn hello(req, res) -> BoxFuture { … }       ← user writes this
//!        ↓ router.on(Method::GET, "/", hello)
//! Arc::new(hello)                              ← BoxedHandler
//!        ↓
//! handler.call(req, &mut writer)  at request time   ← one vtable dispatch
//! ```

use std::sync::Arc;

use crate::request::Request;
use crate::sink::{BoxFuture, ResponseSink};

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// Implemented for every valid route handler.
///
/// Plain functions with the right signature implement it automatically;
/// middleware implements it by hand.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(Request, &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
        (self)(req, res)
    }
}

/// Pins down a closure's signature so it can be used as a [`Handler`].
///
/// Closures only pick up the higher-ranked signature when they are passed
/// straight to an `Fn` bound:
///
/// ```rust
/// use interceptor::{ContentType, Method, Router, handler_fn, respond};
///
/// let app = Router::new().on(
///     Method::GET,
///     "/ping",
///     handler_fn(|_req, res| Box::pin(async move {
///         let _ = respond(res, 200, ContentType::Text, b"pong").await;
///     })),
/// );
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(Request, &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    f
}
