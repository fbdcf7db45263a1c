//! # interceptor
//!
//! The HTTP front of a scale-to-zero request interceptor: it accepts traffic
//! for workloads behind a reverse proxy and needs to know, for every request,
//! what status went back and how many bytes were sent.
//!
//! ## The pieces
//!
//! - [`ResponseSink`]: what handlers write through. Headers, a status,
//!   body bytes, and two optional capabilities: [`Flush`] and [`Hijack`].
//! - [`ResponseObserver`]: wraps any sink, passes everything through and
//!   counts bytes written and the status set. Flushes after every write so
//!   streamed responses (SSE, long polling) are not held back, and forwards
//!   hijacking so WebSocket tunnels keep working behind it.
//! - [`middleware::AccessLog`]: puts an observer in front of a handler and
//!   emits one structured `tracing` event per request.
//! - [`Router`] / [`Server`]: radix-tree routing and a hyper server with
//!   graceful shutdown.
//! - [`Target`]: where a workload's traffic is forwarded to.
//!
//! What the surrounding platform already owns, this crate ignores: TLS
//! termination, load balancing, choosing a target, and shipping logs or
//! metrics anywhere.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use interceptor::middleware::AccessLog;
//! use interceptor::{BoxFuture, ContentType, Method, Request, ResponseSink, Router, Server, respond};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), interceptor::Error> {
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", AccessLog::new(get_user));
//!
//!     Server::bind("0.0.0.0:3000").await?.serve(app).await
//! }
//!
//! fn get_user<'a>(req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
//!     Box::pin(async move {
//!         let id = req.param("id").unwrap_or("unknown");
//!         let body = format!(r#"{{"id":"{id}"}}"#);
//!         let _ = respond(res, 200, ContentType::Json, body.as_bytes()).await;
//!     })
//! }
//! ```

mod error;
mod handler;
mod observer;
mod recorder;
mod request;
mod response;
mod router;
mod server;
mod sink;

pub mod config;
pub mod health;
pub mod middleware;
pub mod routing;

pub use config::Config;
pub use error::{BoxError, Error, WriteError};
pub use handler::{BoxedHandler, Handler, handler_fn};
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
pub use observer::ResponseObserver;
pub use recorder::ResponseRecorder;
pub use request::Request;
pub use response::{ContentType, ResponseWriter, respond};
pub use router::Router;
pub use routing::Target;
pub use server::Server;
pub use sink::{BoxFuture, Connection, Flush, Hijack, Hijacked, ResponseSink};
