//! HTTP server and graceful shutdown.
//!
//! # Shutdown
//!
//! The interceptor runs as a pod. On **SIGTERM** (or Ctrl-C locally, or the
//! future passed to [`Server::serve_with_shutdown`]) the accept loop stops at
//! once. Connections already accepted, and tunnels hijacked from them, keep
//! going until they end on their own, and only then does `serve` return.
//! Keep the pod's grace period longer than your slowest streamed response.
//!
//! # One request
//!
//! Each request gets a fresh [`ResponseWriter`](crate::ResponseWriter) and
//! its handler runs in its own task. hyper is answered as soon as the handler
//! commits a response head; the body streams behind it for as long as the
//! handler keeps writing. Requests carrying an `Upgrade` header get a writer
//! that can be hijacked.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use http::header::UPGRADE;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::request::Request;
use crate::response::{ResponseBody, ResponseWriter};
use crate::router::Router;
use crate::sink::ResponseSink;

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), interceptor::Error> {
    /// use interceptor::{Router, Server};
    /// Server::bind("0.0.0.0:3000").await?.serve(Router::new()).await
    /// # }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The address actually bound, useful after binding port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `shutdown` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = self.listener;
        let addr = listener.local_addr()?;

        // Shared across connection tasks without copying the routing table.
        let router = Arc::new(router);

        info!(addr = %addr, "interceptor listening");

        // Every spawned connection task, so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        // Handler tasks. A hijacked tunnel lives here after hyper has let go
        // of its connection.
        let handlers = TaskTracker::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let handlers = handlers.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            let handlers = handlers.clone();
                            async move { dispatch(router, handlers, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                        // Upgrades stay enabled so handlers can hijack.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection_with_upgrades(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        handlers.close();
        if !handlers.is_empty() {
            info!(in_flight = handlers.len(), "waiting for handlers and hijacked connections");
        }
        handlers.wait().await;

        info!("interceptor stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and answers hyper with the head the handler commits.
///
/// Infallible: misses become 404, a handler that dies before committing
/// becomes 500.
async fn dispatch(
    router: Arc<Router>,
    handlers: TaskTracker,
    mut req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<ResponseBody>, Infallible> {
    let upgrade = req
        .headers()
        .contains_key(UPGRADE)
        .then(|| hyper::upgrade::on(&mut req));
    let (mut writer, pending) = ResponseWriter::new(upgrade);

    match router.lookup(req.method(), req.uri().path()) {
        Some((handler, params)) => {
            let req = Request::new(req, params, Some(remote_addr));
            handlers.spawn(async move {
                handler.call(req, &mut writer).await;
                writer.finish().await;
            });
        }
        None => {
            debug!(method = %req.method(), path = req.uri().path(), "no route");
            writer.write_header(StatusCode::NOT_FOUND.as_u16());
            writer.finish().await;
        }
    }

    Ok(pending.into_response().await)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A handler that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
