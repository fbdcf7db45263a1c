//! Minimal interceptor: access-logged routes, streaming, and a raw tunnel.
//!
//! Run with:
//!   cargo run --example basic [config.toml]
//!
//! Try:
//!   curl -i http://localhost:8080/targets/checkout
//!   curl -N http://localhost:8080/events
//!   curl -X POST http://localhost:8080/echo -d 'hello'
//!   curl http://localhost:8080/healthz
//!
//! Every request produces one `request served` line with status and bytes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use interceptor::middleware::AccessLog;
use interceptor::{
    BoxFuture, Config, ContentType, Error, HeaderValue, Method, Request, ResponseSink, Router,
    Server, Target, handler_fn, health, respond,
};
use http::header::CONTENT_TYPE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => demo_config()?,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let targets = Arc::new(config.targets.clone());

    let app = Router::new()
        .on(Method::GET, "/targets/{service}", AccessLog::new(handler_fn(move |req, res| {
            let targets = Arc::clone(&targets);
            Box::pin(async move { lookup_target(&targets, req, res).await })
        })))
        .on(Method::GET, "/events", AccessLog::new(events))
        .on(Method::POST, "/echo", AccessLog::new(echo))
        .on(Method::GET, "/tunnel", AccessLog::new(tunnel))
        .on(Method::GET, "/healthz", health::liveness)
        .on(Method::GET, "/readyz", health::readiness);

    Server::bind(&config.bind_address).await?.serve(app).await?;
    Ok(())
}

fn demo_config() -> Result<Config, Error> {
    r#"
        bind_address = "127.0.0.1:8080"
        log_filter = "interceptor=debug,basic=debug,info"

        [[targets]]
        host = "checkout.shop.svc.cluster.local"
        service = "checkout"
        port = 8080
        deployment = "checkout"
    "#
    .parse()
}

// GET /targets/{service} → where that service's traffic would be forwarded
async fn lookup_target(targets: &[Target], req: Request, res: &mut dyn ResponseSink) {
    let service = req.param("service").unwrap_or_default();
    let Some(target) = targets.iter().find(|t| t.service == service) else {
        let _ = respond(res, 404, ContentType::Text, b"unknown service").await;
        return;
    };

    match target.service_url() {
        Ok(url) => {
            let body = format!(r#"{{"service":"{service}","url":"{url}"}}"#);
            let _ = respond(res, 200, ContentType::Json, body.as_bytes()).await;
        }
        Err(e) => {
            tracing::warn!(service, error = %e, "target has no usable url");
            let _ = respond(res, 502, ContentType::Text, b"bad target").await;
        }
    }
}

// GET /events → three server-sent events, one per second, each delivered
// as soon as it is written
fn events<'a>(_req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        res.headers().insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::EventStream.as_str()));
        res.write_header(200);
        for i in 1..=3 {
            if res.write(format!("data: tick {i}\n\n").as_bytes()).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    })
}

// POST /echo → request body back, untouched
fn echo<'a>(req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        match req.into_bytes().await {
            Ok(body) => {
                let _ = respond(res, 200, ContentType::OctetStream, &body).await;
            }
            Err(_) => {
                let _ = respond(res, 400, ContentType::Text, b"unreadable body").await;
            }
        }
    })
}

// GET /tunnel with `Connection: upgrade` → raw echo over the hijacked socket
fn tunnel<'a>(_req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let hijacked = match res.as_hijack() {
            Some(hijacker) => hijacker.hijack().await,
            None => Err(Error::CapabilityNotSupported { capability: "hijack" }),
        };
        let mut conn = match hijacked {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(error = %e, "no tunnel");
                let _ = respond(res, 426, ContentType::Text, b"upgrade required").await;
                return;
            }
        };

        let mut buf = [0u8; 1024];
        while let Ok(n) = conn.read(&mut buf).await {
            if n == 0 || conn.write_all(&buf[..n]).await.is_err() || conn.flush().await.is_err() {
                break;
            }
        }
    })
}
