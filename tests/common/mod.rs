//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use interceptor::middleware::AccessRecord;
use interceptor::{Error, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A server on an ephemeral port, stopped through its shutdown future.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), Error>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = tokio::spawn(server.serve_with_shutdown(router, async {
            let _ = signal.await;
        }));

        Self { addr, shutdown, handle }
    }

    pub async fn stop(self) -> Result<(), Error> {
        let _ = self.shutdown.send(());
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not drain in time")
            .expect("server task panicked")
    }
}

/// Sends one `Connection: close` request and returns the raw response.
pub async fn send(addr: SocketAddr, method: &str, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
        body.len(),
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("response did not complete")
        .unwrap();
    String::from_utf8(out).unwrap()
}

/// Reads from `stream` until `needle` has been seen; returns everything read.
#[allow(dead_code)]
pub async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut seen = Vec::new();
    let mut buf = [0u8; 512];
    while !String::from_utf8_lossy(&seen).contains(needle) {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
            .unwrap();
        assert!(n > 0, "connection closed before {needle:?} arrived");
        seen.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(seen).unwrap()
}

/// Collects the access records an `AccessLog` hands out.
#[allow(dead_code)]
pub fn capture() -> (Arc<Mutex<Vec<AccessRecord>>>, impl Fn(&AccessRecord) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |r: &AccessRecord| sink.lock().unwrap().push(r.clone()))
}

/// Waits until `seen` holds at least one record; handler tasks outlive the
/// connection once it has been hijacked.
#[allow(dead_code)]
pub async fn first_record(seen: &Mutex<Vec<AccessRecord>>) -> AccessRecord {
    for _ in 0..500 {
        if let Some(record) = seen.lock().unwrap().first() {
            return record.clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no access record was produced");
}
