//! Shared helpers for the integration tests: an in-process HTTP server that
//! records every request it sees.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_ENCODING, CONTENT_RANGE, CONTENT_TYPE, COOKIE, RANGE, REFERER};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use dlx_engine::{DownloaderConfig, DownloaderConfigBuilder, RetryPolicy, Transport};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use url::Url;

pub const PAYLOAD_LEN: usize = 64 * 1024;

/// Bytes served by the ranged endpoints.
pub fn payload() -> Bytes {
    (0..PAYLOAD_LEN).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub range: Option<String>,
    pub referer: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Clone)]
struct ServerState {
    payload: Bytes,
    hits: Arc<Mutex<Vec<Hit>>>,
    flaky_calls: Arc<AtomicUsize>,
}

impl ServerState {
    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.hits.lock().push(Hit {
            path: uri.path().to_string(),
            range: header(RANGE),
            referer: header(REFERER),
            cookie: header(COOKIE),
        });
    }
}

fn range_start(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(RANGE)?
        .to_str()
        .ok()?
        .strip_prefix("bytes=")?
        .strip_suffix('-')?
        .parse()
        .ok()
}

fn serve_range(payload: &Bytes, headers: &HeaderMap) -> Response {
    match range_start(headers) {
        Some(start) if start < payload.len() => (
            StatusCode::PARTIAL_CONTENT,
            [(
                CONTENT_RANGE,
                format!("bytes {start}-{}/{}", payload.len() - 1, payload.len()),
            )],
            payload.slice(start..),
        )
            .into_response(),
        _ => payload.clone().into_response(),
    }
}

async fn ranged(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    serve_range(&state.payload, &headers)
}

async fn ignores_range(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    state.payload.clone().into_response()
}

async fn fail(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

/// The first response breaks off after the first quarter of the payload.
async fn flaky(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    if state.flaky_calls.fetch_add(1, Ordering::SeqCst) > 0 {
        return serve_range(&state.payload, &headers);
    }

    let head = state.payload.slice(..PAYLOAD_LEN / 4);
    let stream = futures::stream::iter([Ok::<Bytes, io::Error>(head)]).chain(
        futures::stream::once(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "dropped"))
        }),
    );
    Body::from_stream(stream).into_response()
}

async fn gzipped(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    state.record(&uri, &headers);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"hello from dlx").unwrap();
    (
        [(CONTENT_ENCODING, "gzip"), (CONTENT_TYPE, "text/plain; charset=utf-8")],
        encoder.finish().unwrap(),
    )
        .into_response()
}

/// Streamed body, so no `Content-Length` is sent.
async fn chunked(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    let chunks = [Ok::<_, io::Error>(Bytes::from_static(b"live"))];
    (
        [(CONTENT_TYPE, "video/x-flv")],
        Body::from_stream(futures::stream::iter(chunks)),
    )
        .into_response()
}

async fn mp4_file(State(state): State<ServerState>, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&uri, &headers);
    ([(CONTENT_TYPE, "video/mp4")], state.payload.clone()).into_response()
}

/// Recording test server on a random localhost port.
pub struct TestServer {
    base_url: Url,
    hits: Arc<Mutex<Vec<Hit>>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            payload: payload(),
            hits: Arc::clone(&hits),
            flaky_calls: Arc::new(AtomicUsize::new(0)),
        };
        let router = Router::new()
            .route("/media/{name}", get(ranged))
            .route("/norange/{name}", get(ignores_range))
            .route("/fail/{name}", get(fail))
            .route("/flaky/{name}", get(flaky))
            .route("/gzip", get(gzipped))
            .route("/live/{name}", get(chunked))
            .route("/files/{name}", get(mp4_file))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test HTTP listener");
        let addr = listener.local_addr().expect("read test listener local addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.expect("run test HTTP server");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("parse base URL"),
            hits,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.base_url.join(path).expect("join server URL path").into()
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Transport with one attempt per request and no system proxy.
pub fn transport() -> Arc<Transport> {
    transport_with(DownloaderConfig::builder().retry_times(1))
}

pub fn transport_with(builder: DownloaderConfigBuilder) -> Arc<Transport> {
    let config = builder
        .retry_delay(Duration::from_millis(10))
        .use_system_proxy(false)
        .build();
    Arc::new(Transport::new(config).expect("build transport"))
}

/// Five attempts, quickly.
pub fn quick_parts() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(10))
}
