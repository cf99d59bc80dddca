//! Test application factory for integration tests.

use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use rserve::models::{KeyPair, ServerConfig, DEFAULT_PORT};
use rserve::server::{build_router, create_app_state, create_app_state_with_store, AppState};
use rserve::services::{BlobStore, InMemoryBlobStore, SignedUrl, UrlSigner};

use super::fixtures;

/// Test application with router, signing key and direct access to the store
pub struct TestApp {
    router: axum::Router,
    pub keys: KeyPair,
    pub signer: UrlSigner,
    pub config: ServerConfig,
}

impl TestApp {
    /// App backed by an in-memory store seeded with the standard fixtures
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryBlobStore::new());
        fixtures::seed(&store).await;
        Self::with_store(store)
    }

    /// App backed by any blob store
    pub fn with_store(store: Arc<dyn BlobStore>) -> Self {
        let keys = KeyPair::generate();
        let config = server_config(&keys, PathBuf::from("."));
        let state = create_app_state_with_store(&config, store);
        Self::from_state(keys, config, state)
    }

    /// Seeded in-memory app whose links also cover the remote name
    pub async fn with_bound_remote() -> Self {
        let store = Arc::new(InMemoryBlobStore::new());
        fixtures::seed(&store).await;
        let keys = KeyPair::generate();
        let mut config = server_config(&keys, PathBuf::from("."));
        config.bind_remote = true;
        let state = create_app_state_with_store(&config, store);
        Self::from_state(keys, config, state)
    }

    /// App backed by the local filesystem store rooted at `root`
    pub fn with_local_root(root: PathBuf) -> Self {
        let keys = KeyPair::generate();
        let config = server_config(&keys, root);
        let state = create_app_state(&config);
        Self::from_state(keys, config, state)
    }

    fn from_state(keys: KeyPair, config: ServerConfig, state: AppState) -> Self {
        let signer = UrlSigner::new(
            keys.signing_key().clone(),
            "http://localhost:8090",
            fixtures::REMOTE,
        )
        .with_bind_remote(config.bind_remote);
        Self {
            router: build_router(state),
            keys,
            signer,
            config,
        }
    }

    /// Sign `path` as if issued at `now`
    pub fn sign_at(&self, path: &str, now: DateTime<Utc>) -> SignedUrl {
        self.signer.sign_target(path, now).expect("Failed to sign")
    }

    /// Sign `path` as if issued right now
    pub fn sign(&self, path: &str) -> SignedUrl {
        self.sign_at(path, Utc::now())
    }

    /// Make a GET request to the given request target
    pub async fn get(&self, target: &str) -> TestResponse {
        self.send(Method::GET, target).await
    }

    /// Make a HEAD request to the given request target
    pub async fn head(&self, target: &str) -> TestResponse {
        self.send(Method::HEAD, target).await
    }

    pub async fn send(&self, method: Method, target: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(target)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    /// Send a request and return the raw response without collecting the body
    pub async fn raw(&self, method: Method, target: &str) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(target)
            .body(Body::empty())
            .unwrap();
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    /// Send a request to the router
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Server configuration matching `keys`, serving the fixtures remote
pub fn server_config(keys: &KeyPair, storage_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "localhost:8090".to_string(),
        verifying_key: keys.verifying_key(),
        remote: fixtures::REMOTE.to_string(),
        port: DEFAULT_PORT,
        storage_root,
        bind_remote: false,
    }
}

/// Strip scheme and host so the URL can be sent to the router directly
pub fn request_target(signed: &SignedUrl) -> String {
    let without_scheme = signed
        .url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&signed.url);
    match without_scheme.find('/') {
        Some(i) => without_scheme[i..].to_string(),
        None => "/".to_string(),
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Get raw body bytes
    pub fn bytes(&self) -> Bytes {
        Bytes::from(self.body.clone())
    }

    /// Content-Length header parsed as a number
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}
