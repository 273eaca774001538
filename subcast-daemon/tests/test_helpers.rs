//! Test helpers for sink and dispatcher testing
//!
//! Provides a local HTTP server that records every request it receives, so
//! HTTP sinks can be checked without reaching real services.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use std::sync::{Arc, Mutex};

/// One request as seen by the capture server
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    /// Path plus query string, exactly as received
    pub uri: String,
    pub host: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or_default()
    }
}

#[derive(Clone)]
struct CaptureState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    status: StatusCode,
}

/// HTTP server answering every request with a fixed status
pub struct CaptureServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CaptureServer {
    pub async fn start() -> Self {
        Self::with_status(StatusCode::OK).await
    }

    pub async fn with_status(status: StatusCode) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = CaptureState {
            requests: Arc::clone(&requests),
            status,
        };
        let app = Router::new().fallback(capture).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`
    pub fn requests_to(&self, prefix: &str) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path().starts_with(prefix))
            .collect()
    }
}

async fn capture(
    State(state): State<CaptureState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().unwrap().push(CapturedRequest {
        method,
        uri: uri.to_string(),
        host: header_value(header::HOST),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body,
    });
    state.status
}

/// A URL nothing listens on
pub fn unreachable_url() -> String {
    "http://127.0.0.1:1/unreachable".to_string()
}
