#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use gh_issues_local::config::Config;
use gh_issues_local::web::{AppState, AuthGate, build_router};
use gh_issues_local::cli::commands::serve::open_tracker;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Server over a JSONL file in a temporary data directory.
pub struct TestApi {
    pub dir: TempDir,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn link(&self) -> Option<&str> {
        self.headers
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestApi {
    pub fn new() -> Self {
        Self::with_auth(AuthGate::disabled())
    }

    pub fn with_auth(auth: AuthGate) -> Self {
        gh_issues_local::logging::init_test_logging();
        let dir = tempfile::tempdir().expect("tempdir");
        let router = Self::router_for(&dir, auth);
        Self { dir, router }
    }

    fn config_for(dir: &TempDir) -> Config {
        Config {
            data_dir: Some(dir.path().to_path_buf()),
            public_url: Some("http://issues.test".to_string()),
            ..Default::default()
        }
    }

    fn router_for(dir: &TempDir, auth: AuthGate) -> Router {
        let config = Self::config_for(dir);
        let tracker = open_tracker(&config).expect("open tracker");
        build_router(AppState::new(tracker, auth, config.public_url), false)
    }

    /// Simulate a restart: reload the data file into a fresh router.
    pub fn restart(&mut self) {
        self.router = Self::router_for(&self.dir, AuthGate::disabled());
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn create_issue(&self, repo: &str, body: Value) -> Value {
        let response = self
            .json("POST", &format!("/repos/{repo}/issues"), body)
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

/// Titles of a JSON array of issues.
pub fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array")
        .iter()
        .map(|i| i["title"].as_str().unwrap_or_default().to_string())
        .collect()
}
