//! Test harness driving the real router against in-memory dependencies.
//!
//! Stores, the n8n webhook and Supabase Auth are replaced by the mocks in
//! `TestDependencies`. The Postgres pool points at a closed port and is only
//! touched by `/health`.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use legalbot_core::kernel::TestDependencies;
use legalbot_core::server::build_app;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

/// Nothing listens on port 1
const UNREACHABLE_DATABASE_URL: &str = "postgres://postgres@127.0.0.1:1/legalbot";

/// Status plus decoded JSON body (`Value::Null` when the body is not JSON)
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub struct TestHarness {
    pub deps: TestDependencies,
    app: Router,
}

impl TestHarness {
    /// Build the app over `deps`. Must run inside a Tokio runtime.
    pub fn new(deps: TestDependencies) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(UNREACHABLE_DATABASE_URL)
            .expect("Lazy pool creation does not connect");

        let app = build_app(pool, deps.clone().into_deps(), &[]);
        Self { deps, app }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.json(Method::POST, uri, body, token).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.json(Method::PATCH, uri, body, token).await
    }

    async fn json(&self, method: Method, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        let request = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

/// Request builder with an optional bearer token
pub fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    }
}
