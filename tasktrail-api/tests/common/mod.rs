//! Common test utilities for integration tests
//!
//! The router runs against the in-memory repository, so these tests need no
//! database. Password hashing uses light Argon2 parameters.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tasktrail_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasktrail_shared::{
    auth::{
        jwt::TokenService,
        password::{CredentialStore, HashParams},
    },
    models::user::Role,
    repository::MemoryRecordRepository,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "correct horse battery";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub repo: Arc<MemoryRecordRepository>,
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<CredentialStore>,
}

/// Response status, headers and JSON body (`Value::Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgresql://unused/test".to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("test config");

        let repo = Arc::new(MemoryRecordRepository::new());
        let state = AppState::new(repo.clone(), config)
            .with_credentials(CredentialStore::with_params(HashParams::light()));
        let tokens = state.tokens.clone();
        let credentials = state.credentials.clone();

        Self {
            app: build_router(state),
            repo,
            tokens,
            credentials,
        }
    }

    /// Sends one request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Signs up `email` with [`PASSWORD`], asserting success
    pub async fn signup(&self, email: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/signup",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Logs in with [`PASSWORD`] and returns the token
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Signs up and logs in a regular user
    pub async fn user_token(&self, email: &str) -> String {
        self.signup(email).await;
        self.login(email).await
    }

    /// Signs up a user, promotes them to admin, and logs in
    pub async fn admin_token(&self, email: &str) -> String {
        let user = self.signup(email).await;
        let id = user["id"].as_i64().expect("user id");
        self.repo.set_role(id, Role::Admin).await.unwrap();
        self.login(email).await
    }
}
