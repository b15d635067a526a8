/// Integration tests for the TaskTrail API
///
/// These tests drive the full router end-to-end:
/// - Signup and login
/// - Bearer token gate and role checks
/// - Record creation with audit entries
/// - Error contract (status, code, reason)

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{TestContext, PASSWORD};
use serde_json::json;
use tasktrail_shared::{
    auth::{jwt::TokenService, password::MIN_PASSWORD_LENGTH},
    models::{record::AuditOperation, user::Role},
    repository::RecordRepository,
};

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let response = ctx.send(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_signup_creates_regular_user() {
    let ctx = TestContext::new();

    let user = ctx.signup("Alice@Example.com").await;

    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "user");
    assert!(user["id"].is_i64());
    assert!(user["created_at"].is_string());
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_signup_ignores_role_in_body() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "email": "sneaky@example.com",
                "password": PASSWORD,
                "role": "admin"
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "user");

    let token = ctx.login("sneaky@example.com").await;
    let response = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let ctx = TestContext::new();
    ctx.signup("dup@example.com").await;

    let response = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "DUP@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "conflict");
}

#[tokio::test]
async fn test_signup_validation_failures() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "not-an-email", "password": "short" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_failed");

    let details = response.body["details"].as_array().unwrap();
    let fields: Vec<&str> = details
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);

    assert!(ctx.repo.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signup_password_length_boundary() {
    let ctx = TestContext::new();

    let too_short = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "email": "edge@example.com",
                "password": "x".repeat(MIN_PASSWORD_LENGTH - 1),
            })),
        )
        .await;
    assert_eq!(too_short.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_short.body["details"][0]["field"], "password");

    let exact = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({
                "email": "edge@example.com",
                "password": "x".repeat(MIN_PASSWORD_LENGTH),
            })),
        )
        .await;
    assert_eq!(exact.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_json_is_validation_failure() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = ctx.send_request(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_failed");

    let response = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "missing-password@example.com" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_failed");
}

#[tokio::test]
async fn test_login_issues_token_with_user_role() {
    let ctx = TestContext::new();
    let user = ctx.signup("bob@example.com").await;

    let token = ctx.login("BOB@Example.com").await;

    let claims = ctx.tokens.validate(&token, Utc::now()).unwrap();
    assert_eq!(claims.user_id().unwrap(), user["id"].as_i64().unwrap());
    assert_eq!(claims.role, Role::User);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.signup("carol@example.com").await;

    let wrong_password = ctx
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "carol@example.com", "password": "wrong password" })),
        )
        .await;
    let unknown_email = ctx
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "wrong password" })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_unknown_email_login_runs_password_verification() {
    let ctx = TestContext::new();
    ctx.signup("dave@example.com").await;
    assert!(ctx.credentials.dummy_hash().is_none());

    // A known email never touches the dummy hash
    let wrong_password = ctx
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "dave@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert!(ctx.credentials.dummy_hash().is_none());

    let unknown_email = ctx
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.body["reason"], "invalid_credentials");

    let dummy = ctx
        .credentials
        .dummy_hash()
        .expect("unknown email should verify against the dummy hash");
    assert!(dummy.starts_with("$argon2id$"));
    assert!(dummy.contains("m=4096"));
}

#[tokio::test]
async fn test_records_require_bearer_token() {
    let ctx = TestContext::new();

    let missing = ctx.send(Method::GET, "/api/v1/records", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "unauthorized");
    assert_eq!(missing.body["reason"], "missing_authorization");

    for value in ["Basic dXNlcjpwYXNz", "Bearer", "bearer abc", "Bearer a b"] {
        let request = Request::builder()
            .uri("/api/v1/records")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let response = ctx.send_request(request).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", value);
        assert_eq!(response.body["reason"], "malformed_authorization", "{}", value);
    }

    let garbage = ctx
        .send(Method::GET, "/api/v1/records", Some("not.a.jwt"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["reason"], "invalid_token");
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_rejected() {
    let ctx = TestContext::new();
    let user = ctx.signup("dave@example.com").await;
    let user_id = user["id"].as_i64().unwrap();

    let expired = ctx
        .tokens
        .issue(user_id, Role::User, Utc::now() - Duration::hours(25))
        .unwrap();
    let response = ctx
        .send(Method::GET, "/api/v1/records", Some(&expired), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["reason"], "invalid_token");

    let foreign = TokenService::new(b"some-other-secret-that-is-32-bytes-long")
        .issue(user_id, Role::Admin, Utc::now())
        .unwrap();
    let response = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&foreign), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_record_uses_authenticated_owner() {
    let ctx = TestContext::new();
    let alice = ctx.signup("alice@example.com").await;
    let bob = ctx.signup("bob@example.com").await;
    let alice_token = ctx.login("alice@example.com").await;
    let bob_token = ctx.login("bob@example.com").await;

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/records",
            Some(&alice_token),
            Some(json!({ "name": "write report", "owner_id": bob["id"] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["name"], "write report");
    assert_eq!(response.body["owner_id"], alice["id"]);

    let record_id = response.body["id"].as_i64().unwrap();
    let entries = ctx.repo.audit_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record_id, record_id);
    assert_eq!(entries[0].operation, AuditOperation::Create);

    let alice_records = ctx
        .send(Method::GET, "/api/v1/records", Some(&alice_token), None)
        .await;
    assert_eq!(alice_records.status, StatusCode::OK);
    assert_eq!(alice_records.body.as_array().unwrap().len(), 1);

    let bob_records = ctx
        .send(Method::GET, "/api/v1/records", Some(&bob_token), None)
        .await;
    assert_eq!(bob_records.status, StatusCode::OK);
    assert_eq!(bob_records.body, json!([]));
}

#[tokio::test]
async fn test_records_listed_in_insertion_order() {
    let ctx = TestContext::new();
    let token = ctx.user_token("erin@example.com").await;

    for name in ["first", "second", "third"] {
        let response = ctx
            .send(
                Method::POST,
                "/api/v1/records",
                Some(&token),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = ctx
        .send(Method::GET, "/api/v1/records", Some(&token), None)
        .await;
    let names: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_invalid_record_writes_nothing() {
    let ctx = TestContext::new();
    let token = ctx.user_token("frank@example.com").await;

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/records",
            Some(&token),
            Some(json!({ "name": "" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_failed");
    assert_eq!(response.body["details"][0]["field"], "name");
    assert!(ctx.repo.audit_entries().await.is_empty());
}

#[tokio::test]
async fn test_failed_audit_write_leaves_no_record() {
    let ctx = TestContext::new();
    let token = ctx.user_token("grace@example.com").await;
    ctx.repo.fail_audit_writes_for("doomed").await;

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/records",
            Some(&token),
            Some(json!({ "name": "doomed" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "An internal error occurred");

    let listed = ctx
        .send(Method::GET, "/api/v1/records", Some(&token), None)
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert!(listed.body.as_array().unwrap().is_empty());
    assert!(ctx.repo.audit_entries().await.is_empty());
}

#[tokio::test]
async fn test_gate_runs_before_body_validation() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/records",
            None,
            Some(json!({ "name": "" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let ctx = TestContext::new();
    let user_token = ctx.user_token("grace@example.com").await;
    let admin_token = ctx.admin_token("root@example.com").await;

    let forbidden = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&user_token), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["error"], "forbidden");
    assert_eq!(forbidden.body["reason"], "insufficient_role");

    let allowed = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&admin_token), None)
        .await;
    assert_eq!(allowed.status, StatusCode::OK);

    let users = allowed.body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1]["role"], "admin");
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));

    let anonymous = ctx
        .send(Method::GET, "/api/v1/admin/users", None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_can_use_regular_routes() {
    let ctx = TestContext::new();
    let admin_token = ctx.admin_token("root@example.com").await;

    let response = ctx
        .send(Method::GET, "/api/v1/records", Some(&admin_token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_header() {
    let ctx = TestContext::new();

    let response = ctx.send(Method::GET, "/health", None, None).await;
    let generated = response.headers.get("x-request-id").unwrap();
    assert!(!generated.is_empty());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "caller-supplied-id")
        .body(Body::empty())
        .unwrap();
    let response = ctx.send_request(request).await;
    assert_eq!(response.headers["x-request-id"], "caller-supplied-id");
}

#[tokio::test]
async fn test_signup_login_admin_scenario() {
    let ctx = TestContext::new();

    let signup = ctx
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "a@b.com", "password": "password123" })),
        )
        .await;
    assert_eq!(signup.status, StatusCode::CREATED);
    assert_eq!(signup.body["role"], "user");
    assert!(signup.body.get("password_hash").is_none());

    let login = ctx
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@b.com", "password": "password123" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap().to_string();
    assert_eq!(ctx.tokens.validate(&token, Utc::now()).unwrap().role, Role::User);

    let forbidden = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&token), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let user_id = signup.body["id"].as_i64().unwrap();
    let admin_token = ctx.tokens.issue(user_id, Role::Admin, Utc::now()).unwrap();
    let allowed = ctx
        .send(Method::GET, "/api/v1/admin/users", Some(&admin_token), None)
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
}
