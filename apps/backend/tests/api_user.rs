//! Learner registration and status API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;

use common::fixtures;
use common::TestContext;

/// Test registration without a name.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_user_without_name() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let response = server
        .post("/api/user/register")
        .json(&fixtures::user_register_request(None))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    assert!(body.get("user_id").is_some());
    assert!(body["token"].as_str().unwrap().len() > 10);

    // Cleanup
    let user_id = uuid::Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap();
    ctx.cleanup_user(user_id).await;
}

/// Test status endpoint requires authentication.
#[tokio::test]
#[ignore = "requires database"]
async fn test_user_status_requires_auth() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let response = server.get("/api/user/status").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/user/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value("not-a-real-token"),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

/// Test status with a valid token.
#[tokio::test]
#[ignore = "requires database"]
async fn test_user_status_with_valid_token() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, token) = ctx.create_test_user(Some("Ada")).await;

    let response = server
        .get("/api/user/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], user_id.to_string());
    assert_eq!(body["name"], "Ada");

    // Cleanup
    ctx.cleanup_user(user_id).await;
}
