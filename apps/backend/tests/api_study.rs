//! Study session API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;

use common::fixtures;
use common::TestContext;

/// Test a full flashcard session persists its results.
#[tokio::test]
#[ignore = "requires database"]
async fn test_flashcard_session_completes_and_persists() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, token) = ctx.create_test_user(None).await;
    let auth = TestContext::auth_header_value(&token);
    let (deck, _) = ctx.create_test_deck(user_id, 3).await;

    let response = server
        .post("/api/study/sessions")
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::create_session_request(deck.id))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(body["view"]["status"], "unselected");
    assert_eq!(body["view"]["total_cards"], 3);

    let base = format!("/api/study/sessions/{}", session_id);
    server
        .post(&format!("{}/start", base))
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::start_request("flashcard"))
        .await
        .assert_status_ok();

    let mut last = serde_json::Value::Null;
    for rating in [5, 2, 4] {
        server
            .post(&format!("{}/reveal", base))
            .add_header(axum::http::header::AUTHORIZATION, auth.clone())
            .await
            .assert_status_ok();
        let response = server
            .post(&format!("{}/rate", base))
            .add_header(axum::http::header::AUTHORIZATION, auth.clone())
            .json(&fixtures::rate_request(rating))
            .await;
        response.assert_status_ok();
        last = response.json();
    }

    assert_eq!(last["view"]["status"], "complete");
    assert_eq!(last["view"]["summary"]["accuracy"], 67);
    assert_eq!(last["view"]["summary"]["average_rating"], 3.7);

    // Persistence runs in the background.
    let mut persisted = 0i64;
    for _ in 0..50 {
        persisted = sqlx::query_scalar("SELECT COUNT(*) FROM study_results WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(ctx.db.pool())
            .await
            .unwrap();
        if persisted == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(persisted, 3);

    // Cleanup
    ctx.cleanup_user(user_id).await;
}

/// Test an empty deck cannot be studied.
#[tokio::test]
#[ignore = "requires database"]
async fn test_empty_deck_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, token) = ctx.create_test_user(None).await;
    let (deck, _) = ctx.create_test_deck(user_id, 0).await;

    let response = server
        .post("/api/study/sessions")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .json(&fixtures::create_session_request(deck.id))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Cleanup
    ctx.cleanup_user(user_id).await;
}

/// Test out-of-order operations answer 409 and foreign sessions 404.
#[tokio::test]
#[ignore = "requires database"]
async fn test_contract_violations_and_ownership() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, token) = ctx.create_test_user(None).await;
    let (other_id, other_token) = ctx.create_test_user(None).await;
    let auth = TestContext::auth_header_value(&token);
    let (deck, _) = ctx.create_test_deck(user_id, 2).await;

    let body: serde_json::Value = server
        .post("/api/study/sessions")
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::create_session_request(deck.id))
        .await
        .json();
    let base = format!("/api/study/sessions/{}", body["session_id"].as_str().unwrap());

    // Rating before a mode is chosen
    server
        .post(&format!("{}/rate", base))
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::rate_request(3))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .post(&format!("{}/start", base))
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::start_request("quiz"))
        .await
        .assert_status_ok();

    // Starting twice
    server
        .post(&format!("{}/start", base))
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::start_request("quiz"))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .get(&base)
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&other_token),
        )
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .delete(&base)
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&base)
        .add_header(axum::http::header::AUTHORIZATION, auth)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Cleanup
    ctx.cleanup_user(user_id).await;
    ctx.cleanup_user(other_id).await;
}

/// Test analytics reflect a persisted session.
#[tokio::test]
#[ignore = "requires database"]
async fn test_analytics_after_session() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let (user_id, token) = ctx.create_test_user(None).await;
    let auth = TestContext::auth_header_value(&token);
    let (deck, _) = ctx.create_test_deck(user_id, 2).await;

    let body: serde_json::Value = server
        .post("/api/study/sessions")
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::create_session_request(deck.id))
        .await
        .json();
    let base = format!("/api/study/sessions/{}", body["session_id"].as_str().unwrap());

    server
        .post(&format!("{}/start", base))
        .add_header(axum::http::header::AUTHORIZATION, auth.clone())
        .json(&fixtures::start_request("adaptive"))
        .await
        .assert_status_ok();
    for _ in 0..2 {
        server
            .post(&format!("{}/reveal", base))
            .add_header(axum::http::header::AUTHORIZATION, auth.clone())
            .await
            .assert_status_ok();
        server
            .post(&format!("{}/rate", base))
            .add_header(axum::http::header::AUTHORIZATION, auth.clone())
            .json(&fixtures::rate_request(5))
            .await
            .assert_status_ok();
    }

    let mut report = serde_json::Value::Null;
    for _ in 0..50 {
        report = server
            .get("/api/analytics?range=30d")
            .add_header(axum::http::header::AUTHORIZATION, auth.clone())
            .await
            .json();
        if report["total_sessions"] == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(report["total_sessions"], 1);
    assert_eq!(report["average_accuracy"], 100.0);
    assert_eq!(report["total_decks"], 1);
    assert_eq!(report["total_cards"], 2);
    assert_eq!(report["current_streak"], 1);

    server
        .get("/api/analytics?range=1y")
        .add_header(axum::http::header::AUTHORIZATION, auth)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Cleanup
    ctx.cleanup_user(user_id).await;
}
