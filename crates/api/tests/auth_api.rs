//! Integration tests for operator authentication and role enforcement.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json, post_json_auth, register_operator, register_player};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn bootstrap_register_then_login(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/register",
        serde_json::json!({
            "username": "operator",
            "email": "operator@example.com",
            "password": "a-long-test-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["operator"]["username"], "operator");

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": "operator",
            "password": "a-long-test-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["expires_in"].as_i64().unwrap() > 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn register_is_bootstrap_only(pool: PgPool) {
    let app = common::build_test_app(pool);
    let _token = register_operator(app.clone()).await;

    // A second anonymous register must be refused.
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "username": "intruder",
            "email": "intruder@example.com",
            "password": "another-long-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn operator_can_create_further_operators(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = register_operator(app.clone()).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/operators",
        &token,
        serde_json::json!({
            "username": "second",
            "email": "second@example.com",
            "password": "a-long-test-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": "second",
            "password": "a-long-test-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_password_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    let _token = register_operator(app.clone()).await;

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": "operator",
            "password": "not-the-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn short_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "username": "operator",
            "email": "operator@example.com",
            "password": "short",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_routes_reject_missing_and_player_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);
    let _operator = register_operator(app.clone()).await;
    let (player_token, _) = register_player(app.clone(), "Alice", "device-alice").await;

    // No token at all.
    let response = common::get(app.clone(), "/api/v1/admin/locations").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A player token is authenticated but not an operator.
    let response = get_auth(app, "/api/v1/admin/locations", &player_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn returning_device_gets_the_same_player(pool: PgPool) {
    let app = common::build_test_app(pool);

    let (_, first_id) = register_player(app.clone(), "Alice", "device-alice").await;
    let (token, second_id) = register_player(app.clone(), "Alicia", "device-alice").await;
    assert_eq!(first_id, second_id, "same device must map to the same player");

    // The refreshed registration carries the new display name.
    let response = get_auth(app, "/api/v1/players/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["display_name"], "Alicia");
    assert_eq!(json["data"]["total_winnings_cents"], 0);
}
