//! Common test utilities for integration tests.
//!
//! Tests run against a real PostgreSQL database named by `TEST_DATABASE_URL`.
//! When the variable is unset every test returns early, so `cargo test`
//! stays green on machines without a database.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::Value;
use spill_api::{
    app::{create_app, AppState},
    config::Config,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

/// Connects and migrates, or returns `None` when no test database is configured.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Test configuration: HS256 tokens, no rate limiting, no classifier.
pub fn test_config() -> Config {
    let storage = std::env::temp_dir().join(format!("spill-test-{}", Uuid::new_v4().simple()));
    let storage = storage.to_string_lossy().to_string();
    Config::load_for_test(&[
        ("security.rate_limit_per_minute", "0"),
        ("media.storage_root", storage.as_str()),
    ])
    .expect("Failed to build test config")
}

pub fn test_app(pool: PgPool) -> Router {
    test_app_with(test_config(), pool)
}

pub fn test_app_with(config: Config, pool: PgPool) -> Router {
    let state = AppState::new(config, pool).expect("Failed to build app state");
    create_app(state)
}

/// Builds a request with an optional bearer token and JSON body.
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends a request and returns the status with the parsed body (`Null` when empty).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, request(Method::GET, uri, Some(token), None)).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, request(Method::POST, uri, Some(token), Some(body))).await
}

pub async fn post_empty(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, request(Method::POST, uri, Some(token), None)).await
}

pub async fn put(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn patch(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, request(Method::PATCH, uri, Some(token), Some(body))).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, request(Method::DELETE, uri, Some(token), None)).await
}

pub fn unique_test_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4().simple())
}

/// A registered account with live tokens.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestUser {
    pub fn token(&self) -> &str {
        &self.access_token
    }
}

/// Registers a fresh user through the API.
pub async fn register_user(app: &Router) -> TestUser {
    let email = unique_test_email();
    let password = "SecureP@ss123!".to_string();
    let display_name: String = Name().fake();

    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": password,
                "display_name": display_name,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

    TestUser {
        id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        email: body["user"]["email"].as_str().unwrap().to_string(),
        password,
        access_token: body["tokens"]["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["tokens"]["refresh_token"].as_str().unwrap().to_string(),
    }
}

pub async fn make_admin(pool: &PgPool, user_id: Uuid) {
    sqlx::query("UPDATE users SET is_admin = true WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn make_staff(pool: &PgPool, user_id: Uuid) {
    sqlx::query("UPDATE users SET is_staff = true WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Stores a post directly, bypassing request validation and the moderation hook.
pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    content: &str,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Uuid {
    persistence::repositories::PostRepository::new(pool.clone())
        .create(persistence::repositories::NewPost {
            user_id,
            content,
            category: persistence::entities::PostCategoryDb::General,
            media_url: None,
            is_vent: expires_at.is_some(),
            expires_at,
        })
        .await
        .expect("Failed to insert post")
        .id
}

/// Creates a public group owned by `owner` and returns its id.
pub async fn create_group(app: &Router, owner: &TestUser) -> Uuid {
    let (status, body) = post(
        app,
        "/api/v1/groups",
        owner.token(),
        serde_json::json!({
            "name": format!("Group {}", Uuid::new_v4().simple()),
            "description": "Support circle",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "group creation failed: {}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}
