#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end tests for the REST surface: request in, status code and JSON
//! body out. Accounts are seeded with cheap KDF params so the suite stays
//! fast; login re-derives with whatever the account row stores.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use coffre_crypto_core::kdf::Argon2idParams;
use coffre_server::app;
use coffre_vault::Vault;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_PARAMS: Argon2idParams = Argon2idParams {
    t_cost: 1,
    m_cost: 32,
    p_cost: 1,
    output_len: 32,
    version: 0x13,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn app_with_user(username: &str, password: &str) -> Router {
    let vault = Vault::open_in_memory().expect("open should succeed");
    vault
        .create_account_with_params(username, password, &TEST_PARAMS)
        .expect("account creation should succeed");
    app(Arc::new(vault))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn login(app: &Router, username: &str, password: &str) {
    let (status, _) = send(
        app,
        post_json(
            "/account/login",
            &json!({ "username": username, "master_password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_account_returns_201() {
    let app = app(Arc::new(Vault::open_in_memory().expect("open")));
    let (status, body) = send(
        &app,
        post_json(
            "/account/create",
            &json!({ "username": "alice", "master_password": "CorrectHorseBatteryStaple" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "account created");
}

#[tokio::test]
async fn create_account_missing_fields_is_400() {
    let app = app_with_user("alice", "pw-irrelevant");
    let (status, body) = send(
        &app,
        post_json("/account/create", &json!({ "username": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing fields");
}

#[tokio::test]
async fn duplicate_username_is_409() {
    let app = app_with_user("alice", "first-password");
    let (status, body) = send(
        &app,
        post_json(
            "/account/create",
            &json!({ "username": "alice", "master_password": "other-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username already exists");
}

#[tokio::test]
async fn bad_login_is_401_and_generic() {
    let app = app_with_user("alice", "right-password");

    let (status, wrong_pw) = send(
        &app,
        post_json(
            "/account/login",
            &json!({ "username": "alice", "master_password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status2, no_user) = send(
        &app,
        post_json(
            "/account/login",
            &json!({ "username": "nobody", "master_password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status2, StatusCode::UNAUTHORIZED);

    // Identical body for both failure causes.
    assert_eq!(wrong_pw, no_user);
    assert_eq!(wrong_pw["error"], "incorrect credentials");
}

// ---------------------------------------------------------------------------
// Session gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locked_vault_gates_credential_routes_with_423() {
    let app = app_with_user("alice", "right-password");
    let (status, body) = send(
        &app,
        post_json(
            "/add",
            &json!({ "site": "s.com", "username": "u", "password": "p" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "vault is locked");
}

#[tokio::test]
async fn unlocked_without_login_is_401() {
    let app = app_with_user("alice", "right-password");
    send(&app, post_json("/unlock", &json!({}))).await;

    let (status, body) = send(&app, get("/list")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not logged in");
}

#[tokio::test]
async fn status_reflects_lock_state() {
    let app = app_with_user("alice", "right-password");

    let (_, body) = send(&app, get("/status")).await;
    assert_eq!(body["vault_locked"], true);

    login(&app, "alice", "right-password").await;
    let (_, body) = send(&app, get("/status")).await;
    assert_eq!(body["vault_locked"], false);

    send(&app, post_json("/lock", &json!({}))).await;
    let (_, body) = send(&app, get("/status")).await;
    assert_eq!(body["vault_locked"], true);
}

// ---------------------------------------------------------------------------
// Credential CRUD over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crud_roundtrip() {
    let app = app_with_user("alice", "CorrectHorseBatteryStaple");
    login(&app, "alice", "CorrectHorseBatteryStaple").await;

    let (status, added) = send(
        &app,
        post_json(
            "/add",
            &json!({ "site": "example.com", "username": "alice", "password": "Tr0ub4dor&3" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["id"], 1);
    assert!(added["created_at"].is_string());

    let (status, fetched) = send(&app, get("/get/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["site"], "example.com");
    assert_eq!(fetched["username"], "alice");
    assert_eq!(fetched["password"], "Tr0ub4dor&3");

    let (status, listed) = send(&app, get("/list")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let (status, deleted) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/delete/1")
            .body(Body::empty())
            .expect("request should build"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["password"], "Tr0ub4dor&3");

    let (status, _) = send(&app, get("/get/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_without_id_is_400() {
    let app = app_with_user("alice", "right-password");
    login(&app, "alice", "right-password").await;

    let (status, body) = send(
        &app,
        put_json(
            "/update",
            &json!({ "site": "s.com", "username": "u", "password": "p" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing id");
}

#[tokio::test]
async fn check_duplicate_answers_with_a_boolean() {
    let app = app_with_user("alice", "right-password");
    login(&app, "alice", "right-password").await;
    send(
        &app,
        post_json(
            "/add",
            &json!({ "site": "ex.com", "username": "alice", "password": "pw" }),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        post_json(
            "/check-duplicate",
            &json!({ "site": "ex.com", "username": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], true);

    let (_, body) = send(
        &app,
        post_json(
            "/check-duplicate",
            &json!({ "site": "ex.com", "username": "bob" }),
        ),
    )
    .await;
    assert_eq!(body["duplicate"], false);
}

// ---------------------------------------------------------------------------
// Lockout over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_failures_lock_and_surface_remaining_seconds() {
    let app = app_with_user("alice", "right-password");

    for _ in 0..3 {
        send(
            &app,
            post_json(
                "/account/login",
                &json!({ "username": "alice", "master_password": "wrong" }),
            ),
        )
        .await;
    }

    let (status, body) = send(&app, get("/account/lockout-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locked"], true);
    let seconds = body["lockout_seconds"].as_u64().expect("seconds");
    assert!(seconds > 0 && seconds <= 15);

    // Correct password is rejected too while the window is active.
    let (status, body) = send(
        &app,
        post_json(
            "/account/login",
            &json!({ "username": "alice", "master_password": "right-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "login locked");
    assert!(body["lockout_seconds"].as_u64().expect("seconds") > 0);
}

// ---------------------------------------------------------------------------
// Password helpers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_password_respects_length() {
    let app = app_with_user("alice", "right-password");

    let (status, body) = send(&app, get("/generate-password?length=24")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["password"].as_str().expect("password").len(), 24);

    let (status, _) = send(&app, get("/generate-password?length=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_strength_is_informational() {
    let app = app_with_user("alice", "right-password");
    let (status, body) = send(
        &app,
        post_json("/password-strength", &json!({ "password": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strength"], "weak");
}

// ---------------------------------------------------------------------------
// Import / export over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_missing_columns_is_400() {
    let app = app_with_user("alice", "right-password");
    login(&app, "alice", "right-password").await;

    let request = Request::builder()
        .method("POST")
        .uri("/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("site,username\ns.com,u\n"))
        .expect("request should build");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("missing required columns"));
}

#[tokio::test]
async fn import_then_export_roundtrip() {
    let app = app_with_user("alice", "right-password");
    login(&app, "alice", "right-password").await;

    let request = Request::builder()
        .method("POST")
        .uri("/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(
            "site,username,password\nex.com,u1,p1\nex.com,u2,p2\n",
        ))
        .expect("request should build");
    let (status, summary) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["inserted"], 2);
    assert_eq!(summary["skipped"], 0);

    let (status, envelope) = send(&app, get("/export?format=json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["version"], 1);
    assert_eq!(envelope["items"].as_array().expect("items").len(), 2);

    let response = app
        .clone()
        .oneshot(get("/export?format=csv"))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("content type")
        .to_str()
        .expect("ascii");
    assert!(content_type.starts_with("text/csv"));
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(text.starts_with("site,username,password"));
}
