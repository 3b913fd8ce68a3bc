mod common;

use axum::http::{StatusCode, header};
use common::{ADMIN_PASSWORD, ADMIN_USERNAME, json_body, spawn_app};

#[tokio::test]
async fn test_token_flow() {
    let app = spawn_app().await;

    let response = app.token_response(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 30 * 60);
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], ADMIN_USERNAME);
    assert_eq!(body["data"]["is_admin"], true);
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_invalid_credentials() {
    let app = spawn_app().await;

    let response = app.token_response(ADMIN_USERNAME, "wrong-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Incorrect username or password");

    let response = app.token_response("nobody", "whatever123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_bad_token() {
    let app = spawn_app().await;

    let response = app.get("/users/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let response = app.get("/users/me", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app().await;

    let expired = app
        .state
        .tokens
        .issue_with_ttl(ADMIN_USERNAME, chrono::Duration::seconds(-60))
        .unwrap();

    let response = app.get("/users/me", Some(&expired.token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let token = app.user_token("mallory").await;

    let me = json_body(app.get("/users/me", Some(&token)).await).await;
    let id = me["data"]["id"].as_i64().unwrap();

    let response = app
        .request("DELETE", &format!("/users/{id}"), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_admin() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post_json(
            "/users",
            Some(&admin),
            &serde_json::json!({
                "username": "alice",
                "email": "alice@test.com",
                "full_name": "Alice Example",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["is_admin"], false);
    assert_eq!(body["data"]["disabled"], false);
    let alice_id = body["data"]["id"].as_i64().unwrap();

    // Same username, different email.
    let response = app
        .post_json(
            "/users",
            Some(&admin),
            &serde_json::json!({
                "username": "alice",
                "email": "other@test.com",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Username already registered");

    // Same email, different username.
    let response = app
        .post_json(
            "/users",
            Some(&admin),
            &serde_json::json!({
                "username": "alice2",
                "email": "alice@test.com",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Email already registered");

    let response = app.get("/users?page=1&page_size=1", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let response = app
        .request("DELETE", &format!("/users/{alice_id}"), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request("DELETE", &format!("/users/{alice_id}"), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_validation() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for payload in [
        serde_json::json!({"username": "bob", "email": "not-an-email", "password": "password123"}),
        serde_json::json!({"username": "bob", "email": "bob@test.com", "password": "short"}),
        serde_json::json!({"username": "bad name", "email": "bob@test.com", "password": "password123"}),
    ] {
        let response = app.post_json("/users", Some(&admin), &payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
    }

    let response = app.request("DELETE", "/users/0", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.request("DELETE", "/users/abc", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/users?page=0", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/users?page_size=1000", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/users?page=abc", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let response = app
        .get("/users?page=9223372036854775807&page_size=50", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_regular_users() {
    let app = spawn_app().await;
    let token = app.user_token("carol").await;

    let response = app.get("/users", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(
            "/users",
            Some(&token),
            &serde_json::json!({
                "username": "dave",
                "email": "dave@test.com",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/metrics", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/metrics", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_user() {
    let app = spawn_app().await;
    let token = app.user_token("erin").await;

    let me = json_body(app.get("/users/me", Some(&token)).await).await;
    let id = i32::try_from(me["data"]["id"].as_i64().unwrap()).unwrap();
    assert!(app.state.store().set_user_disabled(id, true).await.unwrap());

    let response = app.get("/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Inactive user");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = spawn_app().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"]["status"], "healthy");
    assert_eq!(body["data"]["cache"]["enabled"], true);
    assert_eq!(body["data"]["rate_limiting"]["enabled"], false);
    assert_eq!(body["data"]["environment"], "testing");

    let response = app.get("/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["ready"], true);

    let response = app.get("/health/live", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "alive");
}

#[tokio::test]
async fn test_security_headers() {
    let app = spawn_app().await;

    let response = app.get("/health/live", None).await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app.get("/metrics", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
