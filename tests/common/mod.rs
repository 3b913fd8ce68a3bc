#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use shoreline::api::AppState;
use shoreline::config::Config;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Router plus the state behind it. The images directory is removed on drop.
pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub images_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.images_dir);
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.environment = "testing".to_string();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.images_path = std::env::temp_dir()
        .join(format!("shoreline-it-{}", uuid::Uuid::new_v4()))
        .display()
        .to_string();
    config.auth.secret_key = "integration-test-secret".to_string();
    config.auth.admin_username = ADMIN_USERNAME.to_string();
    config.auth.admin_email = "admin@test.com".to_string();
    config.auth.admin_password = ADMIN_PASSWORD.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.rate_limit.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let auth_config = config.auth.clone();
    let images_dir = PathBuf::from(&config.general.images_path);

    let state = shoreline::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    state
        .auth_service()
        .bootstrap_admin(&auth_config)
        .await
        .expect("Failed to bootstrap admin");

    TestApp {
        app: shoreline::api::router(state.clone()),
        state,
        images_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn send_multipart(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        form: MultipartForm,
    ) -> Response<Body> {
        let (content_type, body) = form.finish();
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn token_response(&self, username: &str, password: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("username={username}&password={password}")))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self.token_response(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Creates a regular user through the admin API and returns its token.
    pub async fn user_token(&self, username: &str) -> String {
        let admin = self.admin_token().await;
        let response = self
            .post_json(
                "/users",
                Some(&admin),
                &serde_json::json!({
                    "username": username,
                    "email": format!("{username}@test.com"),
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        self.login(username, "password123").await
    }

    /// Number of files currently in the images directory.
    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(&self.images_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn bytes_body(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("shoreline-{}", uuid::Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn jpeg(self, filename: &str) -> Self {
        self.file("images", filename, "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// All required listing fields with sensible values.
pub fn listing_form(title: &str, rooms: i32, rental_type: &str) -> MultipartForm {
    MultipartForm::new()
        .text("title", title)
        .text("description", "Bright flat near the sea")
        .text("size_m2", "75")
        .text("rooms", &rooms.to_string())
        .text("distance_to_beach", "200m")
        .text("rental_type", rental_type)
        .text("furnished", "true")
        .text("price", "1500")
}
