use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::cache::QueryCache;
use crate::config::Config;
use crate::db::Store;
use crate::ratelimit::{RateLimiter, rate_limit_middleware};

pub mod auth;
mod error;
mod health;
mod images;
mod listings;
mod observability;
mod types;
mod users;
pub mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{
    AuthService, ImageStorage, ListingService, SeaOrmAuthService, SeaOrmListingService,
    SeaOrmUserService, UserService,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub cache: Arc<QueryCache>,

    pub rate_limiter: Arc<RateLimiter>,

    pub tokens: Arc<TokenService>,

    pub images: Arc<ImageStorage>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub listing_service: Arc<dyn ListingService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    #[must_use]
    pub fn images(&self) -> &ImageStorage {
        &self.images
    }

    #[must_use]
    pub fn auth_service(&self) -> &dyn AuthService {
        self.auth_service.as_ref()
    }

    #[must_use]
    pub fn user_service(&self) -> &dyn UserService {
        self.user_service.as_ref()
    }

    #[must_use]
    pub fn listing_service(&self) -> &dyn ListingService {
        self.listing_service.as_ref()
    }
}

/// Wires the services around an already-open store.
pub async fn create_app_state(
    config: Config,
    store: Store,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let tokens = Arc::new(
        TokenService::new(&config.auth)
            .map_err(|e| anyhow::anyhow!("Failed to initialize token service: {e}"))?,
    );

    let cache = Arc::new(QueryCache::new(&config.cache));
    let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

    let images = Arc::new(ImageStorage::new(
        &config.general.images_path,
        config.uploads.max_file_size_bytes(),
        config.uploads.max_files_per_request,
    ));
    images
        .ensure_dir()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare images directory: {e}"))?;

    let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        tokens.clone(),
        config.security.clone(),
    ));
    let user_service: Arc<dyn UserService> = Arc::new(SeaOrmUserService::new(
        store.clone(),
        config.security.clone(),
    ));
    let listing_service: Arc<dyn ListingService> = Arc::new(SeaOrmListingService::new(
        store.clone(),
        cache.clone(),
        images.clone(),
    ));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        cache,
        rate_limiter,
        tokens,
        images,
        auth_service,
        user_service,
        listing_service,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    create_app_state(config, store, prometheus_handle).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();
    let body_limit = state.config().uploads.max_request_bytes();

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/token", post(auth::issue_token))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_me))
        .route("/users/{id}", delete(users::delete_user))
        .route(
            "/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route("/listings/unavailable", get(listings::list_unavailable))
        .route(
            "/listings/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/listings/{id}/availability",
            patch(listings::toggle_availability),
        )
        .route("/listings/{id}/images", post(listings::add_images))
        .route(
            &format!("{IMAGES_ROUTE}/{{*filename}}"),
            get(images::serve_image),
        )
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .route("/health/live", get(health::health_live))
        .route("/metrics", get(observability::get_metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
