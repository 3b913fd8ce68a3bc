use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Placeholder secret shipped in the defaults. Refused outside development.
pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

const MASK: &str = "********";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub uploads: UploadConfig,

    pub pagination: PaginationConfig,

    pub rate_limit: RateLimitConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Free-form deployment name ("development", "testing", "production").
    pub environment: String,

    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    pub images_path: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_path: "sqlite:data/shoreline.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            images_path: "images".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: String,

    /// HMAC algorithm used to sign access tokens: HS256, HS384 or HS512.
    pub algorithm: String,

    pub access_token_expire_minutes: i64,

    pub admin_username: String,

    pub admin_email: String,

    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            admin_username: "admin".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "change-me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size_mb: u64,

    pub max_files_per_request: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            max_files_per_request: 10,
        }
    }
}

impl UploadConfig {
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize) * 1024 * 1024
    }

    /// Upper bound for a whole multipart body: every file at full size plus
    /// one megabyte for form fields and part headers.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_file_size_bytes() * self.max_files_per_request + 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: u64,

    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Requests allowed per client inside one window.
    pub requests_per_window: u32,

    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 60,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    pub ttl_seconds: u64,

    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            uploads: UploadConfig::default(),
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads defaults, then the first config file found, then `.env` and
    /// process environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shoreline").join("config.toml"));
        }

        paths
    }

    /// Applies the flat environment variables understood by the service.
    ///
    /// `lookup` is injected so tests never touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid value for {key} ({raw:?}): {e}"))
        }

        fn flag(key: &str, raw: &str) -> Result<bool> {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => anyhow::bail!("Invalid boolean for {key}: {other:?}"),
            }
        }

        if let Some(v) = lookup("ENVIRONMENT") {
            self.general.environment = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.general.database_path = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(v) = lookup("IMAGES_DIR") {
            self.general.images_path = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parsed("PORT", &v)?;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(v) = lookup("SECRET_KEY") {
            self.auth.secret_key = v;
        }
        if let Some(v) = lookup("ALGORITHM") {
            self.auth.algorithm = v;
        }
        if let Some(v) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes = parsed("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
        }
        if let Some(v) = lookup("ADMIN_USERNAME") {
            self.auth.admin_username = v;
        }
        if let Some(v) = lookup("ADMIN_EMAIL") {
            self.auth.admin_email = v;
        }
        if let Some(v) = lookup("ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }
        if let Some(v) = lookup("MAX_FILE_SIZE_MB") {
            self.uploads.max_file_size_mb = parsed("MAX_FILE_SIZE_MB", &v)?;
        }
        if let Some(v) = lookup("DEFAULT_PAGE_SIZE") {
            self.pagination.default_page_size = parsed("DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("MAX_PAGE_SIZE") {
            self.pagination.max_page_size = parsed("MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = flag("RATE_LIMIT_ENABLED", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_PER_MINUTE") {
            self.rate_limit.requests_per_window = parsed("RATE_LIMIT_PER_MINUTE", &v)?;
            self.rate_limit.window_seconds = 60;
        }
        if let Some(v) = lookup("CACHE_ENABLED") {
            self.cache.enabled = flag("CACHE_ENABLED", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = parsed("CACHE_TTL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parsed("CACHE_MAX_ENTRIES", &v)?;
        }

        Ok(())
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(
            self.general.environment.as_str(),
            "development" | "dev" | "testing" | "test"
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.secret_key.trim().is_empty() {
            anyhow::bail!("SECRET_KEY cannot be empty");
        }

        if self.auth.secret_key == DEFAULT_SECRET_KEY && !self.is_development() {
            anyhow::bail!(
                "SECRET_KEY must be set when ENVIRONMENT is {:?}",
                self.general.environment
            );
        }

        if !matches!(self.auth.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            anyhow::bail!("Unsupported token algorithm: {}", self.auth.algorithm);
        }

        if self.auth.access_token_expire_minutes <= 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be > 0");
        }

        if self.pagination.default_page_size == 0 || self.pagination.max_page_size == 0 {
            anyhow::bail!("Page sizes must be > 0");
        }

        if self.pagination.default_page_size > self.pagination.max_page_size {
            anyhow::bail!(
                "DEFAULT_PAGE_SIZE ({}) cannot exceed MAX_PAGE_SIZE ({})",
                self.pagination.default_page_size,
                self.pagination.max_page_size
            );
        }

        if self.uploads.max_file_size_mb == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be > 0");
        }

        if self.rate_limit.enabled
            && (self.rate_limit.window_seconds == 0 || self.rate_limit.requests_per_window == 0)
        {
            anyhow::bail!("Rate limit window and request count must be > 0 when enabled");
        }

        Ok(())
    }

    /// Copy of the config safe to print: secrets replaced with a mask.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        masked.auth.secret_key = MASK.to_string();
        masked.auth.admin_password = MASK.to_string();
        masked
    }
}
