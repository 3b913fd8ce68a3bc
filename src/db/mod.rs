use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::listing::{Listing, ListingChanges, ListingFilter, NewListing};
use crate::pagination::PageRequest;

pub mod migrator;
pub mod repositories;

pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = is_memory_url(db_url);

        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite:")
                .trim_start_matches("//")
                .split('?')
                .next()
                .unwrap_or_default();
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !path_str.is_empty() && !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to an in-memory database is its own database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn find_user_conflicts(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<&'static str>> {
        self.user_repo().find_conflicts(username, email).await
    }

    pub async fn create_user(&self, user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(user, config).await
    }

    pub async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(page).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn set_user_disabled(&self, id: i32, disabled: bool) -> Result<bool> {
        self.user_repo().set_disabled(id, disabled).await
    }

    // ========== Listing Repository Methods ==========

    #[must_use]
    pub fn listing_repo(&self) -> repositories::listing::ListingRepository {
        repositories::listing::ListingRepository::new(self.conn.clone())
    }

    pub async fn list_listings(
        &self,
        filter: &ListingFilter,
        available: bool,
        page: PageRequest,
    ) -> Result<(Vec<Listing>, u64)> {
        self.listing_repo().list(filter, available, page).await
    }

    pub async fn get_listing(&self, id: i32) -> Result<Option<Listing>> {
        self.listing_repo().get(id).await
    }

    pub async fn create_listing(&self, listing: NewListing, images: &[String]) -> Result<Listing> {
        self.listing_repo().create(listing, images).await
    }

    pub async fn update_listing(
        &self,
        id: i32,
        changes: ListingChanges,
        images: &[String],
    ) -> Result<Option<Listing>> {
        self.listing_repo().update(id, changes, images).await
    }

    pub async fn toggle_listing_availability(&self, id: i32) -> Result<Option<Listing>> {
        self.listing_repo().toggle_availability(id).await
    }

    pub async fn add_listing_images(&self, id: i32, images: &[String]) -> Result<Option<Listing>> {
        self.listing_repo().add_images(id, images).await
    }

    pub async fn delete_listing(&self, id: i32) -> Result<Option<Vec<String>>> {
        self.listing_repo().delete(id).await
    }
}
