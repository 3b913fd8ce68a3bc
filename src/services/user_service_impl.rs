//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, User};
use crate::pagination::{Page, PageRequest};
use crate::services::user_service::{UserError, UserService};

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

fn duplicate_field(message: &str) -> &'static str {
    if message.contains("email") {
        "Email"
    } else {
        "Username"
    }
}

/// Maps a unique-constraint failure raised by the insert itself (a concurrent
/// create won the race after the pre-check).
fn classify_insert_error(err: anyhow::Error) -> UserError {
    if let Some(db_err) = err.downcast_ref::<DbErr>()
        && let Some(SqlErr::UniqueConstraintViolation(message)) = db_err.sql_err()
    {
        return UserError::Duplicate(duplicate_field(&message).to_string());
    }
    err.into()
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn create_user(&self, user: NewUser) -> Result<User, UserError> {
        let conflicts = self
            .store
            .find_user_conflicts(&user.username, &user.email)
            .await?;

        if let Some(field) = conflicts.first() {
            return Err(UserError::Duplicate(duplicate_field(field).to_string()));
        }

        let created = self
            .store
            .create_user(user, &self.security)
            .await
            .map_err(classify_insert_error)?;

        info!(user_id = created.id, is_admin = created.is_admin, "User created");
        Ok(created)
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, UserError> {
        let (items, total) = self.store.list_users(page).await?;
        Ok(Page::new(items, total, page))
    }

    async fn delete_user(&self, id: i32) -> Result<(), UserError> {
        if !self.store.delete_user(id).await? {
            return Err(UserError::NotFound(id));
        }
        info!(user_id = id, "User deleted");
        Ok(())
    }
}
