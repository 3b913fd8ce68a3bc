//! Domain service for user administration.

use thiserror::Error;

use crate::db::{NewUser, User};
use crate::pagination::{Page, PageRequest};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0} already registered")]
    Duplicate(String),

    #[error("User {0} not found")]
    NotFound(i32),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Domain service trait for user administration.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates a user after checking that username and email are free.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Duplicate`] naming the first taken field.
    async fn create_user(&self, user: NewUser) -> Result<User, UserError>;

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, UserError>;

    /// Hard-deletes a user.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::NotFound`] if no user has this id.
    async fn delete_user(&self, id: i32) -> Result<(), UserError>;
}
