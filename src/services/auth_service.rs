//! Domain service for authentication.
//!
//! Exchanges credentials for bearer tokens, resolves tokens back to users and
//! creates the bootstrap administrator on startup.

use thiserror::Error;

use crate::auth::{AccessToken, TokenError};
use crate::config::AuthConfig;
use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid(_) => Self::InvalidToken,
            other => Self::Token(other.to_string()),
        }
    }
}

/// Outcome of the startup admin bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyExists,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or wrong password.
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, AuthError>;

    /// Resolves a bearer token to its user. Does not check `disabled`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is malformed, expired,
    /// signed with another key, or names a user that no longer exists.
    async fn authenticate(&self, token: &str) -> Result<User, AuthError>;

    /// Creates the configured admin account unless a user with that name exists.
    async fn bootstrap_admin(&self, config: &AuthConfig) -> Result<BootstrapOutcome, AuthError>;
}

/// Rejects disabled accounts.
pub const fn ensure_active(user: &User) -> Result<(), AuthError> {
    if user.disabled {
        return Err(AuthError::InactiveUser);
    }
    Ok(())
}

/// Rejects disabled and non-admin accounts.
pub const fn ensure_admin(user: &User) -> Result<(), AuthError> {
    if user.disabled {
        return Err(AuthError::InactiveUser);
    }
    if !user.is_admin {
        return Err(AuthError::Forbidden);
    }
    Ok(())
}
