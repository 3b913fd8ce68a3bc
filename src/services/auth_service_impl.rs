//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::auth::{AccessToken, TokenService};
use crate::config::{AuthConfig, SecurityConfig};
use crate::db::{NewUser, Store, User};
use crate::services::auth_service::{AuthError, AuthService, BootstrapOutcome};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenService>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: Arc<TokenService>, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        let user = self
            .store
            .verify_user_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.tokens.issue(&user.username)?;
        info!(user_id = user.id, "Access token issued");
        Ok(token)
    }

    async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token)?;

        self.store
            .get_user_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    async fn bootstrap_admin(&self, config: &AuthConfig) -> Result<BootstrapOutcome, AuthError> {
        if self
            .store
            .get_user_by_username(&config.admin_username)
            .await?
            .is_some()
        {
            return Ok(BootstrapOutcome::AlreadyExists);
        }

        let admin = self
            .store
            .create_user(
                NewUser {
                    username: config.admin_username.clone(),
                    email: config.admin_email.clone(),
                    full_name: Some("Administrator".to_string()),
                    password: config.admin_password.clone(),
                    is_admin: true,
                },
                &self.security,
            )
            .await?;

        info!(user_id = admin.id, username = %admin.username, "Bootstrap admin created");
        Ok(BootstrapOutcome::Created)
    }
}
