use axum::{
    Form, Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, header, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, TokenResponse};
use crate::db::User;
use crate::services::auth_service::{AuthError, ensure_active, ensure_admin};

// ============================================================================
// Request Types
// ============================================================================

/// OAuth2 password-flow form. Extra fields such as `grant_type` are ignored.
#[derive(Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Extractors
// ============================================================================

/// Any authenticated account that is not disabled.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated, active administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = bearer_token(&parts.headers).ok_or(AuthError::InvalidToken)?;
    let user = state.auth_service().authenticate(token).await?;

    tracing::Span::current().record("user_id", user.id);
    Ok(user)
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        ensure_active(&user)?;
        Ok(Self(user))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        ensure_admin(&user)?;
        Ok(Self(user))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /token
/// Exchange username and password for a bearer token
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state
        .auth_service()
        .login(form.username.trim(), &form.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: token.token,
        token_type: "bearer".to_string(),
        expires_in: token.expires_in,
    }))
}
