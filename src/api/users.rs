use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::{AdminUser, CurrentUser};
use super::validation::{parse_id, validate_email, validate_password, validate_username};
use super::{ApiError, ApiResponse, AppState, CreateUserRequest, UserDto};
use crate::db::NewUser;
use crate::pagination::{Page, PageQuery, PageRequest};

/// `GET /users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<UserDto>>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let page = PageRequest::from_query(query, &state.config().pagination)?;
    let users = state.user_service().list_users(page).await?;
    Ok(Json(ApiResponse::success(users.map(UserDto::from))))
}

/// `POST /users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let username = validate_username(&payload.username)?.to_string();
    let email = validate_email(&payload.email)?.to_string();
    validate_password(&payload.password)?;

    let full_name = payload
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let user = state
        .user_service()
        .create_user(NewUser {
            username,
            email,
            full_name,
            password: payload.password,
            is_admin: payload.is_admin,
        })
        .await?;

    tracing::info!(
        created_by = admin.id,
        user_id = user.id,
        is_admin = user.is_admin,
        "User created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// `GET /users/me`
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}

/// `DELETE /users/{id}`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "User")?;
    state.user_service().delete_user(id).await?;

    tracing::info!(deleted_by = admin.id, user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
