//! Listing endpoints.
//!
//! Writes arrive as `multipart/form-data`: scalar fields as text parts and
//! images as file parts named `images` (or `files`). File parts are read chunk
//! by chunk so an oversized upload is refused without buffering all of it.

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::{AdminUser, CurrentUser};
use super::validation::{
    parse_bool, parse_id, parse_int, validate_non_negative, validate_price, validate_text_field,
    validate_title,
};
use super::{ApiError, ApiResponse, AppState, ListingDto};
use crate::config::PaginationConfig;
use crate::models::listing::{ListingChanges, ListingFilter, NewListing};
use crate::pagination::{Page, PageQuery, PageRequest};
use crate::services::{UploadError, UploadedFile};

/// Multipart part names treated as image uploads.
const FILE_FIELDS: &[&str] = &["images", "files"];

const TEXT_FIELDS: &[&str] = &[
    "title",
    "description",
    "size_m2",
    "rooms",
    "distance_to_beach",
    "rental_type",
    "furnished",
    "price",
    "available",
];

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub distance_to_beach: Option<String>,
    /// Minimum number of rooms.
    pub rooms: Option<i32>,
    pub rental_type: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListingQuery {
    fn into_parts(
        self,
        config: &PaginationConfig,
    ) -> Result<(ListingFilter, PageRequest), ApiError> {
        let page = PageRequest::from_query(
            PageQuery {
                page: self.page,
                page_size: self.page_size,
            },
            config,
        )?;

        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let filter = ListingFilter {
            distance_to_beach: non_empty(self.distance_to_beach),
            min_rooms: self.rooms,
            rental_type: non_empty(self.rental_type),
        };

        Ok((filter, page))
    }
}

fn listing_query(
    query: Result<Query<ListingQuery>, QueryRejection>,
    config: &PaginationConfig,
) -> Result<(ListingFilter, PageRequest), ApiError> {
    let Query(query) = query.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    query.into_parts(config)
}

// ============================================================================
// Multipart
// ============================================================================

#[derive(Debug, Default)]
struct ListingForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl ListingForm {
    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    fn required(&mut self, name: &str) -> Result<String, ApiError> {
        self.take(name)
            .ok_or_else(|| ApiError::unprocessable(format!("Missing required field: {name}")))
    }
}

fn multipart_error(err: &MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::validation("Request body is too large");
    }
    ApiError::validation(format!("Invalid multipart body: {}", err.body_text()))
}

async fn read_file(
    mut field: Field<'_>,
    name: &str,
    max_size: usize,
) -> Result<Option<UploadedFile>, ApiError> {
    let original_name = field.file_name().map(ToString::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e))? {
        if bytes.len() + chunk.len() > max_size {
            return Err(UploadError::TooLarge {
                name: original_name.unwrap_or_else(|| name.to_string()),
                max: max_size,
            }
            .into());
        }
        bytes.extend_from_slice(&chunk);
    }

    // Browsers send an empty, unnamed part when no file was picked.
    if bytes.is_empty() && original_name.as_deref().is_none_or(str::is_empty) {
        return Ok(None);
    }

    Ok(Some(UploadedFile {
        original_name,
        content_type,
        bytes,
    }))
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    max_file_size: usize,
    max_files: usize,
) -> Result<ListingForm, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let mut form = ListingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            tracing::debug!("Ignoring unnamed multipart field");
            continue;
        };

        if FILE_FIELDS.contains(&name.as_str()) {
            if form.files.len() >= max_files {
                return Err(UploadError::TooManyFiles(max_files).into());
            }
            if let Some(file) = read_file(field, &name, max_file_size).await? {
                form.files.push(file);
            }
        } else if TEXT_FIELDS.contains(&name.as_str()) {
            let value = field.text().await.map_err(|e| multipart_error(&e))?;
            form.fields.insert(name, value);
        } else {
            return Err(ApiError::unprocessable(format!("Unknown field: {name}")));
        }
    }

    Ok(form)
}

fn new_listing(form: &mut ListingForm) -> Result<NewListing, ApiError> {
    let title = validate_title(&form.required("title")?)?;
    let description = validate_text_field("description", &form.required("description")?)?;
    let size_m2 = validate_non_negative("size_m2", parse_int("size_m2", &form.required("size_m2")?)?)?;
    let rooms = validate_non_negative("rooms", parse_int("rooms", &form.required("rooms")?)?)?;
    let distance_to_beach =
        validate_text_field("distance_to_beach", &form.required("distance_to_beach")?)?;
    let rental_type = validate_text_field("rental_type", &form.required("rental_type")?)?;
    let furnished = parse_bool("furnished", &form.required("furnished")?)?;
    let price = validate_price(&form.required("price")?)?;
    let available = form
        .take("available")
        .map(|v| parse_bool("available", &v))
        .transpose()?
        .unwrap_or(true);

    Ok(NewListing {
        title,
        description,
        size_m2,
        rooms,
        distance_to_beach,
        rental_type,
        furnished,
        price,
        available,
    })
}

fn listing_changes(form: &mut ListingForm) -> Result<ListingChanges, ApiError> {
    let int = |form: &mut ListingForm, name: &str| -> Result<Option<i32>, ApiError> {
        form.take(name)
            .map(|v| validate_non_negative(name, parse_int(name, &v)?))
            .transpose()
    };
    let text = |form: &mut ListingForm, name: &str| -> Result<Option<String>, ApiError> {
        form.take(name)
            .map(|v| validate_text_field(name, &v))
            .transpose()
    };
    let flag = |form: &mut ListingForm, name: &str| -> Result<Option<bool>, ApiError> {
        form.take(name).map(|v| parse_bool(name, &v)).transpose()
    };

    Ok(ListingChanges {
        title: form.take("title").map(|v| validate_title(&v)).transpose()?,
        description: text(form, "description")?,
        size_m2: int(form, "size_m2")?,
        rooms: int(form, "rooms")?,
        distance_to_beach: text(form, "distance_to_beach")?,
        rental_type: text(form, "rental_type")?,
        furnished: flag(form, "furnished")?,
        price: form.take("price").map(|v| validate_price(&v)).transpose()?,
        available: flag(form, "available")?,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /listings`
pub async fn list_listings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<ListingDto>>>, ApiError> {
    let (filter, page) = listing_query(query, &state.config().pagination)?;
    let listings = state.listing_service().list_available(filter, page).await?;
    Ok(Json(ApiResponse::success(listings.map(ListingDto::from))))
}

/// `GET /listings/unavailable`
pub async fn list_unavailable(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<ListingDto>>>, ApiError> {
    let (filter, page) = listing_query(query, &state.config().pagination)?;
    let listings = state
        .listing_service()
        .list_unavailable(filter, page)
        .await?;
    Ok(Json(ApiResponse::success(listings.map(ListingDto::from))))
}

/// `GET /listings/{id}`
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListingDto>>, ApiError> {
    let id = parse_id(&id, "Listing")?;
    let listing = state.listing_service().get_listing(id).await?;
    Ok(Json(ApiResponse::success(listing.into())))
}

/// `POST /listings`
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ListingDto>>), ApiError> {
    let uploads = &state.config().uploads;
    let mut form = read_form(
        multipart,
        uploads.max_file_size_bytes(),
        uploads.max_files_per_request,
    )
    .await?;

    let listing = new_listing(&mut form)?;
    if form.files.is_empty() {
        return Err(ApiError::unprocessable("At least one image is required"));
    }

    let created = state
        .listing_service()
        .create_listing(listing, form.files)
        .await?;

    tracing::info!(user_id = user.id, listing_id = created.id, "Listing submitted");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// `PUT /listings/{id}`
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<ListingDto>>, ApiError> {
    let id = parse_id(&id, "Listing")?;
    let uploads = &state.config().uploads;
    let mut form = read_form(
        multipart,
        uploads.max_file_size_bytes(),
        uploads.max_files_per_request,
    )
    .await?;

    let changes = listing_changes(&mut form)?;
    let updated = state
        .listing_service()
        .update_listing(id, changes, form.files)
        .await?;

    Ok(Json(ApiResponse::success(updated.into())))
}

/// `DELETE /listings/{id}`
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "Listing")?;
    state.listing_service().delete_listing(id).await?;

    tracing::info!(deleted_by = admin.id, listing_id = id, "Listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /listings/{id}/availability`
pub async fn toggle_availability(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListingDto>>, ApiError> {
    let id = parse_id(&id, "Listing")?;
    let listing = state.listing_service().toggle_availability(id).await?;
    Ok(Json(ApiResponse::success(listing.into())))
}

/// `POST /listings/{id}/images`
pub async fn add_images(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<ListingDto>>, ApiError> {
    let id = parse_id(&id, "Listing")?;
    let uploads = &state.config().uploads;
    let form = read_form(
        multipart,
        uploads.max_file_size_bytes(),
        uploads.max_files_per_request,
    )
    .await?;

    if !form.fields.is_empty() {
        return Err(ApiError::unprocessable("Only image files are accepted here"));
    }
    if form.files.is_empty() {
        return Err(ApiError::unprocessable("At least one image is required"));
    }

    let listing = state.listing_service().add_images(id, form.files).await?;
    Ok(Json(ApiResponse::success(listing.into())))
}
