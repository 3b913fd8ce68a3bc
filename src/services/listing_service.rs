//! Domain service for rental listings and their images.
//!
//! Reads go through the query cache; every successful write drops all cached
//! listing queries by prefix. Image files are written before the database
//! transaction and removed again on a best-effort basis if it fails.

use thiserror::Error;

use crate::models::listing::{Listing, ListingChanges, ListingFilter, NewListing};
use crate::pagination::{Page, PageRequest};
use crate::services::image::{UploadError, UploadedFile};

/// Cache key prefix shared by every cached listing query.
pub const LISTINGS_CACHE_PREFIX: &str = "listings";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Listing {0} not found")]
    NotFound(i32),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ListingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait ListingService: Send + Sync {
    /// Available listings matching `filter`.
    async fn list_available(
        &self,
        filter: ListingFilter,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingError>;

    /// Unavailable listings matching `filter`.
    async fn list_unavailable(
        &self,
        filter: ListingFilter,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingError>;

    async fn get_listing(&self, id: i32) -> Result<Listing, ListingError>;

    /// Stores the uploaded images and creates the listing with one image row
    /// per file.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::Upload`] before anything is written if any file
    /// fails validation.
    async fn create_listing(
        &self,
        listing: NewListing,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError>;

    /// Applies a partial update and attaches any new images.
    async fn update_listing(
        &self,
        id: i32,
        changes: ListingChanges,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError>;

    /// Flips the `available` flag.
    async fn toggle_availability(&self, id: i32) -> Result<Listing, ListingError>;

    async fn add_images(
        &self,
        id: i32,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError>;

    /// Deletes the listing, its image rows and (best-effort) its files.
    async fn delete_listing(&self, id: i32) -> Result<(), ListingError>;
}
