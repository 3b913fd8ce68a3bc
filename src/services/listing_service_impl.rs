//! `SeaORM` implementation of the `ListingService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::{CacheKey, QueryCache};
use crate::db::Store;
use crate::models::listing::{Listing, ListingChanges, ListingFilter, NewListing};
use crate::pagination::{Page, PageRequest};
use crate::services::image::{ImageStorage, UploadedFile};
use crate::services::listing_service::{LISTINGS_CACHE_PREFIX, ListingError, ListingService};

pub struct SeaOrmListingService {
    store: Store,
    cache: Arc<QueryCache>,
    images: Arc<ImageStorage>,
}

impl SeaOrmListingService {
    #[must_use]
    pub const fn new(store: Store, cache: Arc<QueryCache>, images: Arc<ImageStorage>) -> Self {
        Self {
            store,
            cache,
            images,
        }
    }

    async fn list(
        &self,
        function: &str,
        filter: ListingFilter,
        available: bool,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingError> {
        let key = CacheKey::new(LISTINGS_CACHE_PREFIX, function)
            .arg(&filter)
            .arg(page.page())
            .arg(page.page_size());

        self.cache
            .get_or_try_load(&key, || async {
                let (items, total) = self.store.list_listings(&filter, available, page).await?;
                Ok(Page::new(items, total, page))
            })
            .await
    }

    async fn ensure_exists(&self, id: i32) -> Result<(), ListingError> {
        if self.store.get_listing(id).await?.is_none() {
            return Err(ListingError::NotFound(id));
        }
        Ok(())
    }

    /// Runs a write that depends on freshly saved files. On error or a
    /// missing listing the files are removed again; on success the listing
    /// cache is invalidated.
    async fn commit_with_files<F, Fut>(
        &self,
        id: Option<i32>,
        saved: Vec<String>,
        write: F,
    ) -> Result<Listing, ListingError>
    where
        F: FnOnce(Vec<String>) -> Fut + Send,
        Fut: std::future::Future<Output = anyhow::Result<Option<Listing>>> + Send,
    {
        match write(saved.clone()).await {
            Ok(Some(listing)) => {
                self.cache.invalidate_prefix(LISTINGS_CACHE_PREFIX);
                Ok(listing)
            }
            Ok(None) => {
                self.images.remove_all(&saved).await;
                Err(ListingError::NotFound(id.unwrap_or_default()))
            }
            Err(e) => {
                if !saved.is_empty() {
                    warn!(files = saved.len(), "Listing write failed, removing uploaded files");
                }
                self.images.remove_all(&saved).await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ListingService for SeaOrmListingService {
    async fn list_available(
        &self,
        filter: ListingFilter,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingError> {
        self.list("list_available", filter, true, page).await
    }

    async fn list_unavailable(
        &self,
        filter: ListingFilter,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingError> {
        self.list("list_unavailable", filter, false, page).await
    }

    async fn get_listing(&self, id: i32) -> Result<Listing, ListingError> {
        let key = CacheKey::new(LISTINGS_CACHE_PREFIX, "get_listing").arg(id);

        self.cache
            .get_or_try_load(&key, || async {
                self.store
                    .get_listing(id)
                    .await?
                    .ok_or(ListingError::NotFound(id))
            })
            .await
    }

    async fn create_listing(
        &self,
        listing: NewListing,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError> {
        let saved = self.images.save_all(&files).await?;

        let created = self
            .commit_with_files(None, saved, |names| async move {
                self.store.create_listing(listing, &names).await.map(Some)
            })
            .await?;

        info!(
            listing_id = created.id,
            images = created.images.len(),
            "Listing created"
        );
        Ok(created)
    }

    async fn update_listing(
        &self,
        id: i32,
        changes: ListingChanges,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError> {
        self.ensure_exists(id).await?;
        let saved = self.images.save_all(&files).await?;

        let updated = self
            .commit_with_files(Some(id), saved, |names| async move {
                self.store.update_listing(id, changes, &names).await
            })
            .await?;

        info!(listing_id = id, "Listing updated");
        Ok(updated)
    }

    async fn toggle_availability(&self, id: i32) -> Result<Listing, ListingError> {
        let listing = self
            .store
            .toggle_listing_availability(id)
            .await?
            .ok_or(ListingError::NotFound(id))?;

        self.cache.invalidate_prefix(LISTINGS_CACHE_PREFIX);
        info!(listing_id = id, available = listing.available, "Listing availability toggled");
        Ok(listing)
    }

    async fn add_images(
        &self,
        id: i32,
        files: Vec<UploadedFile>,
    ) -> Result<Listing, ListingError> {
        self.ensure_exists(id).await?;
        let saved = self.images.save_all(&files).await?;

        let listing = self
            .commit_with_files(Some(id), saved, |names| async move {
                self.store.add_listing_images(id, &names).await
            })
            .await?;

        info!(listing_id = id, images = listing.images.len(), "Images attached");
        Ok(listing)
    }

    async fn delete_listing(&self, id: i32) -> Result<(), ListingError> {
        let filenames = self
            .store
            .delete_listing(id)
            .await?
            .ok_or(ListingError::NotFound(id))?;

        self.cache.invalidate_prefix(LISTINGS_CACHE_PREFIX);
        self.images.remove_all(&filenames).await;

        info!(listing_id = id, images = filenames.len(), "Listing deleted");
        Ok(())
    }
}
