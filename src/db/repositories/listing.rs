use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, LoaderTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};

use crate::entities::{images, listings, prelude::*};
use crate::models::listing::{Listing, ListingChanges, ListingFilter, NewListing};
use crate::pagination::PageRequest;

pub struct ListingRepository {
    conn: DatabaseConnection,
}

impl ListingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn condition(filter: &ListingFilter, available: bool) -> Condition {
        let mut cond = Condition::all().add(listings::Column::Available.eq(available));

        if let Some(distance) = &filter.distance_to_beach {
            cond = cond.add(listings::Column::DistanceToBeach.eq(distance.as_str()));
        }
        if let Some(rooms) = filter.min_rooms {
            cond = cond.add(listings::Column::Rooms.gte(rooms));
        }
        if let Some(rental_type) = &filter.rental_type {
            cond = cond.add(listings::Column::RentalType.eq(rental_type.as_str()));
        }

        cond
    }

    /// One page of listings with the given availability, ordered by id.
    pub async fn list(
        &self,
        filter: &ListingFilter,
        available: bool,
        page: PageRequest,
    ) -> Result<(Vec<Listing>, u64)> {
        let cond = Self::condition(filter, available);

        let total = Listings::find()
            .filter(cond.clone())
            .count(&self.conn)
            .await
            .context("Failed to count listings")?;

        let rows = Listings::find()
            .filter(cond)
            .order_by_asc(listings::Column::Id)
            .offset(page.offset())
            .limit(page.page_size())
            .all(&self.conn)
            .await
            .context("Failed to query listings")?;

        let images = rows
            .load_many(Images, &self.conn)
            .await
            .context("Failed to load listing images")?;

        let items = rows
            .into_iter()
            .zip(images)
            .map(|(listing, imgs)| Listing::from_models(listing, imgs))
            .collect();

        Ok((items, total))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Listing>> {
        let Some(listing) = Listings::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let imgs = listing
            .find_related(Images)
            .order_by_asc(images::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load listing images")?;

        Ok(Some(Listing::from_models(listing, imgs)))
    }

    /// Inserts the listing and one image row per filename atomically.
    pub async fn create(&self, new: NewListing, filenames: &[String]) -> Result<Listing> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let listing = listings::ActiveModel {
            title: Set(new.title),
            description: Set(new.description),
            size_m2: Set(new.size_m2),
            rooms: Set(new.rooms),
            distance_to_beach: Set(new.distance_to_beach),
            rental_type: Set(new.rental_type),
            furnished: Set(new.furnished),
            price: Set(new.price),
            available: Set(new.available),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert listing")?;

        let imgs = insert_images(&txn, listing.id, filenames).await?;

        txn.commit().await?;
        Ok(Listing::from_models(listing, imgs))
    }

    /// Applies `changes` and appends `filenames`. `None` if the listing is gone.
    pub async fn update(
        &self,
        id: i32,
        changes: ListingChanges,
        filenames: &[String],
    ) -> Result<Option<Listing>> {
        let txn = self.conn.begin().await?;

        let Some(existing) = Listings::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active: listings::ActiveModel = existing.into();
        if let Some(v) = changes.title {
            active.title = Set(v);
        }
        if let Some(v) = changes.description {
            active.description = Set(v);
        }
        if let Some(v) = changes.size_m2 {
            active.size_m2 = Set(v);
        }
        if let Some(v) = changes.rooms {
            active.rooms = Set(v);
        }
        if let Some(v) = changes.distance_to_beach {
            active.distance_to_beach = Set(v);
        }
        if let Some(v) = changes.rental_type {
            active.rental_type = Set(v);
        }
        if let Some(v) = changes.furnished {
            active.furnished = Set(v);
        }
        if let Some(v) = changes.price {
            active.price = Set(v);
        }
        if let Some(v) = changes.available {
            active.available = Set(v);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let listing = active
            .update(&txn)
            .await
            .context("Failed to update listing")?;

        insert_images(&txn, id, filenames).await?;

        let imgs = Images::find()
            .filter(images::Column::ListingId.eq(id))
            .order_by_asc(images::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(Some(Listing::from_models(listing, imgs)))
    }

    /// Flips `available` in a single `UPDATE` so concurrent toggles compose.
    pub async fn toggle_availability(&self, id: i32) -> Result<Option<Listing>> {
        let txn = self.conn.begin().await?;

        let result = Listings::update_many()
            .col_expr(
                listings::Column::Available,
                Expr::col(listings::Column::Available).not(),
            )
            .col_expr(
                listings::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(listings::Column::Id.eq(id))
            .exec(&txn)
            .await
            .context("Failed to toggle listing availability")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let Some(listing) = Listings::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        let imgs = Images::find()
            .filter(images::Column::ListingId.eq(id))
            .order_by_asc(images::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(Some(Listing::from_models(listing, imgs)))
    }

    pub async fn add_images(&self, id: i32, filenames: &[String]) -> Result<Option<Listing>> {
        let txn = self.conn.begin().await?;

        let Some(listing) = Listings::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        insert_images(&txn, id, filenames).await?;

        let mut active: listings::ActiveModel = listing.into();
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let listing = active.update(&txn).await?;

        let imgs = Images::find()
            .filter(images::Column::ListingId.eq(id))
            .order_by_asc(images::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(Some(Listing::from_models(listing, imgs)))
    }

    /// Deletes the listing and its image rows. Returns the filenames that were
    /// attached so the caller can remove them from disk, or `None` if missing.
    pub async fn delete(&self, id: i32) -> Result<Option<Vec<String>>> {
        let txn = self.conn.begin().await?;

        let Some(listing) = Listings::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let filenames: Vec<String> = listing
            .find_related(Images)
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| i.filename)
            .collect();

        Images::delete_many()
            .filter(images::Column::ListingId.eq(id))
            .exec(&txn)
            .await?;

        Listings::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete listing")?;

        txn.commit().await?;
        Ok(Some(filenames))
    }
}

async fn insert_images<C>(
    conn: &C,
    listing_id: i32,
    filenames: &[String],
) -> Result<Vec<images::Model>>
where
    C: sea_orm::ConnectionTrait,
{
    let mut inserted = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let model = images::ActiveModel {
            filename: Set(filename.clone()),
            listing_id: Set(listing_id),
            ..Default::default()
        }
        .insert(conn)
        .await
        .with_context(|| format!("Failed to insert image {filename}"))?;
        inserted.push(model);
    }
    Ok(inserted)
}
