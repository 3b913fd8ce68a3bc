use serde::{Deserialize, Serialize};

use crate::entities::{images, listings};

/// A listing together with the stored filenames of its images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub size_m2: i32,
    pub rooms: i32,
    pub distance_to_beach: String,
    pub rental_type: String,
    pub furnished: bool,
    pub price: String,
    pub available: bool,
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Listing {
    #[must_use]
    pub fn from_models(model: listings::Model, images: Vec<images::Model>) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            size_m2: model.size_m2,
            rooms: model.rooms,
            distance_to_beach: model.distance_to_beach,
            rental_type: model.rental_type,
            furnished: model.furnished,
            price: model.price,
            available: model.available,
            images: images.into_iter().map(|i| i.filename).collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub size_m2: i32,
    pub rooms: i32,
    pub distance_to_beach: String,
    pub rental_type: String,
    pub furnished: bool,
    pub price: String,
    pub available: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub size_m2: Option<i32>,
    pub rooms: Option<i32>,
    pub distance_to_beach: Option<String>,
    pub rental_type: Option<String>,
    pub furnished: Option<bool>,
    pub price: Option<String>,
    pub available: Option<bool>,
}

impl ListingChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.size_m2.is_none()
            && self.rooms.is_none()
            && self.distance_to_beach.is_none()
            && self.rental_type.is_none()
            && self.furnished.is_none()
            && self.price.is_none()
            && self.available.is_none()
    }
}

/// Search filters for listing queries. `min_rooms` is inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListingFilter {
    pub distance_to_beach: Option<String>,
    pub min_rooms: Option<i32>,
    pub rental_type: Option<String>,
}
