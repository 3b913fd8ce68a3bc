use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::models::listing::Listing;

/// Public URL prefix under which stored images are served.
pub const IMAGES_ROUTE: &str = "/images";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// OAuth2 password-flow response. Returned bare, outside the envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            disabled: user.disabled,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingDto {
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
    /// Image URLs, e.g. `/images/3f2a….jpg`.
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Listing> for ListingDto {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            size_m2: listing.size_m2,
            rooms: listing.rooms,
            distance_to_beach: listing.distance_to_beach,
            rental_type: listing.rental_type,
            furnished: listing.furnished,
            price: listing.price,
            available: listing.available,
            images: listing
                .images
                .into_iter()
                .map(|name| format!("{IMAGES_ROUTE}/{name}"))
                .collect(),
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        }
    }
}
