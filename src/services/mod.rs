pub mod auth_service;
pub use auth_service::{AuthError, AuthService, BootstrapOutcome};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod image;
pub use image::{ImageStorage, UploadError, UploadedFile};

pub mod listing_service;
pub use listing_service::{LISTINGS_CACHE_PREFIX, ListingError, ListingService};

pub mod listing_service_impl;
pub use listing_service_impl::SeaOrmListingService;

pub mod user_service;
pub use user_service::{UserError, UserService};

pub mod user_service_impl;
pub use user_service_impl::SeaOrmUserService;
