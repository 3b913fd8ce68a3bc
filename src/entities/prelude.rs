pub use super::images::Entity as Images;
pub use super::listings::Entity as Listings;
pub use super::users::Entity as Users;
