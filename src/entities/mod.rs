pub mod prelude;

pub mod images;
pub mod listings;
pub mod users;
