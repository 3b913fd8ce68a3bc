//! Bearer token issuing and verification.

pub mod jwt;

pub use jwt::{AccessToken, Claims, TokenError, TokenService};
