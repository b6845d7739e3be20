// HTTP middleware
pub mod auth;
pub mod ip_extractor;

pub use auth::*;
pub use ip_extractor::*;
