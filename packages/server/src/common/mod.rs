// Common types and utilities shared across the application

pub mod entity_ids;
pub mod error;
pub mod id;

pub use entity_ids::*;
pub use error::{ApiError, ApiResult, MALFORMED_INPUT_MESSAGE};
pub use id::Id;
