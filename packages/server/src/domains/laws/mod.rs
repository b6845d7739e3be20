//! Laws domain - the legal document library the chatbot searches.
//!
//! Responsibilities:
//! - `laws` table access (search candidates, CRUD for the admin dashboard)
//! - Metadata extraction from document text (số hiệu, dates, signer, ...)
//! - Upload validation and conversion of a file into a new row

pub mod metadata;
pub mod models;
pub mod upload;

pub use metadata::{extract_metadata, LawMetadata};
pub use models::*;
pub use upload::{prepare_upload, validate_file_name, UploadInput};
