//! Auth domain - identity via Supabase Auth
//!
//! Responsibilities:
//! - Verifying Supabase access tokens (locally with the JWT secret, or remotely)
//! - Password sign-in, sign-up and refresh through Supabase Auth
//! - Profile roles (user / editor / admin) and bans

pub mod jwt;
pub mod models;
pub mod service;
pub mod types;

pub use jwt::{AuthClaims, SupabaseJwtVerifier};
pub use models::*;
pub use service::SupabaseAuthService;
pub use types::*;
