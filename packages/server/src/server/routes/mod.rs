// HTTP routes
pub mod auth;
pub mod chat;
pub mod health;
pub mod laws;
pub mod sessions;

pub use auth::*;
pub use chat::*;
pub use health::*;
pub use laws::*;
pub use sessions::*;

use axum::extract::Extension;

use crate::server::middleware::ClientIp;

/// Client IP in the form written to audit tables
pub(crate) fn audit_ip(ip: Option<Extension<ClientIp>>) -> Option<String> {
    ip.map(|Extension(ip)| ip.to_audit_string())
}
