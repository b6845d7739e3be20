//! Auth domain data types

use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// Identity resolved from a Supabase access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self { user_id, email }
    }
}
