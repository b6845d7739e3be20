use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials for the password grant.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Body for `POST /auth/v1/token?grant_type=refresh_token`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Body for `POST /auth/v1/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A Supabase Auth user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Token pair returned by the token endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: User,
}

/// Sign-up returns a session when email confirmation is disabled, otherwise
/// just the pending user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(User),
}

impl SignUpResponse {
    pub fn user(&self) -> &User {
        match self {
            SignUpResponse::Session(session) => &session.user,
            SignUpResponse::User(user) => user,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SignUpResponse::Session(session) => Some(session),
            SignUpResponse::User(_) => None,
        }
    }
}
