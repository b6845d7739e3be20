//! Minimal Supabase Auth REST client.
//!
//! Covers the GoTrue endpoints the chatbot backend needs: resolving the user
//! behind an access token, password sign-in, sign-up and token refresh.
//!
//! # Example
//!
//! ```rust,ignore
//! use supabase_client::SupabaseClient;
//!
//! let client = SupabaseClient::new("https://abc.supabase.co".into(), anon_key);
//!
//! let session = client.sign_in_with_password("a@b.vn", "secret").await?;
//! let user = client.get_user(&session.access_token).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, SupabaseError};
pub use types::{Session, SignUpResponse, User};

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use types::{PasswordCredentials, RefreshTokenRequest, SignUpRequest};

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Resolve the user that owns an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        let request = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token);

        self.send(request).await
    }

    /// Exchange email + password for a session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        tracing::debug!(email, "Signing in with password");

        let body = PasswordCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self
            .client
            .post(self.auth_url("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&body);

        self.send(request).await
    }

    /// Register a new account. `data` lands in `user_metadata`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<serde_json::Value>,
    ) -> Result<SignUpResponse> {
        tracing::debug!(email, "Signing up");

        let body = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data,
        };
        let request = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.api_key)
            .json(&body);

        self.send(request).await
    }

    /// Trade a refresh token for a fresh session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let request = self
            .client
            .post(self.auth_url("token?grant_type=refresh_token"))
            .header("apikey", &self.api_key)
            .json(&body);

        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| SupabaseError::UnexpectedResponse(e.to_string()))
    }
}
