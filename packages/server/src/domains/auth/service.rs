use anyhow::{Context, Result};
use async_trait::async_trait;
use supabase_client::{Session, SignUpResponse, SupabaseClient};

use crate::common::UserId;
use crate::kernel::BaseAuthService;

use super::{AuthUser, SupabaseJwtVerifier};

/// Supabase Auth backed identity service
///
/// Tokens are checked locally when the project JWT secret is configured,
/// which avoids a round trip per request. Without it every token is resolved
/// through `GET /auth/v1/user`.
pub struct SupabaseAuthService {
    client: SupabaseClient,
    verifier: Option<SupabaseJwtVerifier>,
}

impl SupabaseAuthService {
    pub fn new(client: SupabaseClient, verifier: Option<SupabaseJwtVerifier>) -> Self {
        Self { client, verifier }
    }
}

#[async_trait]
impl BaseAuthService for SupabaseAuthService {
    async fn verify_access_token(&self, token: &str) -> Result<AuthUser> {
        if let Some(verifier) = &self.verifier {
            return verifier.verify_token(token)?.to_auth_user();
        }

        let user = self.client.get_user(token).await?;
        let user_id = UserId::parse(&user.id).context("Supabase user id is not a UUID")?;
        Ok(AuthUser::new(user_id, user.email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        Ok(self.client.sign_in_with_password(email, password).await?)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpResponse> {
        let metadata = full_name.map(|name| serde_json::json!({ "full_name": name }));
        Ok(self.client.sign_up(email, password, metadata).await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        Ok(self.client.refresh_session(refresh_token).await?)
    }
}
