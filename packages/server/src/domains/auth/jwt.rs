use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::common::UserId;

use super::AuthUser;

/// Audience Supabase stamps on tokens issued to signed-in users.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims carried by a Supabase access token (the subset we read).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl AuthClaims {
    pub fn to_auth_user(&self) -> Result<AuthUser> {
        let user_id = UserId::parse(&self.sub).context("Token subject is not a UUID")?;
        Ok(AuthUser::new(user_id, self.email.clone()))
    }
}

/// Verifies Supabase-issued HS256 access tokens with the project JWT secret
#[derive(Clone)]
pub struct SupabaseJwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SupabaseJwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Verify and decode a token
    ///
    /// Rejects bad signatures, expired tokens and tokens not issued to an
    /// authenticated user (e.g. the anon key).
    pub fn verify_token(&self, token: &str) -> Result<AuthClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        decode::<AuthClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }

    /// Sign a token the way Supabase would. Used by local tooling and tests.
    pub fn create_token(&self, user_id: UserId, email: Option<String>, ttl_secs: i64) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AuthClaims {
            sub: user_id.to_string(),
            email,
            role: Some(AUTHENTICATED_AUDIENCE.to_string()),
            aud: AUTHENTICATED_AUDIENCE.to_string(),
            exp: now + ttl_secs,
            iat: Some(now),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let verifier = SupabaseJwtVerifier::new("super-secret-jwt-token");
        let user_id = UserId::new();

        let token = verifier
            .create_token(user_id, Some("luatsu@example.vn".to_string()), 3600)
            .unwrap();

        let claims = verifier.verify_token(&token).unwrap();
        let user = claims.to_auth_user().unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email.as_deref(), Some("luatsu@example.vn"));
        assert_eq!(claims.aud, AUTHENTICATED_AUDIENCE);
    }

    #[test]
    fn test_wrong_secret() {
        let signer = SupabaseJwtVerifier::new("secret1");
        let verifier = SupabaseJwtVerifier::new("secret2");

        let token = signer.create_token(UserId::new(), None, 3600).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let verifier = SupabaseJwtVerifier::new("secret");
        // Well past the default 60s leeway
        let token = verifier.create_token(UserId::new(), None, -3600).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token() {
        let verifier = SupabaseJwtVerifier::new("secret");
        assert!(verifier.verify_token("invalid_token").is_err());
    }
}
