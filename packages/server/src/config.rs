use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub supabase_jwt_secret: Option<String>,
    pub n8n_chat_webhook: Option<String>,
    pub n8n_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            supabase_url: first_of(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
                .context("SUPABASE_URL (or NEXT_PUBLIC_SUPABASE_URL) must be set")?,
            supabase_anon_key: first_of(&["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"])
                .context("SUPABASE_ANON_KEY (or NEXT_PUBLIC_SUPABASE_ANON_KEY) must be set")?,
            supabase_service_role_key: first_of(&["SUPABASE_SERVICE_ROLE_KEY"]),
            supabase_jwt_secret: first_of(&["SUPABASE_JWT_SECRET"]),
            n8n_chat_webhook: first_of(&["N8N_CHAT_WEBHOOK", "NEXT_PUBLIC_N8N_CHAT_WEBHOOK"]),
            n8n_timeout_secs: env::var("N8N_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("N8N_TIMEOUT_SECS must be a valid number")?,
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .context("MAX_UPLOAD_BYTES must be a valid number")?,
        })
    }

    /// Key sent as `apikey` to Supabase Auth. The service role key wins when set.
    pub fn supabase_api_key(&self) -> &str {
        self.supabase_service_role_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

/// First non-blank value among several variable names.
fn first_of(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
