use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupabaseError>;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Supabase API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SupabaseError {
    /// HTTP status for API errors, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when Supabase rejected the credentials or token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(400) | Some(401) | Some(403) | Some(422))
    }
}
