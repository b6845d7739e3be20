//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod document_text;
pub mod n8n_client;
pub mod test_dependencies;
pub mod traits;

pub use deps::{PostgresStore, ServerDeps};
pub use document_text::{extract_text, DocumentFormat};
pub use n8n_client::{parse_webhook_reply, N8nChatWebhook};
pub use test_dependencies::{
    InMemoryStore, MockAuthService, MockChatWebhook, TestDependencies, TEST_MAX_UPLOAD_BYTES,
};
pub use traits::*;
