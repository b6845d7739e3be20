// Trợ lý Pháp luật - API Core
//
// Backend for a Vietnamese legal chatbot: rule-based query classification,
// optional delegation to an n8n workflow, keyword-scored local search over the
// `laws` table, chat session storage and law document ingestion.
//
// Persistence and identity live in Supabase (Postgres + Auth).

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
