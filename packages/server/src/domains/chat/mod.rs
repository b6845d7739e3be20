//! Chat domain - answering questions and keeping conversation history.
//!
//! Responsibilities:
//! - Query classification (greeting / follow-up / legal / general)
//! - Keyword-scored local search over `laws`
//! - Reply assembly and delegation to the n8n workflow
//! - Chat sessions, messages and query logs

pub mod actions;
pub mod classifier;
pub mod models;
pub mod ranking;
pub mod responder;

pub use classifier::{classify, QueryAnalysis, QueryKind};
pub use ranking::{local_search, rank_laws, ScoredLaw};
