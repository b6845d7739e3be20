//! Chat domain actions
//!
//! Called directly from the HTTP routes. They take `ServerDeps` and return
//! `ApiResult` so the route only maps the value to JSON.

mod enhanced_chat;
mod sessions;

pub use enhanced_chat::{
    enhanced_chat, resolve_chat_user, EnhancedChatRequest, EnhancedChatResponse, SearchMethod,
};
pub use sessions::*;
