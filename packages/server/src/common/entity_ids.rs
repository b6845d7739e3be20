//! Typed ID definitions for the tables this service touches.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Supabase Auth users (`auth.users` / `profiles`).
pub struct User;

/// Marker type for rows of the `laws` table.
pub struct Law;

/// Marker type for `chat_sessions`.
pub struct ChatSession;

/// Marker type for `chat_messages`.
pub struct ChatMessage;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;

pub type LawId = Id<Law>;

pub type SessionId = Id<ChatSession>;

pub type MessageId = Id<ChatMessage>;
