// Business domains
pub mod activity;
pub mod auth;
pub mod chat;
pub mod laws;
