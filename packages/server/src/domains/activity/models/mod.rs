pub mod suspicious_activity;
pub mod user_activity;

pub use suspicious_activity::*;
pub use user_activity::*;
