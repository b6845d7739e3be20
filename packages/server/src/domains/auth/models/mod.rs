pub mod banned_user;
pub mod profile;

pub use banned_user::*;
pub use profile::*;
