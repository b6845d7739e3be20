//! Activity domain - audit trail of user actions and suspicious events.
//!
//! Recording is best effort: a failed insert is logged and never reaches the
//! caller.

pub mod models;
pub mod recorder;

pub use models::*;
pub use recorder::*;
