pub mod message;
pub mod query_log;
pub mod session;

pub use message::*;
pub use query_log::*;
pub use session::*;
