pub mod models;
pub mod session_cache;
pub mod sqlite;

pub use models::{PinResult, hash_token};
pub use session_cache::SessionCache;
pub use sqlite::{Database, DbConn, DbError, DbResult};
