//! Database model modules
//!
//! Each module contains `impl Database` blocks for a specific table or related tables.

mod auth_sessions;
mod notes;
mod one_time_tokens;
mod users;

pub use auth_sessions::hash_token;
pub use notes::PinResult;
