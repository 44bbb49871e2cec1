pub mod auth;

pub use auth::{AuthUser, bearer_token, require_user};
