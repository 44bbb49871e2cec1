pub mod ai;
pub mod auth;
pub mod export;
pub mod health;
pub mod notes;
pub mod profile;
pub mod trash;
