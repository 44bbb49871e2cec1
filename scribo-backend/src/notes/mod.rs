//! Note domain helpers shared by the HTTP handlers and the purge worker

pub mod export;
pub mod html;
pub mod retention;
pub mod tag_color;

pub use retention::{RETENTION_DAYS, days_remaining, spawn_purge_worker};
pub use tag_color::color_for_tag;

/// Pinned notes allowed per user
pub const MAX_PINNED_NOTES: usize = 3;
