//! Scribo Notes backend: REST API for notes, the recycle bin, profiles and AI text actions.

pub mod ai;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notes;
pub mod password;
pub mod validation;

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::web;
use std::sync::Arc;
use std::time::Instant;

use ai::{CompletionBackend, RateLimiter};
use config::Config;
use db::{Database, SessionCache};
use error::ApiError;

/// Largest JSON body accepted (covers imports of up to 500 full notes)
pub const JSON_BODY_LIMIT: usize = 16 * 1024 * 1024;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub sessions: SessionCache,
    /// None when no AI provider key is configured
    pub ai: Option<Arc<dyn CompletionBackend>>,
    pub ai_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, ai: Option<Arc<dyn CompletionBackend>>) -> Self {
        let ai_limiter = RateLimiter::per_minute(config.ai.rate_limit_per_minute);
        Self {
            db,
            config,
            sessions: SessionCache::new(),
            ai,
            ai_limiter,
            started_at: Instant::now(),
        }
    }
}

/// JSON extractor settings: body limit and `{ "error": ... }` rejections
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            let api_error = match err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    ApiError::PayloadTooLarge("Request body is too large".to_string())
                }
                other => ApiError::Validation(format!("Invalid request body: {}", other)),
            };
            api_error.into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req| {
        ApiError::Validation(format!("Invalid query string: {}", err)).into()
    })
}

/// Register every API route plus the extractor configs
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .configure(controllers::health::config)
        .configure(controllers::auth::config)
        .configure(controllers::notes::config)
        .configure(controllers::trash::config)
        .configure(controllers::profile::config)
        .configure(controllers::ai::config)
        .configure(controllers::export::config);
}
