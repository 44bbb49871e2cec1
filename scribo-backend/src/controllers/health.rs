use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::error::ApiError;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
}

async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let db = state.db.clone();
    let database_ok = web::block(move || db.conn().is_ok()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "version": VERSION,
        "database": database_ok,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    })))
}

async fn get_version() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}
