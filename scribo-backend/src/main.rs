use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use scribo_backend::config::{self, Config};
use scribo_backend::db::Database;
use scribo_backend::{AppState, ai, configure_routes, notes};

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("Scribo backend v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().map_err(io_error)?;
    let port = config.port;

    log::info!("Initializing data directories");
    config::initialize_data_dirs(&config)?;
    log::info!("Public URL (self_url): {}", config.self_url());

    log::info!("Opening database at {}", config.database_url);
    let db = Arc::new(Database::new(&config.database_url).map_err(io_error)?);

    let ai_backend = ai::backend_from_config(&config.ai).map_err(io_error)?;

    // Purge worker runs once now, then every PURGE_INTERVAL_SECS
    let shutdown = CancellationToken::new();
    let purge_worker = notes::spawn_purge_worker(
        Arc::clone(&db),
        std::time::Duration::from_secs(config.purge_interval_secs),
        shutdown.clone(),
    );

    let avatars_dir = config.avatars_dir();
    let cors_origin = config.cors_allowed_origin.clone();
    let state = web::Data::new(AppState::new(Arc::clone(&db), config, ai_backend));

    log::info!("Starting server on port {}", port);
    let server = HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(configure_routes)
            .service(Files::new("/avatars", avatars_dir.clone()))
    })
    .bind(("0.0.0.0", port))?
    .run();

    let server_handle = server.handle();

    // Spawn Ctrl+C handler
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        shutdown.cancel();
        if tokio::time::timeout(std::time::Duration::from_secs(5), purge_worker).await.is_err() {
            log::warn!("Timeout waiting for purge worker to stop, continuing shutdown...");
        }

        log::info!("Stopping HTTP server...");
        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop).await.is_err() {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
