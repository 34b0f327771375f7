use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tandem_admin::config::{LoggingSettings, Settings};
use tandem_admin::core::Suggester;
use tandem_admin::routes::{self, AppState};
use tandem_admin::services::{InMemoryStore, PostgresStore, StatusCache, Store};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // Initialize logging; LOG_LEVEL and LOG_FORMAT override the config file
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting Tandem admin service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    let statuses = StatusCache::new(settings.cache.status_capacity, settings.cache.status_ttl_secs);
    let suggester = Suggester::default();

    if settings.database.is_memory() {
        info!("Using in-memory store; data is lost on shutdown");
        let store = Arc::new(InMemoryStore::new());
        return serve(&settings, AppState::new(store, statuses, suggester)).await;
    }

    let db = &settings.database;
    let store = PostgresStore::from_settings(
        &db.url,
        db.max_connections,
        db.min_connections,
        db.acquire_timeout_secs,
        db.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    info!(
        "PostgreSQL store initialized (max: {} connections)",
        db.max_connections.unwrap_or(10)
    );

    serve(&settings, AppState::new(Arc::new(store), statuses, suggester)).await
}

fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn serve<S: Store>(settings: &Settings, app_state: AppState<S>) -> std::io::Result<()> {
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(routes::handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes::<S>)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
