mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::scheduler;
use crate::services::user_service::UserService;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sierra_nevada=info,actix_web=info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config)
        .await
        .map_err(|e| io::Error::other(format!("Failed to connect to database: {e}")))?;
    db::create_schema(&db)
        .await
        .map_err(|e| io::Error::other(format!("Failed to create schema: {e}")))?;
    tracing::info!("✅ Database connected!");

    UserService::ensure_bootstrap(&db, &config)
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;

    scheduler::spawn_daily_summary(db.clone(), config.summary_interval_secs);

    let bind = (config.bind_addr.clone(), config.port);
    tracing::info!("🚀 Starting server on http://{}:{}", bind.0, bind.1);

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}
