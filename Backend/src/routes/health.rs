use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::models::health::HealthResponse;

/// GET /api/health - liveness + database ping (PUBLIC)
#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    let database = match db.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            warn!("⚠️ Database ping failed: {}", e);
            "unreachable".to_string()
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        database,
        time: Utc::now(),
    })
}
