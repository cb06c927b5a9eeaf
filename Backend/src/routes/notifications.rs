use actix_web::{get, post, web, HttpResponse};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::user_group::AccessGroup;
use crate::services::notification_service::NotificationService;
use crate::services::now;
use crate::services::summary_service::SummaryService;

/// GET /notifications - alerts for the caller's groups
#[get("/notifications")]
pub async fn list_notifications(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let notifications = NotificationService::for_user(db.get_ref(), &auth_user, now()).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub unit_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub date: Option<NaiveDate>,
}

#[get("/summaries")]
pub async fn list_summaries(
    auth_user: AuthUser,
    query: web::Query<SummaryQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let rows = SummaryService::list(db.get_ref(), query.unit_id, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// POST /summaries/run {"date": "2024-10-01"} - staff re-run of the daily job (defaults to yesterday)
#[post("/summaries/run")]
pub async fn run_summary(
    auth_user: AuthUser,
    body: web::Json<SummarizeRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;

    let date = match body.date {
        Some(date) => date,
        None => now()
            .date()
            .pred_opt()
            .ok_or_else(|| AppError::Internal("No previous day".to_string()))?,
    };
    let units = SummaryService::summarize_day(db.get_ref(), date).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "date": date,
        "units_summarized": units
    })))
}

pub fn notifications_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_notifications)
        .service(list_summaries)
        .service(run_summary);
}
