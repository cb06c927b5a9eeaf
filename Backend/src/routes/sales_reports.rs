use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::SalesReportFilter;
use crate::models::user_group::AccessGroup;
use crate::services::export_service::{ExportService, XLSX_CONTENT_TYPE};
use crate::services::sales_report_service::SalesReportService;

#[get("/dashboard")]
pub async fn dashboard(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(SalesReportService::dashboard(db.get_ref()).await?))
}

/// GET /sales/report?sale_type=WHOLESALE&from=2024-10-01&to=2024-10-31
#[get("/report")]
pub async fn report(
    auth_user: AuthUser,
    query: web::Query<SalesReportFilter>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(SalesReportService::report(db.get_ref(), &query).await?))
}

#[get("/report.xlsx")]
pub async fn report_export(
    auth_user: AuthUser,
    query: web::Query<SalesReportFilter>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let bytes = ExportService::sales_report(db.get_ref(), &query).await?;

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(("Content-Disposition", "attachment; filename=\"sales.xlsx\""))
        .body(bytes))
}

pub fn sales_reports_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sales")
            .service(dashboard)
            .service(report_export)
            .service(report),
    );
}
