use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CategoryRequest, DateRange, DispatchRequest, MovementRequest, SupplyRequest};
use crate::models::user_group::AccessGroup;
use crate::services::export_service::{ExportService, XLSX_CONTENT_TYPE};
use crate::services::inventory_service::InventoryService;
use crate::services::stock_report_service::StockReportService;

#[derive(Debug, Deserialize)]
pub struct SuppliesQuery {
    pub category_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub supply_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ===== Categories =====

#[get("/categories")]
pub async fn list_categories(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(InventoryService::list_categories(db.get_ref()).await?))
}

#[post("/categories")]
pub async fn create_category(
    auth_user: AuthUser,
    body: web::Json<CategoryRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    body.validate()?;
    Ok(HttpResponse::Created().json(InventoryService::create_category(db.get_ref(), body.into_inner()).await?))
}

// ===== Supplies =====

#[get("/supplies")]
pub async fn list_supplies(
    auth_user: AuthUser,
    query: web::Query<SuppliesQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(InventoryService::list_supplies(db.get_ref(), query.category_id).await?))
}

#[post("/supplies")]
pub async fn create_supply(
    auth_user: AuthUser,
    body: web::Json<SupplyRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    body.validate()?;
    Ok(HttpResponse::Created().json(InventoryService::create_supply(db.get_ref(), body.into_inner()).await?))
}

#[put("/supplies/{id}")]
pub async fn update_supply(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SupplyRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    body.validate()?;

    let supply = InventoryService::update_supply(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(supply))
}

// ===== Movements =====

#[get("/movements")]
pub async fn list_movements(
    auth_user: AuthUser,
    query: web::Query<MovementsQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    Ok(HttpResponse::Ok().json(InventoryService::list_movements(db.get_ref(), query.supply_id, &range).await?))
}

#[post("/movements")]
pub async fn create_movement(
    auth_user: AuthUser,
    body: web::Json<MovementRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let movement = InventoryService::create_movement(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(movement))
}

#[delete("/movements/{id}")]
pub async fn delete_movement(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    InventoryService::delete_movement(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /inventory/dispatch - supply out to production
#[post("/dispatch")]
pub async fn dispatch(
    auth_user: AuthUser,
    body: web::Json<DispatchRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_any(&[AccessGroup::Logistics, AccessGroup::Production])?;
    let movement = InventoryService::dispatch(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(movement))
}

// ===== Reports =====

#[get("/reports/stock")]
pub async fn stock_summary(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(StockReportService::stock_summary(db.get_ref()).await?))
}

#[get("/reports/stock/chart")]
pub async fn stock_chart(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(StockReportService::stock_by_category(db.get_ref()).await?))
}

#[get("/reports/stock.xlsx")]
pub async fn stock_export(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let bytes = ExportService::stock_summary(db.get_ref()).await?;

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(("Content-Disposition", "attachment; filename=\"stock.xlsx\""))
        .body(bytes))
}

#[get("/reports/movements")]
pub async fn movements_by_kind(
    auth_user: AuthUser,
    query: web::Query<DateRange>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(StockReportService::movements_by_kind(db.get_ref(), &query).await?))
}

pub fn inventory_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/inventory")
            .service(list_categories)
            .service(create_category)
            .service(list_supplies)
            .service(create_supply)
            .service(update_supply)
            .service(list_movements)
            .service(create_movement)
            .service(delete_movement)
            .service(dispatch)
            .service(stock_export)
            .service(stock_chart)
            .service(stock_summary)
            .service(movements_by_kind),
    );
}
