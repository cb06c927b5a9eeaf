use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{PosSaleRequest, RetailOrderRequest};
use crate::models::retail_sale::{RetailStatus, SaleChannel};
use crate::models::user_group::AccessGroup;
use crate::services::retail_service::RetailService;

#[derive(Debug, Deserialize)]
pub struct RetailQuery {
    pub channel: Option<SaleChannel>,
    pub status: Option<RetailStatus>,
}

#[get("")]
pub async fn list_sales(
    auth_user: AuthUser,
    query: web::Query<RetailQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(RetailService::list(db.get_ref(), query.channel, query.status).await?))
}

/// POST /retail/pos - ticket paid on the spot
#[post("/pos")]
pub async fn create_pos_sale(
    auth_user: AuthUser,
    body: web::Json<PosSaleRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let sale = RetailService::create_pos_sale(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(sale))
}

#[post("/orders")]
pub async fn create_order(
    auth_user: AuthUser,
    body: web::Json<RetailOrderRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let sale = RetailService::create_order(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(sale))
}

#[get("/{id}")]
pub async fn sale_detail(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(RetailService::detail(db.get_ref(), path.into_inner()).await?))
}

#[post("/orders/{id}/prepare")]
pub async fn prepare_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(RetailService::prepare(db.get_ref(), path.into_inner()).await?))
}

#[post("/orders/{id}/deliver")]
pub async fn deliver_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let sale = RetailService::deliver(db.get_ref(), path.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Ok().json(sale))
}

#[post("/orders/{id}/cancel")]
pub async fn cancel_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(RetailService::cancel(db.get_ref(), path.into_inner()).await?))
}

pub fn retail_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/retail")
            .service(list_sales)
            .service(create_pos_sale)
            .service(create_order)
            .service(sale_detail)
            .service(prepare_order)
            .service(deliver_order)
            .service(cancel_order),
    );
}
