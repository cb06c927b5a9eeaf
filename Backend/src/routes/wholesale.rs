use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{RejectRequest, WholesaleOrderRequest};
use crate::models::user_group::AccessGroup;
use crate::models::wholesale_order::WholesaleStatus;
use crate::services::wholesale_service::WholesaleService;

#[derive(Debug, Deserialize)]
pub struct WholesaleQuery {
    pub status: Option<WholesaleStatus>,
}

#[get("")]
pub async fn list_orders(
    auth_user: AuthUser,
    query: web::Query<WholesaleQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(WholesaleService::list(db.get_ref(), query.status).await?))
}

#[post("")]
pub async fn create_order(
    auth_user: AuthUser,
    body: web::Json<WholesaleOrderRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let order = WholesaleService::create(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(order))
}

#[get("/{id}")]
pub async fn order_detail(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(WholesaleService::detail(db.get_ref(), path.into_inner()).await?))
}

#[post("/{id}/approve")]
pub async fn approve_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let order = WholesaleService::approve(db.get_ref(), path.into_inner(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/{id}/reject")]
pub async fn reject_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<RejectRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let order =
        WholesaleService::reject(db.get_ref(), path.into_inner(), body.into_inner().notes, auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /wholesale/{id}/dispatch - fish leave the lot
#[post("/{id}/dispatch")]
pub async fn dispatch_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    let order = WholesaleService::dispatch(db.get_ref(), path.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub fn wholesale_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wholesale")
            .service(list_orders)
            .service(create_order)
            .service(order_detail)
            .service(approve_order)
            .service(reject_order)
            .service(dispatch_order),
    );
}
