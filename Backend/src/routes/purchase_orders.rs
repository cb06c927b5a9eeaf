use actix_web::{get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{PurchaseOrderRequest, UpdatePurchaseOrderRequest};
use crate::models::purchase_order::PurchaseStatus;
use crate::models::user_group::AccessGroup;
use crate::services::purchase_order_service::PurchaseOrderService;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<PurchaseStatus>,
}

#[get("")]
pub async fn list_orders(
    auth_user: AuthUser,
    query: web::Query<OrdersQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(PurchaseOrderService::list(db.get_ref(), query.status).await?))
}

#[post("")]
pub async fn create_order(
    auth_user: AuthUser,
    body: web::Json<PurchaseOrderRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let order = PurchaseOrderService::create(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(order))
}

#[get("/{id}")]
pub async fn order_detail(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(PurchaseOrderService::detail(db.get_ref(), path.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdatePurchaseOrderRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let order = PurchaseOrderService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/{id}/approve")]
pub async fn approve_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let order = PurchaseOrderService::approve(db.get_ref(), path.into_inner(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/{id}/cancel")]
pub async fn cancel_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(PurchaseOrderService::cancel(db.get_ref(), path.into_inner()).await?))
}

/// POST /purchase-orders/{id}/receive - stock every line in
#[post("/{id}/receive")]
pub async fn receive_order(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    let order = PurchaseOrderService::receive(db.get_ref(), path.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub fn purchase_orders_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchase-orders")
            .service(list_orders)
            .service(create_order)
            .service(order_detail)
            .service(update_order)
            .service(approve_order)
            .service(cancel_order)
            .service(receive_order),
    );
}
