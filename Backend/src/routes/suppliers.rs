use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::SupplierRequest;
use crate::models::user_group::AccessGroup;
use crate::services::supplier_service::SupplierService;

#[derive(Debug, Deserialize)]
pub struct SuppliersQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[get("")]
pub async fn list_suppliers(
    auth_user: AuthUser,
    query: web::Query<SuppliersQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(SupplierService::list(db.get_ref(), query.active_only).await?))
}

#[post("")]
pub async fn create_supplier(
    auth_user: AuthUser,
    body: web::Json<SupplierRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    body.validate()?;
    Ok(HttpResponse::Created().json(SupplierService::create(db.get_ref(), body.into_inner()).await?))
}

#[get("/{id}")]
pub async fn get_supplier(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    Ok(HttpResponse::Ok().json(SupplierService::get(db.get_ref(), path.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_supplier(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SupplierRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    body.validate()?;

    let supplier = SupplierService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(supplier))
}

#[delete("/{id}")]
pub async fn delete_supplier(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Logistics)?;
    SupplierService::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn suppliers_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/suppliers")
            .service(list_suppliers)
            .service(create_supplier)
            .service(get_supplier)
            .service(update_supplier)
            .service(delete_supplier),
    );
}
