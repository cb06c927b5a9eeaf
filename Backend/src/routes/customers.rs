use actix_web::{get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::customer::CustomerKind;
use crate::models::dto::CustomerRequest;
use crate::models::user_group::AccessGroup;
use crate::services::customer_service::CustomerService;

#[derive(Debug, Deserialize)]
pub struct CustomersQuery {
    pub kind: Option<CustomerKind>,
}

#[get("")]
pub async fn list_customers(
    auth_user: AuthUser,
    query: web::Query<CustomersQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(CustomerService::list(db.get_ref(), query.kind).await?))
}

#[post("")]
pub async fn create_customer(
    auth_user: AuthUser,
    body: web::Json<CustomerRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    body.validate()?;
    Ok(HttpResponse::Created().json(CustomerService::create(db.get_ref(), body.into_inner()).await?))
}

#[get("/{id}")]
pub async fn get_customer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    Ok(HttpResponse::Ok().json(CustomerService::get(db.get_ref(), path.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_customer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<CustomerRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Sales)?;
    body.validate()?;

    let customer = CustomerService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(customer))
}

pub fn customers_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customers")
            .service(list_customers)
            .service(create_customer)
            .service(get_customer)
            .service(update_customer),
    );
}
