use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateUnitsRequest, UpdateUnitRequest};
use crate::models::rearing_unit::UnitKind;
use crate::models::user_group::AccessGroup;
use crate::services::unit_service::UnitService;

#[derive(Debug, Deserialize)]
pub struct UnitsQuery {
    pub kind: Option<UnitKind>,
}

/// GET /units?kind=TANK - units with their resident lots
#[get("")]
pub async fn list_units(
    auth_user: AuthUser,
    query: web::Query<UnitsQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(UnitService::list_units(db.get_ref(), query.kind).await?))
}

/// POST /units - `quantity` identical units
#[post("")]
pub async fn create_units(
    auth_user: AuthUser,
    body: web::Json<CreateUnitsRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let units = UnitService::create_units(db.get_ref(), config.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(units))
}

/// GET /units/destinations/{lot_id} - where a lot can be moved
#[get("/destinations/{lot_id}")]
pub async fn available_destinations(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let units = UnitService::available_destinations(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(units))
}

#[get("/{id}")]
pub async fn unit_detail(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(UnitService::unit_detail(db.get_ref(), path.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_unit(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateUnitRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let unit =
        UnitService::update_unit(db.get_ref(), config.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(unit))
}

#[delete("/{id}")]
pub async fn delete_unit(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    UnitService::delete_unit(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn units_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/units")
            .service(list_units)
            .service(create_units)
            .service(available_destinations)
            .service(unit_detail)
            .service(update_unit)
            .service(delete_unit),
    );
}
