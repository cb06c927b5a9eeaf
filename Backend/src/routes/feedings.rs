use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{FeedingFilter, FeedingRequest, UpdateFeedingRequest};
use crate::models::user_group::AccessGroup;
use crate::services::feeding_service::FeedingService;

/// GET /feedings?lot_id=&from=&to=
#[get("")]
pub async fn list_feedings(
    auth_user: AuthUser,
    query: web::Query<FeedingFilter>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::list(db.get_ref(), query.into_inner()).await?))
}

#[post("")]
pub async fn create_feeding(
    auth_user: AuthUser,
    body: web::Json<FeedingRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let feeding = FeedingService::create(db.get_ref(), body.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(feeding))
}

#[get("/lot/{lot_id}/history")]
pub async fn feeding_history(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::history(db.get_ref(), path.into_inner()).await?))
}

#[get("/lot/{lot_id}/summary")]
pub async fn feeding_summary(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::summary(db.get_ref(), path.into_inner()).await?))
}

/// GET /feedings/lot/{lot_id}/optimised - calculator output, nothing saved
#[get("/lot/{lot_id}/optimised")]
pub async fn optimised_preview(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::optimised_preview(db.get_ref(), path.into_inner()).await?))
}

#[post("/lot/{lot_id}/optimised")]
pub async fn apply_optimised(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::apply_optimised(db.get_ref(), path.into_inner()).await?))
}

#[get("/{id}")]
pub async fn get_feeding(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(FeedingService::get(db.get_ref(), path.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_feeding(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateFeedingRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let feeding = FeedingService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(feeding))
}

#[delete("/{id}")]
pub async fn delete_feeding(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    FeedingService::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn feedings_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/feedings")
            .service(list_feedings)
            .service(create_feeding)
            .service(feeding_history)
            .service(feeding_summary)
            .service(optimised_preview)
            .service(apply_optimised)
            .service(get_feeding)
            .service(update_feeding)
            .service(delete_feeding),
    );
}
