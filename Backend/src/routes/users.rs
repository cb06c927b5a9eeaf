use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateUserRequest, SecurityQuestionRequest, UpdateUserRequest};
use crate::services::user_service::UserService;

// Staff only

#[get("")]
pub async fn list_users(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;
    Ok(HttpResponse::Ok().json(UserService::list_users(db.get_ref()).await?))
}

#[post("")]
pub async fn create_user(
    auth_user: AuthUser,
    body: web::Json<CreateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;
    body.validate()?;

    let user = UserService::create_user(db.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[put("/{id}")]
pub async fn update_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;
    body.validate()?;

    let user = UserService::update_user(db.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/{id}")]
pub async fn delete_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;
    UserService::delete_user(db.get_ref(), path.into_inner(), auth_user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Public: the recovery and registration forms list them
#[get("")]
pub async fn list_questions(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(UserService::list_questions(db.get_ref()).await?))
}

#[post("")]
pub async fn create_question(
    auth_user: AuthUser,
    body: web::Json<SecurityQuestionRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_staff()?;
    body.validate()?;

    let question = UserService::create_question(db.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(question))
}

pub fn users_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(list_users)
            .service(create_user)
            .service(update_user)
            .service(delete_user),
    )
    .service(
        web::scope("/security-questions")
            .service(list_questions)
            .service(create_question),
    );
}
