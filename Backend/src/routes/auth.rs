use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    ChangePasswordRequest, LoginRequest, RecoveryAnswerRequest, RecoveryResetRequest, RecoveryStartRequest,
};
use crate::services::user_service::UserService;

/// POST /auth/login - JWT for valid credentials (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let response = UserService::login(db.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /auth/me - current user (PROTECTED)
#[get("/me")]
pub async fn me(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let user = UserService::me(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// POST /auth/change-password (PROTECTED)
#[post("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::change_password(db.get_ref(), auth_user.user_id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated successfully"
    })))
}

/// POST /auth/recovery/start - security question for a DNI (PUBLIC)
#[post("/recovery/start")]
pub async fn recovery_start(
    body: web::Json<RecoveryStartRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let question = UserService::recovery_start(db.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(question))
}

/// POST /auth/recovery/answer - reset token for a correct answer (PUBLIC)
#[post("/recovery/answer")]
pub async fn recovery_answer(
    body: web::Json<RecoveryAnswerRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let token = UserService::recovery_answer(db.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}

/// POST /auth/recovery/reset - new password with a reset token (PUBLIC)
#[post("/recovery/reset")]
pub async fn recovery_reset(
    body: web::Json<RecoveryResetRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::recovery_reset(db.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password reset successfully"
    })))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(me)
            .service(change_password)
            .service(recovery_start)
            .service(recovery_answer)
            .service(recovery_reset),
    );
}
