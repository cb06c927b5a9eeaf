use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{PredictRequest, SymptomsRequest, WaterConditionRequest};
use crate::models::user_group::AccessGroup;
use crate::services::diagnosis::knowledge_base::SYMPTOMS;
use crate::services::diagnosis::DiagnosisService;

/// GET /diagnosis/symptoms - names accepted by the expert system
#[get("/symptoms")]
pub async fn list_symptoms(auth_user: AuthUser) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(SYMPTOMS))
}

#[get("/lots/{lot_id}/water")]
pub async fn list_conditions(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(DiagnosisService::list_conditions(db.get_ref(), path.into_inner()).await?))
}

#[post("/lots/{lot_id}/water")]
pub async fn record_conditions(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<WaterConditionRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let record = DiagnosisService::record_conditions(
        db.get_ref(),
        path.into_inner(),
        body.into_inner(),
        Some(auth_user.user_id),
    )
    .await?;
    Ok(HttpResponse::Created().json(record))
}

/// POST /diagnosis/lots/{lot_id}/symptoms - expert system
#[post("/lots/{lot_id}/symptoms")]
pub async fn diagnose_symptoms(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SymptomsRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let diagnosis =
        DiagnosisService::diagnose_symptoms(db.get_ref(), path.into_inner(), body.into_inner().symptoms).await?;
    Ok(HttpResponse::Ok().json(diagnosis))
}

/// POST /diagnosis/lots/{lot_id}/predict - trained classifier (503 without a model)
#[post("/lots/{lot_id}/predict")]
pub async fn predict(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<PredictRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let diagnosis =
        DiagnosisService::predict(db.get_ref(), config.get_ref(), path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(diagnosis))
}

pub fn diagnosis_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/diagnosis")
            .service(list_symptoms)
            .service(list_conditions)
            .service(record_conditions)
            .service(diagnose_symptoms)
            .service(predict),
    );
}
