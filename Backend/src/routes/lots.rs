use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateEggLotRequest, MortalityRequest, SizeRequest, TaskRequest, TransferRequest, WeightRequest};
use crate::models::lot::LotStage;
use crate::models::user_group::AccessGroup;
use crate::services::lot_service::LotService;
use crate::services::transfer_service::TransferService;

#[derive(Debug, Deserialize)]
pub struct LotsQuery {
    pub stage: Option<LotStage>,
    #[serde(default)]
    pub include_retired: bool,
}

#[get("")]
pub async fn list_lots(
    auth_user: AuthUser,
    query: web::Query<LotsQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_any(&[AccessGroup::Production, AccessGroup::Sales])?;
    let lots = LotService::list_lots(db.get_ref(), query.stage, query.include_retired).await?;
    Ok(HttpResponse::Ok().json(lots))
}

/// POST /lots - new EGGS lot in an empty egg tray
#[post("")]
pub async fn create_egg_lot(
    auth_user: AuthUser,
    body: web::Json<CreateEggLotRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let lot = LotService::create_egg_lot(db.get_ref(), body.unit_id, body.head_count, Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Created().json(lot))
}

#[get("/{id}")]
pub async fn get_lot(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_any(&[AccessGroup::Production, AccessGroup::Sales])?;
    Ok(HttpResponse::Ok().json(LotService::get_lot(db.get_ref(), path.into_inner()).await?))
}

#[post("/{id}/mortality")]
pub async fn record_mortality(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<MortalityRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let request = body.into_inner();
    let lot = LotService::record_mortality(
        db.get_ref(),
        path.into_inner(),
        request.count,
        request.notes,
        Some(auth_user.user_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(lot))
}

#[post("/{id}/size")]
pub async fn set_size(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SizeRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let lot = LotService::set_size(
        db.get_ref(),
        path.into_inner(),
        body.size_min_cm,
        body.size_max_cm,
        Some(auth_user.user_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(lot))
}

#[post("/{id}/weight")]
pub async fn set_weight(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<WeightRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let lot = LotService::set_weight(db.get_ref(), path.into_inner(), body.avg_weight_g, Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Ok().json(lot))
}

/// POST /lots/{id}/task {"task": "FEEDING" | "CLEANING"} - today's checklist
#[post("/{id}/task")]
pub async fn mark_task(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TaskRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let record = LotService::mark_task(db.get_ref(), path.into_inner(), body.task).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{id}/advance")]
pub async fn advance_stage(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    let lot = LotService::advance_stage(db.get_ref(), path.into_inner(), Some(auth_user.user_id)).await?;
    Ok(HttpResponse::Ok().json(lot))
}

/// POST /lots/{id}/transfer - move, split or merge
#[post("/{id}/transfer")]
pub async fn transfer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TransferRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    body.validate()?;

    let outcome = TransferService::transfer(
        db.get_ref(),
        path.into_inner(),
        body.destination_unit_id,
        body.head_count,
        Some(auth_user.user_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/{id}/history")]
pub async fn lot_history(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(LotService::lot_history(db.get_ref(), path.into_inner()).await?))
}

#[get("/{id}/performance")]
pub async fn lot_performance(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    auth_user.require_group(AccessGroup::Production)?;
    Ok(HttpResponse::Ok().json(LotService::lot_performance(db.get_ref(), path.into_inner()).await?))
}

pub fn lots_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lots")
            .service(list_lots)
            .service(create_egg_lot)
            .service(get_lot)
            .service(record_mortality)
            .service(set_size)
            .service(set_weight)
            .service(mark_task)
            .service(advance_stage)
            .service(transfer)
            .service(lot_history)
            .service(lot_performance),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::config::AppConfig;
    use crate::db;
    use crate::models::lot::LotStage;
    use crate::models::user_group::AccessGroup;
    use crate::routes::configure_routes;
    use crate::services::test_support::{reload_lot, stocked_lot, tank};
    use crate::utils::jwt;

    fn bearer(groups: Vec<AccessGroup>) -> (header::HeaderName, String) {
        let token = jwt::sign(&jwt::Claims::for_user(7, "operario", false, groups)).unwrap();
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_sales_user_cannot_record_mortality() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(db.clone()))
                .app_data(actix_web::web::Data::new(AppConfig::for_tests()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/lots/{}/mortality", lot.id))
            .insert_header(bearer(vec![AccessGroup::Sales]))
            .set_json(json!({ "count": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User operario is not in group Production");
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 100);
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let db = db::test_connection().await;
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(db))
                .app_data(actix_web::web::Data::new(AppConfig::for_tests()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/lots/1/mortality")
            .set_json(json!({ "count": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_invalid_transfer_returns_error_body() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        let other_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, source_tank.id, LotStage::Fry, 100, Some(10.0)).await;

        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(db.clone()))
                .app_data(actix_web::web::Data::new(AppConfig::for_tests()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/lots/{}/transfer", lot.id))
            .insert_header(bearer(vec![AccessGroup::Production]))
            .set_json(json!({ "destination_unit_id": other_tank.id, "head_count": 500 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("between 1 and 100"), "{}", message);

        let unchanged = reload_lot(&db, lot.id).await;
        assert_eq!(unchanged.unit_id, Some(source_tank.id));
    }
}
