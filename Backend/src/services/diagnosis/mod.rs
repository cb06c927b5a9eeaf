// ============================================================================
// DIAGNOSIS - MAIN MODULE
// ============================================================================
//
// Description:
//   Two advisory predictors behind the HealthPredictor trait:
//     - expert_system : symptom overlap against the knowledge base
//     - classifier    : random forest over water-quality readings
//   plus the water-quality records they read from.
//
// Notes:
//   - Readings for a prediction: supplied in the request, or simulated
//     (simulate = true), or the lot's latest record
//   - The classifier is loaded from MODEL_DIR per request; a missing model
//     is a 503, never a crash
//
// ============================================================================

pub mod classifier;
pub mod expert_system;
pub mod knowledge_base;
pub mod predictor;

use rand::Rng;
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::dto::{PredictRequest, WaterConditionRequest};
use crate::models::water_condition;
use crate::services::calculators::round2;
use crate::models::lot;
use crate::services::lot_service::LotService;
use crate::services::now;

use classifier::Classifier;
use expert_system::ExpertSystem;
use predictor::{Diagnosis, HealthInput, HealthPredictor, WaterReadings};

#[derive(Debug, Serialize)]
pub struct LotDiagnosis {
    pub lot_id: i32,
    pub lot_code: String,
    #[serde(flatten)]
    pub diagnosis: Diagnosis,
}

pub struct DiagnosisService;

impl DiagnosisService {
    pub async fn record_conditions(
        db: &DatabaseConnection,
        lot_id: i32,
        request: WaterConditionRequest,
        user_id: Option<i32>,
    ) -> AppResult<water_condition::Model> {
        let lot = LotService::get_lot(db, lot_id).await?;

        Ok(water_condition::ActiveModel {
            lot_id: Set(lot.id),
            temperature_c: Set(request.temperature_c),
            ph: Set(request.ph),
            dissolved_oxygen_mg_l: Set(request.dissolved_oxygen_mg_l),
            ammonia_mg_l: Set(request.ammonia_mg_l),
            user_id: Set(user_id),
            recorded_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    /// Newest first
    pub async fn list_conditions(
        db: &DatabaseConnection,
        lot_id: i32,
    ) -> AppResult<Vec<water_condition::Model>> {
        let lot = LotService::get_lot(db, lot_id).await?;

        Ok(water_condition::Entity::find()
            .filter(water_condition::Column::LotId.eq(lot.id))
            .order_by_desc(water_condition::Column::RecordedAt)
            .order_by_desc(water_condition::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn diagnose_symptoms(
        db: &DatabaseConnection,
        lot_id: i32,
        symptoms: Vec<String>,
    ) -> AppResult<LotDiagnosis> {
        let lot = LotService::get_lot(db, lot_id).await?;
        let input = HealthInput { symptoms, readings: None };

        Self::run(&ExpertSystem, lot, &input).await
    }

    pub async fn predict(
        db: &DatabaseConnection,
        config: &AppConfig,
        lot_id: i32,
        request: PredictRequest,
    ) -> AppResult<LotDiagnosis> {
        let lot = LotService::get_lot(db, lot_id).await?;
        let readings = Self::readings_for(db, lot.id, &request).await?;

        let classifier = Classifier::load(&config.model_dir).await?;
        let input = HealthInput {
            symptoms: request.symptoms,
            readings: Some(readings),
        };

        Self::run(&classifier, lot, &input).await
    }

    async fn run(
        predictor: &dyn HealthPredictor,
        lot: lot::Model,
        input: &HealthInput,
    ) -> AppResult<LotDiagnosis> {
        let mut diagnosis = predictor.predict(input).await?;
        // the predictor, not the result it built, names the method
        diagnosis.method = predictor.method();

        info!("🩺 {:?} diagnosis for lot {}: {}", diagnosis.method, lot.code, diagnosis.condition);
        Ok(LotDiagnosis {
            lot_id: lot.id,
            lot_code: lot.code,
            diagnosis,
        })
    }

    async fn readings_for(
        db: &DatabaseConnection,
        lot_id: i32,
        request: &PredictRequest,
    ) -> AppResult<WaterReadings> {
        // 1. Supplied
        if let (Some(t), Some(ph), Some(o2), Some(nh3)) = (
            request.temperature_c,
            request.ph,
            request.dissolved_oxygen_mg_l,
            request.ammonia_mg_l,
        ) {
            return Ok(WaterReadings {
                temperature_c: t,
                ph,
                dissolved_oxygen_mg_l: o2,
                ammonia_mg_l: nh3,
            });
        }

        // 2. Simulated
        if request.simulate {
            return Ok(simulated_readings());
        }

        // 3. Latest recorded
        let latest = water_condition::Entity::find()
            .filter(water_condition::Column::LotId.eq(lot_id))
            .order_by_desc(water_condition::Column::RecordedAt)
            .order_by_desc(water_condition::Column::Id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::validation("No water readings recorded for this lot; supply or simulate them")
            })?;

        Ok(WaterReadings {
            temperature_c: latest.temperature_c,
            ph: latest.ph,
            dissolved_oxygen_mg_l: latest.dissolved_oxygen_mg_l,
            ammonia_mg_l: latest.ammonia_mg_l,
        })
    }
}

/// Plausible trout-farm readings
pub fn simulated_readings() -> WaterReadings {
    let mut rng = rand::thread_rng();
    WaterReadings {
        temperature_c: round2(rng.gen_range(8.0..20.0)),
        ph: round2(rng.gen_range(6.0..8.5)),
        dissolved_oxygen_mg_l: round2(rng.gen_range(4.0..11.0)),
        ammonia_mg_l: round2(rng.gen_range(0.0..0.1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::lot::LotStage;
    use crate::services::test_support::{stocked_lot, tank};
    use super::predictor::DiagnosisMethod;

    fn water(oxygen: f64) -> WaterConditionRequest {
        WaterConditionRequest {
            temperature_c: 12.0,
            ph: 7.2,
            dissolved_oxygen_mg_l: oxygen,
            ammonia_mg_l: 0.01,
        }
    }

    async fn model_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sierra-nevada-{}-{}", name, std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(classifier::MODEL_FILE), classifier::tests::MODEL).await.unwrap();
        tokio::fs::write(dir.join(classifier::FEATURES_FILE), classifier::tests::FEATURES).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_conditions_newest_first() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;

        DiagnosisService::record_conditions(&db, lot.id, water(8.0), None).await.unwrap();
        let latest = DiagnosisService::record_conditions(&db, lot.id, water(3.5), None).await.unwrap();

        let list = DiagnosisService::list_conditions(&db, lot.id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, latest.id);
    }

    #[tokio::test]
    async fn test_predict_uses_latest_readings() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;
        DiagnosisService::record_conditions(&db, lot.id, water(3.0), None).await.unwrap();

        let config = AppConfig {
            model_dir: model_dir("latest").await,
            ..AppConfig::for_tests()
        };
        let result = DiagnosisService::predict(&db, &config, lot.id, PredictRequest::default())
            .await
            .unwrap();

        assert_eq!(result.diagnosis.condition, "Hypoxia stress");
        assert_eq!(result.diagnosis.method, DiagnosisMethod::Classifier);
        assert_eq!(result.diagnosis.readings.unwrap().dissolved_oxygen_mg_l, 3.0);
    }

    #[tokio::test]
    async fn test_predict_without_model_is_unavailable() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;

        let request = PredictRequest {
            simulate: true,
            ..Default::default()
        };
        let result = DiagnosisService::predict(&db, &AppConfig::for_tests(), lot.id, request).await;
        assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_predict_needs_readings() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;

        let result =
            DiagnosisService::predict(&db, &AppConfig::for_tests(), lot.id, PredictRequest::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_simulated_readings_in_range() {
        for _ in 0..50 {
            let r = simulated_readings();
            assert!((8.0..=20.0).contains(&r.temperature_c));
            assert!((6.0..=8.5).contains(&r.ph));
            assert!((4.0..=11.0).contains(&r.dissolved_oxygen_mg_l));
        }
    }

    #[tokio::test]
    async fn test_expert_diagnosis_for_lot() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;

        let result = DiagnosisService::diagnose_symptoms(&db, lot.id, vec!["cottony_growth".to_string()])
            .await
            .unwrap();
        assert_eq!(result.lot_code, lot.code);
        assert_eq!(result.diagnosis.condition, "Saprolegniosis");
        assert_eq!(result.diagnosis.method, DiagnosisMethod::ExpertSystem);
    }

    #[tokio::test]
    async fn test_diagnosis_tagged_with_predictor_method() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 100, Some(10.0)).await;
        let input = HealthInput {
            symptoms: vec!["gasping_at_surface".to_string()],
            readings: None,
        };

        let result = DiagnosisService::run(&ExpertSystem, lot.clone(), &input).await.unwrap();
        assert_eq!(result.diagnosis.method, ExpertSystem.method());
        assert_eq!(result.lot_id, lot.id);
    }
}
