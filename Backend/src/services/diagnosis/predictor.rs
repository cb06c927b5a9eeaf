use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Water-quality readings fed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterReadings {
    pub temperature_c: f64,
    pub ph: f64,
    pub dissolved_oxygen_mg_l: f64,
    pub ammonia_mg_l: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HealthInput {
    /// Knowledge-base symptom names observed on the lot
    pub symptoms: Vec<String>,
    pub readings: Option<WaterReadings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosisMethod {
    ExpertSystem,
    Classifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub method: DiagnosisMethod,
    pub condition: String,
    /// Percentage, classifier only
    pub confidence: Option<f64>,
    pub explanation: String,
    pub action_plan: Vec<String>,
    pub readings: Option<WaterReadings>,
}

/// Advisory health check over a lot. Stateless per call.
#[async_trait]
pub trait HealthPredictor: Send + Sync {
    fn method(&self) -> DiagnosisMethod;

    async fn predict(&self, input: &HealthInput) -> AppResult<Diagnosis>;
}
