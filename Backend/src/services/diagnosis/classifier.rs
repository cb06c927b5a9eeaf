// ============================================================================
// CLASSIFIER : RANDOM FOREST OVER WATER QUALITY
// ============================================================================
//
// Artifacts (MODEL_DIR):
//   diagnosis_model.json
//     { "classes": ["Healthy / mild stress", ...],
//       "trees": [ { "nodes": [
//           { "feature": 2, "threshold": 5.5, "left": 1, "right": 2 },
//           { "value": [12.0, 3.0] }, ... ] } ] }
//   diagnosis_features.json
//     ["water_temp", "ph", "oxygen", "ammonia",
//      "cottony_growth", "frayed_fins", "abnormal_behavior"]
//
// Notes:
//   - x[feature] <= threshold goes left; node 0 is the root
//   - leaf values are class counts or probabilities, normalised per leaf
//   - probabilities are averaged over the trees; confidence = max x 100
//   - missing or malformed artifacts -> AppError::ModelUnavailable
//
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use super::knowledge_base;
use super::predictor::{Diagnosis, DiagnosisMethod, HealthInput, HealthPredictor};
use crate::error::{AppError, AppResult};
use crate::services::calculators::round2;

pub const MODEL_FILE: &str = "diagnosis_model.json";
pub const FEATURES_FILE: &str = "diagnosis_features.json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Forest {
    classes: Vec<String>,
    trees: Vec<Tree>,
}

pub struct Classifier {
    forest: Forest,
    features: Vec<String>,
}

impl Classifier {
    /// Loads both artifacts from `dir`
    pub async fn load(dir: &Path) -> AppResult<Self> {
        let model_path = dir.join(MODEL_FILE);
        let features_path = dir.join(FEATURES_FILE);

        let model = tokio::fs::read_to_string(&model_path).await.map_err(|e| {
            warn!("Diagnosis model not available at {}: {}", model_path.display(), e);
            AppError::ModelUnavailable(
                "The prediction model is not available. Train the model first.".to_string(),
            )
        })?;
        let features = tokio::fs::read_to_string(&features_path).await.map_err(|e| {
            warn!("Diagnosis features not available at {}: {}", features_path.display(), e);
            AppError::ModelUnavailable("The prediction feature list is not available.".to_string())
        })?;

        let classifier = Self::from_json(&model, &features)?;
        info!(
            "🧠 Diagnosis model loaded: {} trees, {} classes",
            classifier.forest.trees.len(),
            classifier.forest.classes.len()
        );
        Ok(classifier)
    }

    pub fn from_json(model: &str, features: &str) -> AppResult<Self> {
        let forest: Forest = serde_json::from_str(model)
            .map_err(|e| AppError::ModelUnavailable(format!("Invalid diagnosis model: {}", e)))?;
        let features: Vec<String> = serde_json::from_str(features)
            .map_err(|e| AppError::ModelUnavailable(format!("Invalid feature list: {}", e)))?;

        let classifier = Self { forest, features };
        classifier.check()?;
        Ok(classifier)
    }

    fn check(&self) -> AppResult<()> {
        let invalid = |msg: String| Err(AppError::ModelUnavailable(format!("Invalid diagnosis model: {}", msg)));

        if self.forest.classes.is_empty() || self.forest.trees.is_empty() {
            return invalid("no classes or no trees".to_string());
        }
        for feature in &self.features {
            if feature_value(feature, &[0.0; 4], &[0; 3]).is_none() {
                return invalid(format!("unknown feature {}", feature));
            }
        }
        for (t, tree) in self.forest.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return invalid(format!("tree {} is empty", t));
            }
            for node in &tree.nodes {
                match node {
                    Node::Split { feature, left, right, .. } => {
                        if *feature >= self.features.len()
                            || *left >= tree.nodes.len()
                            || *right >= tree.nodes.len()
                        {
                            return invalid(format!("tree {} has an out-of-range split", t));
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.forest.classes.len() {
                            return invalid(format!("tree {} has a leaf of the wrong size", t));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Averaged class probabilities for one feature row
    fn predict_proba(&self, row: &[f64]) -> AppResult<Vec<f64>> {
        let mut total = vec![0.0; self.forest.classes.len()];

        for tree in &self.forest.trees {
            let leaf = walk(tree, row)?;
            let sum: f64 = leaf.iter().sum();
            if sum > 0.0 {
                for (acc, v) in total.iter_mut().zip(leaf) {
                    *acc += v / sum;
                }
            }
        }

        let trees = self.forest.trees.len() as f64;
        Ok(total.into_iter().map(|p| p / trees).collect())
    }

    /// (label, confidence %) for readings + symptom flags
    pub fn classify(&self, readings: &[f64; 4], flags: &[u8; 3]) -> AppResult<(String, f64)> {
        let row: Vec<f64> = self
            .features
            .iter()
            .map(|f| feature_value(f, readings, flags).unwrap_or(0.0))
            .collect();

        let proba = self.predict_proba(&row)?;
        let (best, p) = proba
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, p)| if *p > acc.1 { (i, *p) } else { acc });

        Ok((self.forest.classes[best].clone(), round2(p * 100.0)))
    }
}

/// Leaf reached by `row`; node 0 is the root
fn walk<'a>(tree: &'a Tree, row: &[f64]) -> AppResult<&'a [f64]> {
    let mut index = 0;
    // a well-formed tree never needs more steps than it has nodes
    for _ in 0..=tree.nodes.len() {
        match &tree.nodes[index] {
            Node::Leaf { value } => return Ok(value),
            Node::Split { feature, threshold, left, right } => {
                index = if row[*feature] <= *threshold { *left } else { *right };
            }
        }
    }
    Err(AppError::ModelUnavailable("Invalid diagnosis model: cycle in tree".to_string()))
}

/// Value of a named feature: readings = [temp, ph, oxygen, ammonia],
/// flags = [cottony_growth, frayed_fins, abnormal_behavior]
fn feature_value(name: &str, readings: &[f64; 4], flags: &[u8; 3]) -> Option<f64> {
    match name {
        "water_temp" => Some(readings[0]),
        "ph" => Some(readings[1]),
        "oxygen" => Some(readings[2]),
        "ammonia" => Some(readings[3]),
        "cottony_growth" => Some(flags[0] as f64),
        "frayed_fins" => Some(flags[1] as f64),
        "abnormal_behavior" => Some(flags[2] as f64),
        _ => None,
    }
}

#[async_trait]
impl HealthPredictor for Classifier {
    fn method(&self) -> DiagnosisMethod {
        DiagnosisMethod::Classifier
    }

    async fn predict(&self, input: &HealthInput) -> AppResult<Diagnosis> {
        let readings = input
            .readings
            .ok_or_else(|| AppError::validation("Water readings are required for a prediction"))?;

        let has = |name: &str| u8::from(input.symptoms.iter().any(|s| s.trim().eq_ignore_ascii_case(name)));
        let flags = [has("cottony_growth"), has("frayed_fins"), has("abnormal_behavior")];
        let values = [
            readings.temperature_c,
            readings.ph,
            readings.dissolved_oxygen_mg_l,
            readings.ammonia_mg_l,
        ];

        let (label, confidence) = self.classify(&values, &flags)?;

        let (explanation, action_plan) = match knowledge_base::find(&label) {
            Some(condition) => (
                condition.explanation.to_string(),
                condition.action_plan.iter().map(|s| s.to_string()).collect(),
            ),
            None => (
                "No explanation available.".to_string(),
                vec!["No action plan found.".to_string()],
            ),
        };

        Ok(Diagnosis {
            method: DiagnosisMethod::Classifier,
            condition: label,
            confidence: Some(confidence),
            explanation,
            action_plan,
            readings: Some(readings),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::diagnosis::predictor::WaterReadings;

    pub const FEATURES: &str =
        r#"["water_temp", "ph", "oxygen", "ammonia", "cottony_growth", "frayed_fins", "abnormal_behavior"]"#;

    /// Two stumps on oxygen (index 2): low oxygen -> hypoxia
    pub const MODEL: &str = r#"{
        "classes": ["Healthy / mild stress", "Hypoxia stress"],
        "trees": [
            { "nodes": [
                { "feature": 2, "threshold": 5.0, "left": 1, "right": 2 },
                { "value": [1.0, 9.0] },
                { "value": [10.0, 0.0] }
            ] },
            { "nodes": [
                { "feature": 2, "threshold": 6.0, "left": 1, "right": 2 },
                { "value": [0.0, 4.0] },
                { "value": [3.0, 1.0] }
            ] }
        ]
    }"#;

    fn readings(oxygen: f64) -> WaterReadings {
        WaterReadings {
            temperature_c: 14.0,
            ph: 7.5,
            dissolved_oxygen_mg_l: oxygen,
            ammonia_mg_l: 0.02,
        }
    }

    #[test]
    fn test_forest_averages_trees() {
        let classifier = Classifier::from_json(MODEL, FEATURES).unwrap();

        // tree 1: 0.9 hypoxia, tree 2: 1.0 hypoxia
        let (label, confidence) = classifier.classify(&[14.0, 7.5, 4.0, 0.02], &[0, 0, 0]).unwrap();
        assert_eq!(label, "Hypoxia stress");
        assert_eq!(confidence, 95.0);

        // tree 1: 1.0 healthy, tree 2: 0.75 healthy
        let (label, confidence) = classifier.classify(&[14.0, 7.5, 9.0, 0.02], &[0, 0, 0]).unwrap();
        assert_eq!(label, "Healthy / mild stress");
        assert_eq!(confidence, 87.5);
    }

    #[tokio::test]
    async fn test_prediction_maps_action_plan() {
        let classifier = Classifier::from_json(MODEL, FEATURES).unwrap();
        let input = HealthInput {
            symptoms: vec![],
            readings: Some(readings(3.0)),
        };

        let diagnosis = classifier.predict(&input).await.unwrap();
        assert_eq!(diagnosis.method, DiagnosisMethod::Classifier);
        assert_eq!(diagnosis.condition, "Hypoxia stress");
        assert!(diagnosis.action_plan.iter().any(|s| s.contains("aeration")));
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_reported() {
        let result = Classifier::load(Path::new("does-not-exist")).await;
        assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
    }

    #[test]
    fn test_malformed_model_rejected() {
        let bad_index = r#"{"classes": ["a"], "trees": [{"nodes": [{"feature": 9, "threshold": 1.0, "left": 0, "right": 0}]}]}"#;
        assert!(Classifier::from_json(bad_index, FEATURES).is_err());
        assert!(Classifier::from_json("{}", FEATURES).is_err());
        assert!(Classifier::from_json(MODEL, r#"["salinity"]"#).is_err());
    }
}
