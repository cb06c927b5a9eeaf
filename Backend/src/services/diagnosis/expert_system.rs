use async_trait::async_trait;

use super::knowledge_base::{self, SYMPTOMS};
use super::predictor::{Diagnosis, DiagnosisMethod, HealthInput, HealthPredictor};
use crate::error::{AppError, AppResult};

/// Symptom matcher: the condition sharing the most observed symptoms wins
/// (first one on ties); no overlap at all means healthy.
pub struct ExpertSystem;

impl ExpertSystem {
    pub fn symptom_vector(symptoms: &[String]) -> AppResult<Vec<u8>> {
        let mut vector = vec![0u8; SYMPTOMS.len()];
        for symptom in symptoms {
            let key = symptom.trim().to_lowercase();
            let index = SYMPTOMS
                .iter()
                .position(|s| *s == key)
                .ok_or_else(|| AppError::validation(format!("Unknown symptom: {}", symptom)))?;
            vector[index] = 1;
        }
        Ok(vector)
    }

    pub fn diagnose(observed: &[u8]) -> Diagnosis {
        let mut best = knowledge_base::healthy();
        let mut best_matches = 0;

        for condition in knowledge_base::CONDITIONS {
            let matches = observed
                .iter()
                .zip(condition.vector())
                .filter(|(obs, expected)| **obs == 1 && *expected == 1)
                .count();

            if matches > best_matches {
                best_matches = matches;
                best = condition;
            }
        }

        Diagnosis {
            method: DiagnosisMethod::ExpertSystem,
            condition: best.name.to_string(),
            confidence: None,
            explanation: best.explanation.to_string(),
            action_plan: best.action_plan.iter().map(|s| s.to_string()).collect(),
            readings: None,
        }
    }
}

#[async_trait]
impl HealthPredictor for ExpertSystem {
    fn method(&self) -> DiagnosisMethod {
        DiagnosisMethod::ExpertSystem
    }

    async fn predict(&self, input: &HealthInput) -> AppResult<Diagnosis> {
        let observed = Self::symptom_vector(&input.symptoms)?;
        let mut diagnosis = Self::diagnose(&observed);
        diagnosis.readings = input.readings;
        Ok(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::diagnosis::knowledge_base::HEALTHY;

    fn symptoms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_best_overlap_wins() {
        let observed = ExpertSystem::symptom_vector(&symptoms(&["white_spots", "gasping_at_surface"])).unwrap();
        assert_eq!(ExpertSystem::diagnose(&observed).condition, "Ichthyophthiriasis");
    }

    #[test]
    fn test_first_condition_wins_ties() {
        // skin_lesions alone matches Saprolegniosis, Columnaris and Furunculosis
        let observed = ExpertSystem::symptom_vector(&symptoms(&["skin_lesions"])).unwrap();
        assert_eq!(ExpertSystem::diagnose(&observed).condition, "Saprolegniosis");
    }

    #[test]
    fn test_no_symptoms_is_healthy() {
        let observed = ExpertSystem::symptom_vector(&[]).unwrap();
        let diagnosis = ExpertSystem::diagnose(&observed);
        assert_eq!(diagnosis.condition, HEALTHY);
        assert!(!diagnosis.action_plan.is_empty());
    }

    #[test]
    fn test_unknown_symptom_rejected() {
        assert!(ExpertSystem::symptom_vector(&symptoms(&["green_scales"])).is_err());
    }

    #[tokio::test]
    async fn test_predictor_trait() {
        let input = HealthInput {
            symptoms: symptoms(&["Bulging_Eyes", "dark_coloration"]),
            readings: None,
        };
        let diagnosis = ExpertSystem.predict(&input).await.unwrap();
        assert_eq!(diagnosis.method, DiagnosisMethod::ExpertSystem);
        assert_eq!(diagnosis.condition, "Enteric redmouth");
    }
}
