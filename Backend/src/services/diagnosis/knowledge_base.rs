// ============================================================================
// KNOWLEDGE BASE : TROUT CONDITIONS
// ============================================================================
//
// Each condition lists the symptoms (from SYMPTOMS) it usually shows.
// Order matters: the expert system keeps the first condition on ties.
//
// ============================================================================

pub const SYMPTOMS: &[&str] = &[
    "cottony_growth",
    "frayed_fins",
    "abnormal_behavior",
    "lethargy",
    "loss_of_appetite",
    "skin_lesions",
    "white_spots",
    "pale_gills",
    "bulging_eyes",
    "abdominal_swelling",
    "dark_coloration",
    "gasping_at_surface",
];

pub const HEALTHY: &str = "Healthy / mild stress";

pub struct Condition {
    pub name: &'static str,
    pub symptoms: &'static [&'static str],
    pub explanation: &'static str,
    pub action_plan: &'static [&'static str],
}

impl Condition {
    /// Binary vector over SYMPTOMS
    pub fn vector(&self) -> Vec<u8> {
        SYMPTOMS
            .iter()
            .map(|s| u8::from(self.symptoms.contains(s)))
            .collect()
    }
}

pub const CONDITIONS: &[Condition] = &[
    Condition {
        name: "Saprolegniosis",
        symptoms: &["cottony_growth", "skin_lesions", "lethargy"],
        explanation: "Water mould infection, usually after handling injuries or temperature drops.",
        action_plan: &[
            "Isolate affected fish",
            "Apply a salt bath (3-5 g/L for 1 h)",
            "Reduce handling and check water temperature",
        ],
    },
    Condition {
        name: "Columnaris",
        symptoms: &["frayed_fins", "skin_lesions", "pale_gills", "loss_of_appetite"],
        explanation: "Bacterial infection (Flavobacterium columnare) favoured by warm water and high density.",
        action_plan: &[
            "Lower stocking density",
            "Increase water exchange",
            "Consult a veterinarian for medicated feed",
        ],
    },
    Condition {
        name: "Furunculosis",
        symptoms: &["skin_lesions", "lethargy", "loss_of_appetite", "dark_coloration", "abdominal_swelling"],
        explanation: "Systemic Aeromonas salmonicida infection, often triggered by stress.",
        action_plan: &[
            "Remove dead and moribund fish daily",
            "Send samples to the laboratory",
            "Start the prescribed antibiotic treatment",
        ],
    },
    Condition {
        name: "Ichthyophthiriasis",
        symptoms: &["white_spots", "abnormal_behavior", "gasping_at_surface"],
        explanation: "White spot parasite attaching to skin and gills.",
        action_plan: &[
            "Increase water flow",
            "Apply formalin or salt treatment as prescribed",
            "Disinfect nets and equipment",
        ],
    },
    Condition {
        name: "Bacterial gill disease",
        symptoms: &["pale_gills", "gasping_at_surface", "lethargy", "loss_of_appetite"],
        explanation: "Gill colonisation linked to poor water quality and organic load.",
        action_plan: &[
            "Clean the unit and remove organic waste",
            "Check ammonia and dissolved oxygen",
            "Reduce feeding for 48 h",
        ],
    },
    Condition {
        name: "Enteric redmouth",
        symptoms: &["bulging_eyes", "dark_coloration", "lethargy", "abdominal_swelling"],
        explanation: "Yersinia ruckeri infection, frequent in juvenile trout.",
        action_plan: &[
            "Vaccinate upcoming lots",
            "Reduce density and stress",
            "Consult a veterinarian for treatment",
        ],
    },
    Condition {
        name: "Hypoxia stress",
        symptoms: &["gasping_at_surface", "abnormal_behavior"],
        explanation: "Low dissolved oxygen, often at night or with high biomass.",
        action_plan: &[
            "Turn on aeration",
            "Stop feeding until oxygen recovers",
            "Measure oxygen at dawn",
        ],
    },
    Condition {
        name: HEALTHY,
        symptoms: &[],
        explanation: "No matching condition; the lot looks healthy or mildly stressed.",
        action_plan: &[
            "Keep the routine water-quality checks",
            "Keep monitoring behaviour and appetite",
        ],
    },
];

pub fn find(name: &str) -> Option<&'static Condition> {
    CONDITIONS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub fn healthy() -> &'static Condition {
    &CONDITIONS[CONDITIONS.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symptoms_are_known() {
        for condition in CONDITIONS {
            for symptom in condition.symptoms {
                assert!(SYMPTOMS.contains(symptom), "{} uses unknown {}", condition.name, symptom);
            }
            assert_eq!(condition.vector().len(), SYMPTOMS.len());
        }
        assert_eq!(healthy().name, HEALTHY);
        assert!(find("columnaris").is_some());
    }
}
