// ============================================================================
// BIOMASS & RATION CALCULATOR
// ============================================================================
//
// Description:
//   Pure functions deriving biomass, daily ration and feed type from a
//   lot's head count, average weight and maximum size.
//
// Brackets:
//   avg weight (g) : <1 10% | <5 6% | <20 4.5% | <50 3.5% | <100 2.5%
//                    | <250 1.8% | otherwise 1.2%
//   size max (cm)  : <3 STARTER | <6 FRY_1 | <10 FRY_2 | <15 GROWER_1
//                    | <25 GROWER_2 | otherwise FINISHER
//
// Notes:
//   - Missing weight: INDETERMINATE category, ration 0, feed 0; eggs that
//     spent 14+ days in stage get a placeholder of head_count / 100 g
//   - Missing size: feed type INDETERMINATE
//   - Never errors
//
// ============================================================================

use serde::Serialize;

use crate::models::lot::{self, FeedType, LotStage};

/// Days in EGGS stage after which an unweighed lot gets a placeholder ration
pub const EGG_PLACEHOLDER_DAYS: i64 = 14;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeCategory {
    Larva,
    PostLarva,
    Fingerling,
    Juvenile,
    PreGrowOut,
    GrowOut,
    Harvest,
    Indeterminate,
}

/// head_count x avg_weight_g / 1000, 0 when either is unset or not positive
pub fn biomass_kg(head_count: i32, avg_weight_g: Option<f64>) -> f64 {
    match avg_weight_g {
        Some(w) if w > 0.0 && head_count > 0 => head_count as f64 * w / 1000.0,
        _ => 0.0,
    }
}

/// (category, ration % of biomass per day) for an average weight
pub fn ration_bracket(avg_weight_g: Option<f64>) -> (SizeCategory, f64) {
    let w = match avg_weight_g {
        Some(w) if w > 0.0 => w,
        _ => return (SizeCategory::Indeterminate, 0.0),
    };

    if w < 1.0 {
        (SizeCategory::Larva, 10.0)
    } else if w < 5.0 {
        (SizeCategory::PostLarva, 6.0)
    } else if w < 20.0 {
        (SizeCategory::Fingerling, 4.5)
    } else if w < 50.0 {
        (SizeCategory::Juvenile, 3.5)
    } else if w < 100.0 {
        (SizeCategory::PreGrowOut, 2.5)
    } else if w < 250.0 {
        (SizeCategory::GrowOut, 1.8)
    } else {
        (SizeCategory::Harvest, 1.2)
    }
}

pub fn feed_type_for_size(size_max_cm: Option<f64>) -> FeedType {
    let size = match size_max_cm {
        Some(s) if s > 0.0 => s,
        _ => return FeedType::Indeterminate,
    };

    if size < 3.0 {
        FeedType::Starter
    } else if size < 6.0 {
        FeedType::Fry1
    } else if size < 10.0 {
        FeedType::Fry2
    } else if size < 15.0 {
        FeedType::Grower1
    } else if size < 25.0 {
        FeedType::Grower2
    } else {
        FeedType::Finisher
    }
}

/// round2(biomass x ration% / 100)
pub fn daily_feed_kg(biomass_kg: f64, ration_pct: f64) -> f64 {
    round2(biomass_kg * ration_pct / 100.0)
}

/// Feed conversion ratio: feed consumed / biomass gained.
/// None when there was no gain.
pub fn fcr(feed_kg: f64, biomass_gain_kg: f64) -> Option<f64> {
    if biomass_gain_kg > 0.0 {
        Some(round2(feed_kg / biomass_gain_kg))
    } else {
        None
    }
}

/// Everything the calculator derives for a lot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LotMetrics {
    pub biomass_kg: f64,
    pub size_category: SizeCategory,
    pub ration_pct: f64,
    pub daily_feed_kg: f64,
    pub feed_type: FeedType,
}

impl LotMetrics {
    pub fn compute(
        stage: LotStage,
        head_count: i32,
        avg_weight_g: Option<f64>,
        size_max_cm: Option<f64>,
        days_in_stage: i64,
    ) -> Self {
        let biomass = round2(biomass_kg(head_count, avg_weight_g));
        let (size_category, ration_pct) = ration_bracket(avg_weight_g);
        let feed_type = feed_type_for_size(size_max_cm);

        let daily_feed = if avg_weight_g.is_some() {
            daily_feed_kg(biomass, ration_pct)
        } else if stage == LotStage::Eggs && days_in_stage >= EGG_PLACEHOLDER_DAYS {
            // placeholder: head_count / 100 grams
            round2(head_count.max(0) as f64 / 100.0 / 1000.0)
        } else {
            0.0
        };

        Self {
            biomass_kg: biomass,
            size_category,
            ration_pct,
            daily_feed_kg: daily_feed,
            feed_type,
        }
    }

    pub fn for_lot(lot: &lot::Model, today: chrono::NaiveDate) -> Self {
        let days = (today - lot.stage_entered_on).num_days();
        Self::compute(lot.stage, lot.head_count, lot.avg_weight_g, lot.size_max_cm, days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biomass_zero_when_unset() {
        assert_eq!(biomass_kg(1000, None), 0.0);
        assert_eq!(biomass_kg(0, Some(50.0)), 0.0);
        assert_eq!(biomass_kg(1000, Some(50.0)), 50.0);
    }

    #[test]
    fn test_ration_brackets() {
        assert_eq!(ration_bracket(Some(0.5)), (SizeCategory::Larva, 10.0));
        assert_eq!(ration_bracket(Some(1.0)), (SizeCategory::PostLarva, 6.0));
        assert_eq!(ration_bracket(Some(50.0)), (SizeCategory::PreGrowOut, 2.5));
        assert_eq!(ration_bracket(Some(300.0)), (SizeCategory::Harvest, 1.2));
        assert_eq!(ration_bracket(None), (SizeCategory::Indeterminate, 0.0));
    }

    #[test]
    fn test_feed_type_by_size() {
        assert_eq!(feed_type_for_size(Some(2.0)), FeedType::Starter);
        assert_eq!(feed_type_for_size(Some(6.0)), FeedType::Fry2);
        assert_eq!(feed_type_for_size(Some(14.9)), FeedType::Grower1);
        assert_eq!(feed_type_for_size(Some(30.0)), FeedType::Finisher);
        assert_eq!(feed_type_for_size(None), FeedType::Indeterminate);
    }

    #[test]
    fn test_metrics_for_weighed_lot() {
        // 1000 fish at 50 g = 50 kg, 2.5% = 1.25 kg/day
        let m = LotMetrics::compute(LotStage::Fry, 1000, Some(50.0), Some(12.0), 3);
        assert_eq!(m.biomass_kg, 50.0);
        assert_eq!(m.ration_pct, 2.5);
        assert_eq!(m.daily_feed_kg, 1.25);
        assert_eq!(m.feed_type, FeedType::Grower1);
    }

    #[test]
    fn test_egg_placeholder() {
        let young = LotMetrics::compute(LotStage::Eggs, 50_000, None, None, 10);
        assert_eq!(young.daily_feed_kg, 0.0);
        assert_eq!(young.size_category, SizeCategory::Indeterminate);

        // 50 000 eggs -> 500 g -> 0.5 kg
        let old = LotMetrics::compute(LotStage::Eggs, 50_000, None, None, 14);
        assert_eq!(old.daily_feed_kg, 0.5);
        assert_eq!(old.feed_type, FeedType::Indeterminate);
    }

    #[test]
    fn test_fcr() {
        assert_eq!(fcr(30.0, 20.0), Some(1.5));
        assert_eq!(fcr(30.0, 0.0), None);
        assert_eq!(fcr(30.0, -4.0), None);
    }
}
