// ============================================================================
// MODEL : LOTS (batches)
// ============================================================================
//
// Description:
//   A cohort of fish at one life stage, tracked with an aggregate head
//   count and average weight.
//
// Life cycle:
//   EGGS (egg tray) -> FRY (tank) -> JUVENILE (tank) -> GROW_OUT (cage)
//
// Notes:
//   - initial_head_count / initial_avg_weight_g are snapshotted when the lot
//     enters a stage and never touched afterwards
//   - head_count = 0 retires the lot: is_active = false, unit_id = NULL
//   - daily_feed_kg / feed_type are recomputed by the ration calculator
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStage {
    #[sea_orm(string_value = "EGGS")]
    Eggs,
    #[sea_orm(string_value = "FRY")]
    Fry,
    #[sea_orm(string_value = "JUVENILE")]
    Juvenile,
    #[sea_orm(string_value = "GROW_OUT")]
    GrowOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedType {
    #[sea_orm(string_value = "STARTER")]
    Starter,
    #[sea_orm(string_value = "FRY_1")]
    #[serde(rename = "FRY_1")]
    Fry1,
    #[sea_orm(string_value = "FRY_2")]
    #[serde(rename = "FRY_2")]
    Fry2,
    #[sea_orm(string_value = "GROWER_1")]
    #[serde(rename = "GROWER_1")]
    Grower1,
    #[sea_orm(string_value = "GROWER_2")]
    #[serde(rename = "GROWER_2")]
    Grower2,
    #[sea_orm(string_value = "FINISHER")]
    Finisher,
    #[sea_orm(string_value = "INDETERMINATE")]
    Indeterminate,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub stage: LotStage,
    pub head_count: i32,
    pub initial_head_count: i32,
    pub initial_avg_weight_g: Option<f64>,
    pub avg_weight_g: Option<f64>,
    pub size_min_cm: Option<f64>,
    pub size_max_cm: Option<f64>,
    pub stage_entered_on: Date,
    pub unit_id: Option<i32>,
    pub daily_feed_kg: f64,
    pub feed_type: FeedType,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rearing_unit::Entity",
        from = "Column::UnitId",
        to = "super::rearing_unit::Column::Id"
    )]
    Unit,
    #[sea_orm(has_many = "super::mortality_record::Entity")]
    MortalityRecords,
    #[sea_orm(has_many = "super::movement_history::Entity")]
    MovementHistory,
    #[sea_orm(has_many = "super::daily_record::Entity")]
    DailyRecords,
}

impl Related<super::rearing_unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unit.def()
    }
}

impl Related<super::mortality_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MortalityRecords.def()
    }
}

impl Related<super::movement_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovementHistory.def()
    }
}

impl Related<super::daily_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
