// ============================================================================
// MODEL : REARING UNITS (egg trays, tanks, cages)
// ============================================================================
//
// Description:
//   One table for every physical container, with an explicit `kind`
//   discriminator instead of three tables.
//
// Capacity:
//   - every kind: max_head_count (required on create)
//   - EGG_TRAY : max_biomass_kg = 0
//   - TANK/CAGE: max_biomass_kg = volume (m3) x stocking density (kg/m3)
//     RECTANGULAR volume = length x width x height
//     CIRCULAR    volume = pi x (diameter / 2)^2 x height
//
// Notes:
//   - `code` comes from sequence_counters (B/A/J + yymm + -NN), never from input
//   - `max_biomass_kg` and `is_available` are derived; services recompute them
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    #[sea_orm(string_value = "EGG_TRAY")]
    EggTray,
    #[sea_orm(string_value = "TANK")]
    Tank,
    #[sea_orm(string_value = "CAGE")]
    Cage,
}

impl UnitKind {
    /// Prefix of the generated unit code.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            UnitKind::EggTray => "B",
            UnitKind::Tank => "A",
            UnitKind::Cage => "J",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitShape {
    #[sea_orm(string_value = "RECTANGULAR")]
    Rectangular,
    #[sea_orm(string_value = "CIRCULAR")]
    Circular,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rearing_units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub kind: UnitKind,
    pub shape: Option<UnitShape>,
    pub length_m: Option<f64>,
    pub width_m: Option<f64>,
    pub diameter_m: Option<f64>,
    pub height_m: Option<f64>,
    pub stocking_density_kg_m3: Option<f64>,
    pub max_head_count: Option<i32>,
    pub max_biomass_kg: f64,
    pub is_available: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lot::Entity")]
    Lots,
}

impl Related<super::lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
