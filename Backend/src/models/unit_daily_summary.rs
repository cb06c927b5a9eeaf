// ============================================================================
// MODEL : UNIT DAILY SUMMARIES
// ============================================================================
//
// Description:
//   Snapshot of a tank or cage for one day, written by the summary job.
//
// Notes:
//   - The unit is referenced by (unit_id, unit_kind): unit_kind is the
//     discriminator, no polymorphic lookup
//   - Unique index on (unit_id, date): the job upserts, reruns are idempotent
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::rearing_unit::UnitKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "unit_daily_summaries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub unit_id: i32,
    pub unit_kind: UnitKind,
    pub date: Date,
    pub lot_count: i32,
    pub head_count: i32,
    pub biomass_kg: f64,
    pub daily_feed_kg: f64,
    pub mortality: i32,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
