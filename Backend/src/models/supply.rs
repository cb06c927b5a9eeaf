// ============================================================================
// MODEL : SUPPLIES (raw materials: feed, chemicals, equipment...)
// ============================================================================
//
// Notes:
//   - current_stock is only changed by inventory movements, through an
//     atomic `current_stock = current_stock +/- q` UPDATE
//   - is_low_stock() drives the low-stock flag of the stock report
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum MeasureUnit {
    #[sea_orm(string_value = "KG")]
    #[serde(rename = "KG")]
    Kg,
    #[sea_orm(string_value = "LT")]
    #[serde(rename = "LT")]
    Lt,
    #[sea_orm(string_value = "UN")]
    #[serde(rename = "UN")]
    Un,
    #[sea_orm(string_value = "M3")]
    #[serde(rename = "M3")]
    M3,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub category_id: i32,
    pub unit: MeasureUnit,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub created_at: DateTime,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supply_category::Entity",
        from = "Column::CategoryId",
        to = "super::supply_category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::inventory_movement::Entity")]
    Movements,
}

impl Related<super::supply_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::inventory_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
