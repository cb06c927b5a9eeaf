use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    #[sea_orm(string_value = "ENTRY")]
    Entry,
    #[sea_orm(string_value = "EXIT")]
    Exit,
    #[sea_orm(string_value = "ADJUST_POS")]
    AdjustPos,
    #[sea_orm(string_value = "ADJUST_NEG")]
    AdjustNeg,
}

impl MovementKind {
    /// true when the movement adds to the stock
    pub fn is_inbound(&self) -> bool {
        matches!(self, MovementKind::Entry | MovementKind::AdjustPos)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub supply_id: i32,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub description: Option<String>,
    pub purchase_order_id: Option<i32>,
    pub lot_id: Option<i32>,
    pub user_id: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supply::Entity",
        from = "Column::SupplyId",
        to = "super::supply::Column::Id"
    )]
    Supply,
}

impl Related<super::supply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supply.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
