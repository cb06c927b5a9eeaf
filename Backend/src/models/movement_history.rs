use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementEvent {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "SPLIT")]
    Split,
    #[sea_orm(string_value = "MERGE")]
    Merge,
    #[sea_orm(string_value = "MORTALITY")]
    Mortality,
    #[sea_orm(string_value = "MEASUREMENT")]
    Measurement,
    #[sea_orm(string_value = "STAGE_COMPLETED")]
    StageCompleted,
    #[sea_orm(string_value = "SALE")]
    Sale,
}

/// Audit trail of everything that happened to a lot. Read-only once written.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movement_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lot_id: i32,
    pub event: MovementEvent,
    pub from_unit_id: Option<i32>,
    pub to_unit_id: Option<i32>,
    pub head_count: i32,
    pub description: String,
    pub user_id: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lot::Entity",
        from = "Column::LotId",
        to = "super::lot::Column::Id",
        on_delete = "Cascade"
    )]
    Lot,
}

impl Related<super::lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
