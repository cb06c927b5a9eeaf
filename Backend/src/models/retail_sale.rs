// ============================================================================
// MODEL : RETAIL SALES
// ============================================================================
//
// Description:
//   Point-of-sale tickets and customer orders share this table; `channel`
//   tells them apart.
//
// Status flow:
//   POINT_OF_SALE : COMPLETED at creation (lot decremented immediately)
//   ORDER         : REGISTERED -> PREPARED -> DELIVERED (lot decremented)
//                   REGISTERED | PREPARED -> CANCELLED
//
// Notes:
//   - code = VP + yymm + -NNNN (POS) or VR + yymm + -NNNN (ORDER)
//   - a sales_records row is written at creation for both channels
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleChannel {
    #[sea_orm(string_value = "POINT_OF_SALE")]
    PointOfSale,
    #[sea_orm(string_value = "ORDER")]
    Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetailStatus {
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "REGISTERED")]
    Registered,
    #[sea_orm(string_value = "PREPARED")]
    Prepared,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "retail_sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub channel: SaleChannel,
    pub status: RetailStatus,
    pub customer_id: Option<i32>,
    pub lot_id: i32,
    pub total_kg: f64,
    pub total: Decimal,
    pub delivery_address: Option<String>,
    pub scheduled_date: Option<Date>,
    pub delivered_at: Option<DateTime>,
    pub created_by: Option<i32>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lot::Entity",
        from = "Column::LotId",
        to = "super::lot::Column::Id"
    )]
    Lot,
    #[sea_orm(has_many = "super::retail_sale_line::Entity")]
    Lines,
}

impl Related<super::lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lot.def()
    }
}

impl Related<super::retail_sale_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
