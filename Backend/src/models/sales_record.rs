use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    #[sea_orm(string_value = "WHOLESALE")]
    Wholesale,
    #[sea_orm(string_value = "POINT_OF_SALE")]
    PointOfSale,
    #[sea_orm(string_value = "ORDER")]
    Order,
}

/// Flat sales ledger feeding the dashboard, the report and the xlsx export.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sale_type: SaleType,
    pub reference_code: String,
    pub customer_id: Option<i32>,
    pub lot_id: Option<i32>,
    pub kg: f64,
    pub amount: Decimal,
    pub date: Date,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
