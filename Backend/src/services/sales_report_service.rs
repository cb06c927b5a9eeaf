// ============================================================================
// SERVICE : SALES LEDGER & REPORTS
// ============================================================================
//
// Description:
//   Every completed or registered sale writes one sales_records row
//   (wholesale dispatch, point-of-sale ticket, retail order). The dashboard
//   and the report aggregate that ledger per sale type.
//
// ============================================================================

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::dto::SalesReportFilter;
use crate::models::sales_record::{self, SaleType};
use crate::services::calculators::round2;
use crate::services::now;

/// One ledger row to write
pub struct NewSale {
    pub sale_type: SaleType,
    pub reference_code: String,
    pub customer_id: Option<i32>,
    pub lot_id: Option<i32>,
    pub kg: f64,
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeTotal {
    pub sale_type: SaleType,
    pub count: usize,
    pub kg: f64,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SalesDashboard {
    pub by_type: Vec<TypeTotal>,
    pub total_count: usize,
    pub total_kg: f64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SalesReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub summary: SalesDashboard,
    pub records: Vec<sales_record::Model>,
}

pub struct SalesReportService;

impl SalesReportService {
    pub async fn record<C: ConnectionTrait>(conn: &C, sale: NewSale) -> Result<sales_record::Model, DbErr> {
        sales_record::ActiveModel {
            sale_type: Set(sale.sale_type),
            reference_code: Set(sale.reference_code),
            customer_id: Set(sale.customer_id),
            lot_id: Set(sale.lot_id),
            kg: Set(sale.kg),
            amount: Set(sale.amount),
            date: Set(sale.date),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(conn)
        .await
    }

    /// Removes the ledger row of a cancelled sale
    pub async fn remove<C: ConnectionTrait>(conn: &C, sale_type: SaleType, reference_code: &str) -> Result<u64, DbErr> {
        let result = sales_record::Entity::delete_many()
            .filter(sales_record::Column::SaleType.eq(sale_type))
            .filter(sales_record::Column::ReferenceCode.eq(reference_code))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn dashboard(db: &DatabaseConnection) -> AppResult<SalesDashboard> {
        let records = sales_record::Entity::find().all(db).await?;
        Ok(summarize(&records))
    }

    pub async fn report(db: &DatabaseConnection, filter: &SalesReportFilter) -> AppResult<SalesReport> {
        let mut query = sales_record::Entity::find()
            .order_by_desc(sales_record::Column::Date)
            .order_by_desc(sales_record::Column::Id);

        if let Some(sale_type) = filter.sale_type {
            query = query.filter(sales_record::Column::SaleType.eq(sale_type));
        }
        if let Some(from) = filter.from {
            query = query.filter(sales_record::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(sales_record::Column::Date.lte(to));
        }

        let records = query.all(db).await?;
        Ok(SalesReport {
            from: filter.from,
            to: filter.to,
            summary: summarize(&records),
            records,
        })
    }
}

/// Totals per sale type, every type present even when empty
pub fn summarize(records: &[sales_record::Model]) -> SalesDashboard {
    let by_type: Vec<TypeTotal> = [SaleType::Wholesale, SaleType::PointOfSale, SaleType::Order]
        .into_iter()
        .map(|sale_type| {
            let matching: Vec<&sales_record::Model> =
                records.iter().filter(|r| r.sale_type == sale_type).collect();
            TypeTotal {
                sale_type,
                count: matching.len(),
                kg: round2(matching.iter().map(|r| r.kg).sum()),
                amount: matching.iter().map(|r| r.amount).sum(),
            }
        })
        .collect();

    SalesDashboard {
        total_count: records.len(),
        total_kg: round2(by_type.iter().map(|t| t.kg).sum()),
        total_amount: by_type.iter().map(|t| t.amount).sum(),
        by_type,
    }
}

/// Money or weight as a Decimal
pub fn decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// quantity x unit price, rounded to cents
pub fn subtotal(quantity: f64, unit_price: Decimal) -> Decimal {
    (decimal(quantity) * unit_price).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sale(sale_type: SaleType, code: &str, kg: f64, amount: i64, date: NaiveDate) -> NewSale {
        NewSale {
            sale_type,
            reference_code: code.to_string(),
            customer_id: None,
            lot_id: None,
            kg,
            amount: Decimal::from(amount),
            date,
        }
    }

    #[test]
    fn test_subtotal_rounds_to_cents() {
        assert_eq!(subtotal(2.5, Decimal::new(1250, 2)), Decimal::new(3125, 2));
        assert_eq!(subtotal(0.333, Decimal::from(10)), Decimal::new(333, 2));
    }

    #[tokio::test]
    async fn test_report_filters_and_summary() {
        let db = db::test_connection().await;
        let today = now().date();
        let last_month = today - chrono::Duration::days(40);

        SalesReportService::record(&db, sale(SaleType::Wholesale, "PM1", 2000.0, 16000, today)).await.unwrap();
        SalesReportService::record(&db, sale(SaleType::PointOfSale, "VP1", 3.5, 70, today)).await.unwrap();
        SalesReportService::record(&db, sale(SaleType::PointOfSale, "VP2", 1.5, 30, last_month)).await.unwrap();

        let dashboard = SalesReportService::dashboard(&db).await.unwrap();
        assert_eq!(dashboard.total_count, 3);
        assert_eq!(dashboard.total_amount, Decimal::from(16100));
        let pos = dashboard.by_type.iter().find(|t| t.sale_type == SaleType::PointOfSale).unwrap();
        assert_eq!((pos.count, pos.kg), (2, 5.0));

        let filter = SalesReportFilter {
            sale_type: Some(SaleType::PointOfSale),
            from: Some(today),
            to: None,
        };
        let report = SalesReportService::report(&db, &filter).await.unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].reference_code, "VP1");
        assert_eq!(report.summary.total_amount, Decimal::from(70));
    }

    #[tokio::test]
    async fn test_remove_cancelled_sale() {
        let db = db::test_connection().await;
        let today = now().date();
        SalesReportService::record(&db, sale(SaleType::Order, "VR1", 4.0, 80, today)).await.unwrap();

        assert_eq!(SalesReportService::remove(&db, SaleType::Order, "VR1").await.unwrap(), 1);
        assert_eq!(SalesReportService::dashboard(&db).await.unwrap().total_count, 0);
    }
}
