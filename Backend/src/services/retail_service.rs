// ============================================================================
// SERVICE : RETAIL SALES
// ============================================================================
//
// Description:
//   Sales by the kilo, on two channels sharing one table:
//     - POINT_OF_SALE : ticket paid on the spot, lot decremented at once
//     - ORDER         : customer order, lot decremented on delivery
//
// State machine (ORDER):
//   REGISTERED --prepare--> PREPARED --deliver--> DELIVERED
//   REGISTERED | PREPARED --cancel--> CANCELLED
//
// Notes:
//   - Both channels write their ledger row at creation; cancelling an
//     order removes it
//
// ============================================================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::{PosSaleRequest, RetailLineRequest, RetailOrderRequest};
use crate::models::retail_sale::{self, RetailStatus, SaleChannel};
use crate::models::retail_sale_line;
use crate::models::sales_record::SaleType;
use crate::services::calculators::round2;
use crate::services::customer_service::CustomerService;
use crate::services::lot_service::LotService;
use crate::services::now;
use crate::services::sales_report_service::{subtotal, NewSale, SalesReportService};
use crate::services::sequence_service::{CodeKind, SequenceService};
use crate::services::wholesale_service::sellable_lot;

#[derive(Debug, Serialize)]
pub struct RetailSaleDetail {
    #[serde(flatten)]
    pub sale: retail_sale::Model,
    pub lines: Vec<retail_sale_line::Model>,
}

/// Header values shared by both channels
struct NewRetailSale {
    channel: SaleChannel,
    status: RetailStatus,
    customer_id: Option<i32>,
    lot_id: i32,
    delivery_address: Option<String>,
    scheduled_date: Option<NaiveDate>,
    user_id: Option<i32>,
}

pub struct RetailService;

impl RetailService {
    /// Ticket: lot decremented and ledger written in the same transaction
    pub async fn create_pos_sale(
        db: &DatabaseConnection,
        request: PosSaleRequest,
        user_id: Option<i32>,
    ) -> AppResult<RetailSaleDetail> {
        check_lines(&request.lines)?;
        if let Some(customer_id) = request.customer_id {
            CustomerService::get(db, customer_id).await?;
        }

        let txn = db.begin().await?;
        let sale = Self::insert_sale(
            &txn,
            NewRetailSale {
                channel: SaleChannel::PointOfSale,
                status: RetailStatus::Completed,
                customer_id: request.customer_id,
                lot_id: request.lot_id,
                delivery_address: None,
                scheduled_date: None,
                user_id,
            },
            &request.lines,
        )
        .await?;

        let reference = format!("point-of-sale ticket {}", sale.code);
        LotService::decrement_for_sale(&txn, sale.lot_id, sale.total_kg, &reference, user_id).await?;
        Self::record(&txn, &sale, SaleType::PointOfSale).await?;
        txn.commit().await?;

        info!("🛒 POS sale {} ({} kg, {})", sale.code, sale.total_kg, sale.total);
        Self::detail(db, sale.id).await
    }

    pub async fn create_order(
        db: &DatabaseConnection,
        request: RetailOrderRequest,
        user_id: Option<i32>,
    ) -> AppResult<RetailSaleDetail> {
        check_lines(&request.lines)?;
        let customer = CustomerService::get(db, request.customer_id).await?;
        let delivery_address = request.delivery_address.or(customer.address);

        let txn = db.begin().await?;
        let sale = Self::insert_sale(
            &txn,
            NewRetailSale {
                channel: SaleChannel::Order,
                status: RetailStatus::Registered,
                customer_id: Some(customer.id),
                lot_id: request.lot_id,
                delivery_address,
                scheduled_date: request.scheduled_date,
                user_id,
            },
            &request.lines,
        )
        .await?;
        Self::record(&txn, &sale, SaleType::Order).await?;
        txn.commit().await?;

        info!("📝 Retail order {} registered for {}", sale.code, customer.name);
        Self::detail(db, sale.id).await
    }

    pub async fn prepare(db: &DatabaseConnection, sale_id: i32) -> AppResult<RetailSaleDetail> {
        let sale = Self::get_order(db, sale_id).await?;
        expect_status(&sale, &[RetailStatus::Registered])?;

        let mut active: retail_sale::ActiveModel = sale.into();
        active.status = Set(RetailStatus::Prepared);
        let sale = active.update(db).await?;
        Self::detail(db, sale.id).await
    }

    pub async fn deliver(
        db: &DatabaseConnection,
        sale_id: i32,
        user_id: Option<i32>,
    ) -> AppResult<RetailSaleDetail> {
        let txn = db.begin().await?;

        let sale = Self::get_order(&txn, sale_id).await?;
        expect_status(&sale, &[RetailStatus::Prepared])?;

        let reference = format!("retail order {}", sale.code);
        LotService::decrement_for_sale(&txn, sale.lot_id, sale.total_kg, &reference, user_id).await?;

        let mut active: retail_sale::ActiveModel = sale.into();
        active.status = Set(RetailStatus::Delivered);
        active.delivered_at = Set(Some(now()));
        let sale = active.update(&txn).await?;
        txn.commit().await?;

        info!("📦 Retail order {} delivered", sale.code);
        Self::detail(db, sale.id).await
    }

    pub async fn cancel(db: &DatabaseConnection, sale_id: i32) -> AppResult<RetailSaleDetail> {
        let txn = db.begin().await?;

        let sale = Self::get_order(&txn, sale_id).await?;
        expect_status(&sale, &[RetailStatus::Registered, RetailStatus::Prepared])?;

        SalesReportService::remove(&txn, SaleType::Order, &sale.code).await?;
        let mut active: retail_sale::ActiveModel = sale.into();
        active.status = Set(RetailStatus::Cancelled);
        let sale = active.update(&txn).await?;
        txn.commit().await?;

        info!("⛔ Retail order {} cancelled", sale.code);
        Self::detail(db, sale.id).await
    }

    pub async fn list(
        db: &DatabaseConnection,
        channel: Option<SaleChannel>,
        status: Option<RetailStatus>,
    ) -> AppResult<Vec<retail_sale::Model>> {
        let mut query = retail_sale::Entity::find()
            .order_by_desc(retail_sale::Column::CreatedAt)
            .order_by_desc(retail_sale::Column::Id);
        if let Some(channel) = channel {
            query = query.filter(retail_sale::Column::Channel.eq(channel));
        }
        if let Some(status) = status {
            query = query.filter(retail_sale::Column::Status.eq(status));
        }
        Ok(query.all(db).await?)
    }

    pub async fn detail(db: &DatabaseConnection, sale_id: i32) -> AppResult<RetailSaleDetail> {
        let sale = retail_sale::Entity::find_by_id(sale_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Retail sale", sale_id))?;
        let lines = retail_sale_line::Entity::find()
            .filter(retail_sale_line::Column::SaleId.eq(sale.id))
            .order_by_asc(retail_sale_line::Column::Id)
            .all(db)
            .await?;

        Ok(RetailSaleDetail { sale, lines })
    }

    async fn insert_sale<C: ConnectionTrait>(
        conn: &C,
        header: NewRetailSale,
        lines: &[RetailLineRequest],
    ) -> AppResult<retail_sale::Model> {
        let lot = sellable_lot(conn, header.lot_id).await?;

        let today = now().date();
        let kind = match header.channel {
            SaleChannel::PointOfSale => CodeKind::PosSale,
            SaleChannel::Order => CodeKind::RetailOrder,
        };
        let code = SequenceService::next_code(conn, kind, today).await?;

        let sale = retail_sale::ActiveModel {
            code: Set(code),
            channel: Set(header.channel),
            status: Set(header.status),
            customer_id: Set(header.customer_id),
            lot_id: Set(lot.id),
            total_kg: Set(round2(lines.iter().map(|l| l.kg).sum())),
            total: Set(lines.iter().map(|l| subtotal(l.kg, l.price_per_kg)).sum()),
            delivery_address: Set(header.delivery_address),
            scheduled_date: Set(header.scheduled_date),
            delivered_at: Set(None),
            created_by: Set(header.user_id),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        for line in lines {
            retail_sale_line::ActiveModel {
                sale_id: Set(sale.id),
                product: Set(line.product.clone()),
                kg: Set(line.kg),
                price_per_kg: Set(line.price_per_kg),
                subtotal: Set(subtotal(line.kg, line.price_per_kg)),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }

        Ok(sale)
    }

    async fn record<C: ConnectionTrait>(conn: &C, sale: &retail_sale::Model, sale_type: SaleType) -> Result<(), DbErr> {
        SalesReportService::record(
            conn,
            NewSale {
                sale_type,
                reference_code: sale.code.clone(),
                customer_id: sale.customer_id,
                lot_id: Some(sale.lot_id),
                kg: sale.total_kg,
                amount: sale.total,
                date: sale.created_at.date(),
            },
        )
        .await?;
        Ok(())
    }

    async fn get_order<C: ConnectionTrait>(conn: &C, sale_id: i32) -> AppResult<retail_sale::Model> {
        let sale = retail_sale::Entity::find_by_id(sale_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Retail sale", sale_id))?;
        if sale.channel != SaleChannel::Order {
            return Err(AppError::validation(format!("{} is a point-of-sale ticket, not an order", sale.code)));
        }
        Ok(sale)
    }
}

fn check_lines(lines: &[RetailLineRequest]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::validation("A sale needs at least one line"));
    }
    if lines.iter().any(|l| l.kg <= 0.0 || l.price_per_kg < Decimal::ZERO) {
        return Err(AppError::validation("Every line needs positive kg and a non-negative price"));
    }
    Ok(())
}

fn expect_status(sale: &retail_sale::Model, allowed: &[RetailStatus]) -> AppResult<()> {
    if !allowed.contains(&sale.status) {
        return Err(AppError::Conflict(format!(
            "Retail order {} is {:?}",
            sale.code, sale.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::customer::CustomerKind;
    use crate::models::lot::LotStage;
    use crate::services::test_support::{cage, customer, reload_lot, stocked_lot};

    fn line(kg: f64, price: i64) -> RetailLineRequest {
        RetailLineRequest {
            product: "Whole trout".to_string(),
            kg,
            price_per_kg: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn test_pos_sale_decrements_at_once() {
        let db = db::test_connection().await;
        let unit = cage(&db, 3000.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::GrowOut, 1_000, Some(250.0)).await;

        let request = PosSaleRequest {
            lot_id: lot.id,
            customer_id: None,
            lines: vec![line(2.0, 20), line(0.5, 30)],
        };
        let sale = RetailService::create_pos_sale(&db, request, Some(1)).await.unwrap();

        assert!(sale.sale.code.starts_with("VP"));
        assert_eq!(sale.sale.status, RetailStatus::Completed);
        assert_eq!(sale.sale.total_kg, 2.5);
        assert_eq!(sale.sale.total, Decimal::from(55));
        // 2.5 kg / 0.25 kg = 10 fish
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 990);
        assert_eq!(SalesReportService::dashboard(&db).await.unwrap().total_count, 1);
    }

    #[tokio::test]
    async fn test_order_decrements_on_delivery_only() {
        let db = db::test_connection().await;
        let buyer = customer(&db, "12345678", CustomerKind::Retail).await;
        let unit = cage(&db, 3000.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::GrowOut, 1_000, Some(250.0)).await;

        let request = RetailOrderRequest {
            lot_id: lot.id,
            customer_id: buyer.id,
            delivery_address: Some("Jr. Lima 123".to_string()),
            scheduled_date: None,
            lines: vec![line(5.0, 20)],
        };
        let order = RetailService::create_order(&db, request, Some(1)).await.unwrap();
        assert_eq!(order.sale.status, RetailStatus::Registered);
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 1_000);
        assert_eq!(SalesReportService::dashboard(&db).await.unwrap().total_count, 1);

        // Delivery needs PREPARED
        assert!(matches!(
            RetailService::deliver(&db, order.sale.id, None).await,
            Err(AppError::Conflict(_))
        ));

        RetailService::prepare(&db, order.sale.id).await.unwrap();
        let delivered = RetailService::deliver(&db, order.sale.id, None).await.unwrap();
        assert_eq!(delivered.sale.status, RetailStatus::Delivered);
        assert!(delivered.sale.delivered_at.is_some());
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 980);

        assert!(RetailService::cancel(&db, order.sale.id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_removes_ledger_row() {
        let db = db::test_connection().await;
        let buyer = customer(&db, "12345678", CustomerKind::Retail).await;
        let unit = cage(&db, 3000.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::GrowOut, 1_000, Some(250.0)).await;

        let request = RetailOrderRequest {
            lot_id: lot.id,
            customer_id: buyer.id,
            delivery_address: None,
            scheduled_date: None,
            lines: vec![line(1.0, 20)],
        };
        let order = RetailService::create_order(&db, request, None).await.unwrap();
        let cancelled = RetailService::cancel(&db, order.sale.id).await.unwrap();

        assert_eq!(cancelled.sale.status, RetailStatus::Cancelled);
        assert_eq!(SalesReportService::dashboard(&db).await.unwrap().total_count, 0);
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 1_000);
    }

    #[tokio::test]
    async fn test_empty_ticket_rejected() {
        let db = db::test_connection().await;
        let request = PosSaleRequest {
            lot_id: 1,
            customer_id: None,
            lines: vec![],
        };
        assert!(matches!(
            RetailService::create_pos_sale(&db, request, None).await,
            Err(AppError::Validation(_))
        ));
    }
}
