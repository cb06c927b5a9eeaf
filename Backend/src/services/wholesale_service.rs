// ============================================================================
// SERVICE : WHOLESALE ORDERS
// ============================================================================
//
// Description:
//   Sales by tonnage out of a GROW_OUT lot.
//
// State machine:
//   PENDING --approve--> APPROVED --dispatch--> DISPATCHED
//   PENDING --reject-->  REJECTED
//
// Notes:
//   - Approval checks requested tons against the lot biomass (t, 2 decimals)
//   - Dispatch is one transaction: status + lot decrement + ledger row; the
//     status flips with a conditional UPDATE so a second dispatch sells nothing
//
// ============================================================================

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::{WholesaleLineRequest, WholesaleOrderRequest};
use crate::models::lot::{self, LotStage};
use crate::models::sales_record::SaleType;
use crate::models::wholesale_order::{self, WholesaleStatus};
use crate::models::wholesale_order_line;
use crate::services::calculators::ration::biomass_kg;
use crate::services::calculators::round2;
use crate::services::customer_service::CustomerService;
use crate::services::lot_service::LotService;
use crate::services::now;
use crate::services::sales_report_service::{decimal, subtotal, NewSale, SalesReportService};
use crate::services::sequence_service::{CodeKind, SequenceService};

#[derive(Debug, Serialize)]
pub struct WholesaleOrderDetail {
    #[serde(flatten)]
    pub order: wholesale_order::Model,
    pub customer_name: String,
    pub lot_code: String,
    pub lines: Vec<wholesale_order_line::Model>,
}

pub struct WholesaleService;

impl WholesaleService {
    pub async fn create(
        db: &DatabaseConnection,
        request: WholesaleOrderRequest,
        user_id: Option<i32>,
    ) -> AppResult<WholesaleOrderDetail> {
        // 1. Customer, lot, figures
        let customer = CustomerService::get(db, request.customer_id).await?;
        let lot = sellable_lot(db, request.lot_id).await?;
        if request.requested_tons <= 0.0 {
            return Err(AppError::validation("Requested tons must be greater than zero"));
        }
        if request.price_per_ton < Decimal::ZERO {
            return Err(AppError::validation("Price per ton cannot be negative"));
        }
        if request.lines.iter().any(|l| l.tons <= 0.0 || l.price_per_ton < Decimal::ZERO) {
            return Err(AppError::validation("Every line needs positive tons and a non-negative price"));
        }

        // 2. Order + lines
        let txn = db.begin().await?;
        let code = SequenceService::next_code(&txn, CodeKind::WholesaleOrder, now().date()).await?;
        let order = wholesale_order::ActiveModel {
            code: Set(code),
            customer_id: Set(customer.id),
            lot_id: Set(lot.id),
            requested_tons: Set(request.requested_tons),
            price_per_ton: Set(request.price_per_ton),
            total: Set(order_total(request.requested_tons, request.price_per_ton, &request.lines)),
            status: Set(WholesaleStatus::Pending),
            notes: Set(request.notes),
            created_by: Set(user_id),
            approved_by: Set(None),
            approved_at: Set(None),
            dispatched_at: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for line in &request.lines {
            wholesale_order_line::ActiveModel {
                order_id: Set(order.id),
                description: Set(line.description.clone()),
                tons: Set(line.tons),
                price_per_ton: Set(line.price_per_ton),
                subtotal: Set(subtotal(line.tons, line.price_per_ton)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!("🚚 Wholesale order {} created ({} t of {})", order.code, order.requested_tons, lot.code);
        Self::detail(db, order.id).await
    }

    pub async fn approve(db: &DatabaseConnection, order_id: i32, user_id: i32) -> AppResult<WholesaleOrderDetail> {
        let order = Self::get(db, order_id).await?;
        expect_status(&order, WholesaleStatus::Pending)?;

        // Requested tons must be in the water
        let lot = sellable_lot(db, order.lot_id).await?;
        let available_tons = round2(biomass_kg(lot.head_count, lot.avg_weight_g) / 1000.0);
        if order.requested_tons > available_tons {
            return Err(AppError::validation(format!(
                "Lot {} holds {:.2} t; {:.2} t requested",
                lot.code, available_tons, order.requested_tons
            )));
        }

        let mut active: wholesale_order::ActiveModel = order.into();
        active.status = Set(WholesaleStatus::Approved);
        active.approved_by = Set(Some(user_id));
        active.approved_at = Set(Some(now()));
        let order = active.update(db).await?;

        info!("✅ Wholesale order {} approved", order.code);
        Self::detail(db, order.id).await
    }

    pub async fn reject(
        db: &DatabaseConnection,
        order_id: i32,
        notes: Option<String>,
        user_id: i32,
    ) -> AppResult<WholesaleOrderDetail> {
        let order = Self::get(db, order_id).await?;
        expect_status(&order, WholesaleStatus::Pending)?;

        let mut active: wholesale_order::ActiveModel = order.into();
        active.status = Set(WholesaleStatus::Rejected);
        active.approved_by = Set(Some(user_id));
        active.approved_at = Set(Some(now()));
        if notes.is_some() {
            active.notes = Set(notes);
        }
        let order = active.update(db).await?;

        info!("⛔ Wholesale order {} rejected", order.code);
        Self::detail(db, order.id).await
    }

    pub async fn dispatch(
        db: &DatabaseConnection,
        order_id: i32,
        user_id: Option<i32>,
    ) -> AppResult<WholesaleOrderDetail> {
        let txn = db.begin().await?;

        // 1. Only approved orders, claimed before any fish leave
        let order = Self::get(&txn, order_id).await?;
        expect_status(&order, WholesaleStatus::Approved)?;
        Self::claim_dispatch(&txn, &order).await?;

        // 2. Fish out of the lot
        let kg = order.requested_tons * 1000.0;
        let reference = format!("wholesale order {}", order.code);
        LotService::decrement_for_sale(&txn, order.lot_id, kg, &reference, user_id).await?;

        // 3. Ledger
        let today = now().date();
        SalesReportService::record(
            &txn,
            NewSale {
                sale_type: SaleType::Wholesale,
                reference_code: order.code.clone(),
                customer_id: Some(order.customer_id),
                lot_id: Some(order.lot_id),
                kg,
                amount: order.total,
                date: today,
            },
        )
        .await?;

        txn.commit().await?;

        info!("🚚 Wholesale order {} dispatched", order.code);
        Self::detail(db, order.id).await
    }

    pub async fn list(
        db: &DatabaseConnection,
        status: Option<WholesaleStatus>,
    ) -> AppResult<Vec<wholesale_order::Model>> {
        let mut query = wholesale_order::Entity::find()
            .order_by_desc(wholesale_order::Column::CreatedAt)
            .order_by_desc(wholesale_order::Column::Id);
        if let Some(status) = status {
            query = query.filter(wholesale_order::Column::Status.eq(status));
        }
        Ok(query.all(db).await?)
    }

    pub async fn detail(db: &DatabaseConnection, order_id: i32) -> AppResult<WholesaleOrderDetail> {
        let order = Self::get(db, order_id).await?;
        let customer = CustomerService::get(db, order.customer_id).await?;
        let lot = LotService::get_lot(db, order.lot_id).await?;
        let lines = wholesale_order_line::Entity::find()
            .filter(wholesale_order_line::Column::OrderId.eq(order.id))
            .order_by_asc(wholesale_order_line::Column::Id)
            .all(db)
            .await?;

        Ok(WholesaleOrderDetail {
            order,
            customer_name: customer.name,
            lot_code: lot.code,
            lines,
        })
    }

    /// APPROVED -> DISPATCHED as one conditional UPDATE
    async fn claim_dispatch<C: ConnectionTrait>(conn: &C, order: &wholesale_order::Model) -> AppResult<()> {
        let claimed = wholesale_order::Entity::update_many()
            .col_expr(wholesale_order::Column::Status, Expr::value(WholesaleStatus::Dispatched))
            .col_expr(wholesale_order::Column::DispatchedAt, Expr::value(Some(now())))
            .filter(wholesale_order::Column::Id.eq(order.id))
            .filter(wholesale_order::Column::Status.eq(WholesaleStatus::Approved))
            .exec(conn)
            .await?;

        if claimed.rows_affected != 1 {
            return Err(AppError::Conflict(format!(
                "Wholesale order {} was dispatched meanwhile",
                order.code
            )));
        }
        Ok(())
    }

    async fn get<C: ConnectionTrait>(conn: &C, order_id: i32) -> AppResult<wholesale_order::Model> {
        wholesale_order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Wholesale order", order_id))
    }
}

/// Sum of line subtotals when positive, else tons x price per ton
pub fn order_total(requested_tons: f64, price_per_ton: Decimal, lines: &[WholesaleLineRequest]) -> Decimal {
    let from_lines: Decimal = lines.iter().map(|l| subtotal(l.tons, l.price_per_ton)).sum();
    if from_lines > Decimal::ZERO {
        from_lines
    } else {
        (decimal(requested_tons) * price_per_ton).round_dp(2)
    }
}

/// Active GROW_OUT lot
pub async fn sellable_lot<C: ConnectionTrait>(conn: &C, lot_id: i32) -> AppResult<lot::Model> {
    let lot = LotService::get_active_lot(conn, lot_id).await?;
    if lot.stage != LotStage::GrowOut {
        return Err(AppError::validation(format!(
            "Lot {} is {:?}; only GROW_OUT lots can be sold",
            lot.code, lot.stage
        )));
    }
    Ok(lot)
}

fn expect_status(order: &wholesale_order::Model, expected: WholesaleStatus) -> AppResult<()> {
    if order.status != expected {
        return Err(AppError::Conflict(format!(
            "Wholesale order {} is {:?}, expected {:?}",
            order.code, order.status, expected
        )));
    }
    Ok(())
}
