// ============================================================================
// SERVICE : PURCHASE ORDERS
// ============================================================================
//
// Description:
//   Orders to suppliers, from PENDING to RECEIVED.
//
// State machine:
//   PENDING  --approve--> APPROVED
//   PENDING | APPROVED --receive--> RECEIVED   (one ENTRY movement per line)
//   PENDING | APPROVED --cancel-->  CANCELLED
//
// Notes:
//   - Lines and expected date are editable only while PENDING
//   - total_cost = sum(quantity * unit_price), recomputed on every edit
//   - Receiving is one transaction: status + every stock entry, or nothing
//   - The RECEIVED transition is a conditional UPDATE on the old status, so
//     only one of two racing receives stocks anything
//
// ============================================================================

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::{PurchaseLineRequest, PurchaseOrderRequest, UpdatePurchaseOrderRequest};
use crate::models::inventory_movement::MovementKind;
use crate::models::purchase_order::{self, PurchaseStatus};
use crate::models::{purchase_order_line, supply};
use crate::services::inventory_service::{InventoryService, NewMovement};
use crate::services::now;
use crate::services::sequence_service::{CodeKind, SequenceService};
use crate::services::supplier_service::SupplierService;

#[derive(Debug, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub supplier_name: String,
    pub lines: Vec<purchase_order_line::Model>,
}

pub struct PurchaseOrderService;

impl PurchaseOrderService {
    pub async fn create(
        db: &DatabaseConnection,
        request: PurchaseOrderRequest,
        user_id: Option<i32>,
    ) -> AppResult<PurchaseOrderDetail> {
        // 1. Supplier must be active, lines must make sense
        let supplier = SupplierService::get(db, request.supplier_id).await?;
        if !supplier.is_active {
            return Err(AppError::validation(format!("Supplier {} is inactive", supplier.name)));
        }
        Self::check_lines(db, &request.lines).await?;

        // 2. Order + lines
        let today = now().date();
        let txn = db.begin().await?;
        let code = SequenceService::next_code(&txn, CodeKind::PurchaseOrder, today).await?;

        let order = purchase_order::ActiveModel {
            code: Set(code),
            supplier_id: Set(supplier.id),
            status: Set(PurchaseStatus::Pending),
            order_date: Set(today),
            expected_date: Set(request.expected_date),
            total_cost: Set(total_cost(&request.lines)),
            notes: Set(request.notes),
            created_by: Set(user_id),
            approved_by: Set(None),
            approved_at: Set(None),
            received_at: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        Self::insert_lines(&txn, order.id, &request.lines).await?;
        txn.commit().await?;

        info!("🧾 Purchase order {} created ({})", order.code, order.total_cost);
        Self::detail(db, order.id).await
    }

    pub async fn update(
        db: &DatabaseConnection,
        order_id: i32,
        request: UpdatePurchaseOrderRequest,
    ) -> AppResult<PurchaseOrderDetail> {
        let order = Self::get(db, order_id).await?;
        if order.status != PurchaseStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Purchase order {} is {:?}; only pending orders can be edited",
                order.code, order.status
            )));
        }
        if let Some(lines) = &request.lines {
            Self::check_lines(db, lines).await?;
        }

        let txn = db.begin().await?;
        let mut active: purchase_order::ActiveModel = order.into();
        if request.expected_date.is_some() {
            active.expected_date = Set(request.expected_date);
        }
        if request.notes.is_some() {
            active.notes = Set(request.notes);
        }
        if let Some(lines) = &request.lines {
            purchase_order_line::Entity::delete_many()
                .filter(purchase_order_line::Column::PurchaseOrderId.eq(order_id))
                .exec(&txn)
                .await?;
            Self::insert_lines(&txn, order_id, lines).await?;
            active.total_cost = Set(total_cost(lines));
        }
        active.update(&txn).await?;
        txn.commit().await?;

        Self::detail(db, order_id).await
    }

    pub async fn approve(db: &DatabaseConnection, order_id: i32, user_id: i32) -> AppResult<PurchaseOrderDetail> {
        let order = Self::get(db, order_id).await?;
        if order.status != PurchaseStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Purchase order {} is {:?}; only pending orders can be approved",
                order.code, order.status
            )));
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(PurchaseStatus::Approved);
        active.approved_by = Set(Some(user_id));
        active.approved_at = Set(Some(now()));
        let order = active.update(db).await?;

        info!("✅ Purchase order {} approved", order.code);
        Self::detail(db, order.id).await
    }

    pub async fn cancel(db: &DatabaseConnection, order_id: i32) -> AppResult<PurchaseOrderDetail> {
        let order = Self::get(db, order_id).await?;
        match order.status {
            PurchaseStatus::Received => {
                return Err(AppError::Conflict(format!(
                    "Purchase order {} was already received",
                    order.code
                )))
            }
            PurchaseStatus::Cancelled => {
                return Err(AppError::Conflict(format!(
                    "Purchase order {} is already cancelled",
                    order.code
                )))
            }
            PurchaseStatus::Pending | PurchaseStatus::Approved => {}
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(PurchaseStatus::Cancelled);
        let order = active.update(db).await?;
        Self::detail(db, order.id).await
    }

    /// Stocks every line in with an ENTRY movement
    pub async fn receive(
        db: &DatabaseConnection,
        order_id: i32,
        user_id: Option<i32>,
    ) -> AppResult<PurchaseOrderDetail> {
        let txn = db.begin().await?;

        // 1. Status, read inside the transaction
        let order = Self::get(&txn, order_id).await?;
        match order.status {
            PurchaseStatus::Pending | PurchaseStatus::Approved => {}
            PurchaseStatus::Received => {
                return Err(AppError::Conflict(format!(
                    "Purchase order {} was already received",
                    order.code
                )))
            }
            PurchaseStatus::Cancelled => {
                return Err(AppError::Conflict(format!("Purchase order {} is cancelled", order.code)))
            }
        }

        // 2. Claim the order; a concurrent receive finds nothing left to claim
        Self::claim_receipt(&txn, &order).await?;

        // 3. One entry per line
        let lines = Self::lines(&txn, order.id).await?;
        for line in &lines {
            InventoryService::apply_movement(
                &txn,
                NewMovement {
                    supply_id: line.supply_id,
                    kind: MovementKind::Entry,
                    quantity: line.quantity,
                    description: Some(format!("Purchase order {}", order.code)),
                    purchase_order_id: Some(order.id),
                    lot_id: None,
                    user_id,
                },
            )
            .await?;
        }

        txn.commit().await?;

        info!("📥 Purchase order {} received ({} lines)", order.code, lines.len());
        Self::detail(db, order_id).await
    }

    pub async fn list(
        db: &DatabaseConnection,
        status: Option<PurchaseStatus>,
    ) -> AppResult<Vec<purchase_order::Model>> {
        let mut query = purchase_order::Entity::find()
            .order_by_desc(purchase_order::Column::CreatedAt)
            .order_by_desc(purchase_order::Column::Id);
        if let Some(status) = status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        Ok(query.all(db).await?)
    }

    pub async fn detail(db: &DatabaseConnection, order_id: i32) -> AppResult<PurchaseOrderDetail> {
        let order = Self::get(db, order_id).await?;
        let supplier = SupplierService::get(db, order.supplier_id).await?;
        let lines = Self::lines(db, order.id).await?;

        Ok(PurchaseOrderDetail {
            order,
            supplier_name: supplier.name,
            lines,
        })
    }

    /// PENDING | APPROVED -> RECEIVED as one conditional UPDATE
    async fn claim_receipt<C: ConnectionTrait>(conn: &C, order: &purchase_order::Model) -> AppResult<()> {
        let claimed = purchase_order::Entity::update_many()
            .col_expr(purchase_order::Column::Status, Expr::value(PurchaseStatus::Received))
            .col_expr(purchase_order::Column::ReceivedAt, Expr::value(Some(now())))
            .filter(purchase_order::Column::Id.eq(order.id))
            .filter(purchase_order::Column::Status.is_in([PurchaseStatus::Pending, PurchaseStatus::Approved]))
            .exec(conn)
            .await?;

        if claimed.rows_affected != 1 {
            return Err(AppError::Conflict(format!(
                "Purchase order {} was received or cancelled meanwhile",
                order.code
            )));
        }
        Ok(())
    }

    async fn get<C: ConnectionTrait>(conn: &C, order_id: i32) -> AppResult<purchase_order::Model> {
        purchase_order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order", order_id))
    }

    async fn lines<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<Vec<purchase_order_line::Model>, DbErr> {
        purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_line::Column::Id)
            .all(conn)
            .await
    }

    async fn check_lines(db: &DatabaseConnection, lines: &[PurchaseLineRequest]) -> AppResult<()> {
        if lines.is_empty() {
            return Err(AppError::validation("A purchase order needs at least one line"));
        }
        for line in lines {
            if line.quantity <= Decimal::ZERO {
                return Err(AppError::validation("Line quantity must be greater than zero"));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(AppError::validation("Unit price cannot be negative"));
            }
            supply::Entity::find_by_id(line.supply_id)
                .one(db)
                .await?
                .ok_or_else(|| AppError::not_found("Supply", line.supply_id))?;
        }
        Ok(())
    }

    async fn insert_lines<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
        lines: &[PurchaseLineRequest],
    ) -> Result<(), DbErr> {
        for line in lines {
            purchase_order_line::ActiveModel {
                purchase_order_id: Set(order_id),
                supply_id: Set(line.supply_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                subtotal: Set(line.quantity * line.unit_price),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
        Ok(())
    }
}

pub fn total_cost(lines: &[PurchaseLineRequest]) -> Decimal {
    lines.iter().map(|l| l.quantity * l.unit_price).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::test_support::{supplier, supply};

    fn line(supply_id: i32, quantity: i64, unit_price: i64) -> PurchaseLineRequest {
        PurchaseLineRequest {
            supply_id,
            quantity: Decimal::from(quantity),
            unit_price: Decimal::from(unit_price),
        }
    }

    fn order(supplier_id: i32, lines: Vec<PurchaseLineRequest>) -> PurchaseOrderRequest {
        PurchaseOrderRequest {
            supplier_id,
            expected_date: None,
            notes: None,
            lines,
        }
    }

    #[test]
    fn test_total_cost() {
        assert_eq!(total_cost(&[line(1, 10, 3), line(2, 2, 50)]), Decimal::from(130));
        assert_eq!(total_cost(&[]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_receive_stocks_every_line_once() {
        let db = db::test_connection().await;
        let vendor = supplier(&db, "20123456789").await;
        let feed = supply(&db, "Pellet 2mm", 0).await;
        let salt = supply(&db, "Sal", 0).await;

        let created = PurchaseOrderService::create(
            &db,
            order(vendor.id, vec![line(feed.id, 100, 4), line(salt.id, 20, 1)]),
            Some(1),
        )
        .await
        .unwrap();
        assert!(created.order.code.starts_with("OC"));
        assert_eq!(created.order.total_cost, Decimal::from(420));
        assert_eq!(created.lines.len(), 2);

        PurchaseOrderService::approve(&db, created.order.id, 1).await.unwrap();
        let received = PurchaseOrderService::receive(&db, created.order.id, Some(1)).await.unwrap();
        assert_eq!(received.order.status, PurchaseStatus::Received);
        assert!(received.order.received_at.is_some());

        let again = PurchaseOrderService::receive(&db, created.order.id, Some(1)).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let feed_stock = InventoryService::get_supply(&db, feed.id).await.unwrap().current_stock;
        let salt_stock = InventoryService::get_supply(&db, salt.id).await.unwrap().current_stock;
        assert_eq!(feed_stock, Decimal::from(100));
        assert_eq!(salt_stock, Decimal::from(20));
    }

    #[tokio::test]
    async fn test_receipt_claim_applies_once() {
        let db = db::test_connection().await;
        let vendor = supplier(&db, "20123456789").await;
        let feed = supply(&db, "Pellet 3mm", 0).await;
        let created = PurchaseOrderService::create(&db, order(vendor.id, vec![line(feed.id, 5, 2)]), None)
            .await
            .unwrap();

        // both callers read the order while it was still PENDING
        let stale = PurchaseOrderService::get(&db, created.order.id).await.unwrap();
        PurchaseOrderService::claim_receipt(&db, &stale).await.unwrap();
        let second = PurchaseOrderService::claim_receipt(&db, &stale).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let stored = PurchaseOrderService::get(&db, created.order.id).await.unwrap();
        assert_eq!(stored.status, PurchaseStatus::Received);
        assert!(stored.received_at.is_some());
    }

    #[tokio::test]
    async fn test_edit_only_while_pending() {
        let db = db::test_connection().await;
        let vendor = supplier(&db, "20123456789").await;
        let feed = supply(&db, "Pellet 4mm", 0).await;

        let created = PurchaseOrderService::create(&db, order(vendor.id, vec![line(feed.id, 10, 5)]), None)
            .await
            .unwrap();

        let edit = || UpdatePurchaseOrderRequest {
            expected_date: None,
            notes: Some("urgent".to_string()),
            lines: Some(vec![line(feed.id, 20, 5)]),
        };
        let edited = PurchaseOrderService::update(&db, created.order.id, edit()).await.unwrap();
        assert_eq!(edited.order.total_cost, Decimal::from(100));
        assert_eq!(edited.lines.len(), 1);

        PurchaseOrderService::approve(&db, created.order.id, 1).await.unwrap();
        let late = PurchaseOrderService::update(&db, created.order.id, edit()).await;
        assert!(matches!(late, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let db = db::test_connection().await;
        let vendor = supplier(&db, "20123456789").await;
        let feed = supply(&db, "Pellet 6mm", 0).await;

        let first = PurchaseOrderService::create(&db, order(vendor.id, vec![line(feed.id, 1, 1)]), None)
            .await
            .unwrap();
        let cancelled = PurchaseOrderService::cancel(&db, first.order.id).await.unwrap();
        assert_eq!(cancelled.order.status, PurchaseStatus::Cancelled);
        assert!(PurchaseOrderService::receive(&db, first.order.id, None).await.is_err());

        let second = PurchaseOrderService::create(&db, order(vendor.id, vec![line(feed.id, 1, 1)]), None)
            .await
            .unwrap();
        PurchaseOrderService::receive(&db, second.order.id, None).await.unwrap();
        assert!(matches!(
            PurchaseOrderService::cancel(&db, second.order.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let db = db::test_connection().await;
        let vendor = supplier(&db, "20123456789").await;

        let empty = PurchaseOrderService::create(&db, order(vendor.id, vec![]), None).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }
}
