// ============================================================================
// SERVICE : INVENTORY
// ============================================================================
//
// Description:
//   Supply categories, supplies and the stock movements that drive
//   current_stock.
//
// Notes:
//   - current_stock is only ever changed here, with an SQL
//     `current_stock = current_stock +/- q` inside the caller's transaction
//   - An outbound movement is guarded by `current_stock >= q` in the same
//     UPDATE; zero rows affected means the stock would go negative
//   - Deleting a movement applies the opposite delta
//
// ============================================================================

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::{CategoryRequest, DateRange, DispatchRequest, MovementRequest, SupplyRequest};
use crate::models::inventory_movement::{self, MovementKind};
use crate::models::{supply, supply_category};
use crate::services::lot_service::LotService;
use crate::services::now;

/// Fields of one stock movement
pub struct NewMovement {
    pub supply_id: i32,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub description: Option<String>,
    pub purchase_order_id: Option<i32>,
    pub lot_id: Option<i32>,
    pub user_id: Option<i32>,
}

pub struct InventoryService;

impl InventoryService {
    // ===== Categories =====

    pub async fn list_categories(db: &DatabaseConnection) -> AppResult<Vec<supply_category::Model>> {
        Ok(supply_category::Entity::find()
            .order_by_asc(supply_category::Column::Name)
            .all(db)
            .await?)
    }

    pub async fn create_category(
        db: &DatabaseConnection,
        request: CategoryRequest,
    ) -> AppResult<supply_category::Model> {
        let name = request.name.trim().to_string();
        let taken = supply_category::Entity::find()
            .filter(supply_category::Column::Name.eq(&name))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!("Category {} already exists", name)));
        }

        Ok(supply_category::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    // ===== Supplies =====

    pub async fn list_supplies(
        db: &DatabaseConnection,
        category_id: Option<i32>,
    ) -> AppResult<Vec<supply::Model>> {
        let mut query = supply::Entity::find().order_by_asc(supply::Column::Name);
        if let Some(category_id) = category_id {
            query = query.filter(supply::Column::CategoryId.eq(category_id));
        }
        Ok(query.all(db).await?)
    }

    pub async fn get_supply<C: ConnectionTrait>(conn: &C, supply_id: i32) -> AppResult<supply::Model> {
        supply::Entity::find_by_id(supply_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Supply", supply_id))
    }

    /// New supplies start with zero stock
    pub async fn create_supply(db: &DatabaseConnection, request: SupplyRequest) -> AppResult<supply::Model> {
        let name = request.name.trim().to_string();
        Self::check_supply(db, &name, request.category_id, request.min_stock, None).await?;

        let created = supply::ActiveModel {
            name: Set(name),
            category_id: Set(request.category_id),
            unit: Set(request.unit),
            current_stock: Set(Decimal::ZERO),
            min_stock: Set(request.min_stock.unwrap_or(Decimal::ZERO)),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("📦 Supply {} created", created.name);
        Ok(created)
    }

    /// Stock is left untouched; it only moves through movements
    pub async fn update_supply(
        db: &DatabaseConnection,
        supply_id: i32,
        request: SupplyRequest,
    ) -> AppResult<supply::Model> {
        let existing = Self::get_supply(db, supply_id).await?;
        let name = request.name.trim().to_string();
        Self::check_supply(db, &name, request.category_id, request.min_stock, Some(existing.id)).await?;

        let mut active: supply::ActiveModel = existing.into();
        active.name = Set(name);
        active.category_id = Set(request.category_id);
        active.unit = Set(request.unit);
        if let Some(min_stock) = request.min_stock {
            active.min_stock = Set(min_stock);
        }
        Ok(active.update(db).await?)
    }

    // ===== Movements =====

    pub async fn create_movement(
        db: &DatabaseConnection,
        request: MovementRequest,
        user_id: Option<i32>,
    ) -> AppResult<inventory_movement::Model> {
        let txn = db.begin().await?;
        let movement = Self::apply_movement(
            &txn,
            NewMovement {
                supply_id: request.supply_id,
                kind: request.kind,
                quantity: request.quantity,
                description: request.description,
                purchase_order_id: None,
                lot_id: None,
                user_id,
            },
        )
        .await?;
        txn.commit().await?;

        Ok(movement)
    }

    /// EXIT of a supply towards production, optionally tied to a lot
    pub async fn dispatch(
        db: &DatabaseConnection,
        request: DispatchRequest,
        user_id: Option<i32>,
    ) -> AppResult<inventory_movement::Model> {
        let txn = db.begin().await?;

        let description = match request.lot_id {
            Some(lot_id) => {
                let lot = LotService::get_active_lot(&txn, lot_id).await?;
                let base = format!("Dispatch to lot {}", lot.code);
                match request.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                    Some(notes) => format!("{} ({})", base, notes.trim()),
                    None => base,
                }
            }
            None => request
                .notes
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Dispatch to production".to_string()),
        };

        let movement = Self::apply_movement(
            &txn,
            NewMovement {
                supply_id: request.supply_id,
                kind: MovementKind::Exit,
                quantity: request.quantity,
                description: Some(description),
                purchase_order_id: None,
                lot_id: request.lot_id,
                user_id,
            },
        )
        .await?;
        txn.commit().await?;

        Ok(movement)
    }

    /// Reverts the movement's effect on the stock, then deletes it
    pub async fn delete_movement(db: &DatabaseConnection, movement_id: i32) -> AppResult<()> {
        let txn = db.begin().await?;

        let movement = inventory_movement::Entity::find_by_id(movement_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Movement", movement_id))?;

        // 1. Opposite delta; reverting an entry that was already consumed is rejected
        Self::adjust_stock(&txn, movement.supply_id, movement.quantity, !movement.kind.is_inbound()).await?;

        // 2. Row
        inventory_movement::Entity::delete_by_id(movement.id).exec(&txn).await?;
        txn.commit().await?;

        info!("↩️ Movement {} reverted", movement.id);
        Ok(())
    }

    pub async fn list_movements(
        db: &DatabaseConnection,
        supply_id: Option<i32>,
        range: &DateRange,
    ) -> AppResult<Vec<inventory_movement::Model>> {
        let mut query = inventory_movement::Entity::find()
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .order_by_desc(inventory_movement::Column::Id);

        if let Some(supply_id) = supply_id {
            query = query.filter(inventory_movement::Column::SupplyId.eq(supply_id));
        }
        if let Some(from) = range.from {
            query = query.filter(inventory_movement::Column::CreatedAt.gte(from.and_time(NaiveTime::MIN)));
        }
        if let Some(to) = range.to.and_then(|d| d.succ_opt()) {
            query = query.filter(inventory_movement::Column::CreatedAt.lt(to.and_time(NaiveTime::MIN)));
        }

        Ok(query.all(db).await?)
    }

    /// Inserts a movement and moves the stock, inside the caller's transaction
    pub async fn apply_movement<C: ConnectionTrait>(
        conn: &C,
        movement: NewMovement,
    ) -> AppResult<inventory_movement::Model> {
        if movement.quantity <= Decimal::ZERO {
            return Err(AppError::validation("Quantity must be greater than zero"));
        }
        let supply = Self::get_supply(conn, movement.supply_id).await?;

        Self::adjust_stock(conn, supply.id, movement.quantity, movement.kind.is_inbound()).await?;

        let inserted = inventory_movement::ActiveModel {
            supply_id: Set(supply.id),
            kind: Set(movement.kind),
            quantity: Set(movement.quantity),
            description: Set(movement.description),
            purchase_order_id: Set(movement.purchase_order_id),
            lot_id: Set(movement.lot_id),
            user_id: Set(movement.user_id),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        info!(
            "📦 {:?} {} {:?} of {}",
            inserted.kind, inserted.quantity, supply.unit, supply.name
        );
        Ok(inserted)
    }

    async fn adjust_stock<C: ConnectionTrait>(
        conn: &C,
        supply_id: i32,
        quantity: Decimal,
        inbound: bool,
    ) -> AppResult<()> {
        if inbound {
            supply::Entity::update_many()
                .col_expr(
                    supply::Column::CurrentStock,
                    Expr::col(supply::Column::CurrentStock).add(quantity),
                )
                .filter(supply::Column::Id.eq(supply_id))
                .exec(conn)
                .await?;
            return Ok(());
        }

        let result = supply::Entity::update_many()
            .col_expr(
                supply::Column::CurrentStock,
                Expr::col(supply::Column::CurrentStock).sub(quantity),
            )
            .filter(supply::Column::Id.eq(supply_id))
            .filter(supply::Column::CurrentStock.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let supply = Self::get_supply(conn, supply_id).await?;
            return Err(AppError::validation(format!(
                "Insufficient stock of {}: {} available, {} requested",
                supply.name, supply.current_stock, quantity
            )));
        }
        Ok(())
    }

    async fn check_supply(
        db: &DatabaseConnection,
        name: &str,
        category_id: i32,
        min_stock: Option<Decimal>,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        if min_stock.is_some_and(|m| m < Decimal::ZERO) {
            return Err(AppError::validation("Minimum stock cannot be negative"));
        }

        supply_category::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Category", category_id))?;

        let taken = supply::Entity::find()
            .filter(supply::Column::Name.eq(name))
            .one(db)
            .await?;
        match taken {
            Some(other) if Some(other.id) != exclude_id => {
                Err(AppError::Conflict(format!("Supply {} already exists", name)))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::lot::LotStage;
    use crate::services::test_support::{stocked_lot, supply, tank};

    fn movement(supply_id: i32, kind: MovementKind, quantity: i64) -> MovementRequest {
        MovementRequest {
            supply_id,
            kind,
            quantity: Decimal::from(quantity),
            description: None,
        }
    }

    async fn stock_of(db: &DatabaseConnection, supply_id: i32) -> Decimal {
        InventoryService::get_supply(db, supply_id).await.unwrap().current_stock
    }

    #[tokio::test]
    async fn test_movements_move_stock() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Pellet 2mm", 10).await;

        InventoryService::create_movement(&db, movement(feed.id, MovementKind::Entry, 50), None)
            .await
            .unwrap();
        InventoryService::create_movement(&db, movement(feed.id, MovementKind::Exit, 20), None)
            .await
            .unwrap();
        InventoryService::create_movement(&db, movement(feed.id, MovementKind::AdjustPos, 5), None)
            .await
            .unwrap();
        InventoryService::create_movement(&db, movement(feed.id, MovementKind::AdjustNeg, 3), None)
            .await
            .unwrap();

        assert_eq!(stock_of(&db, feed.id).await, Decimal::from(32));
    }

    #[tokio::test]
    async fn test_negative_stock_rejected() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Pellet 4mm", 0).await;
        InventoryService::create_movement(&db, movement(feed.id, MovementKind::Entry, 10), None)
            .await
            .unwrap();

        let too_much = InventoryService::create_movement(&db, movement(feed.id, MovementKind::Exit, 11), None).await;
        assert!(matches!(too_much, Err(AppError::Validation(_))));
        assert_eq!(stock_of(&db, feed.id).await, Decimal::from(10));

        let zero = InventoryService::create_movement(&db, movement(feed.id, MovementKind::Entry, 0), None).await;
        assert!(matches!(zero, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_reverts() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Pellet 6mm", 0).await;
        let entry = InventoryService::create_movement(&db, movement(feed.id, MovementKind::Entry, 40), None)
            .await
            .unwrap();
        let exit = InventoryService::create_movement(&db, movement(feed.id, MovementKind::Exit, 30), None)
            .await
            .unwrap();

        // The entry is partly consumed; reverting it would go negative
        assert!(InventoryService::delete_movement(&db, entry.id).await.is_err());

        InventoryService::delete_movement(&db, exit.id).await.unwrap();
        assert_eq!(stock_of(&db, feed.id).await, Decimal::from(40));
        InventoryService::delete_movement(&db, entry.id).await.unwrap();
        assert_eq!(stock_of(&db, feed.id).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_dispatch_to_lot() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Starter", 0).await;
        InventoryService::create_movement(&db, movement(feed.id, MovementKind::Entry, 25), None)
            .await
            .unwrap();
        let unit = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, unit.id, LotStage::Fry, 1000, Some(5.0)).await;

        let request = DispatchRequest {
            supply_id: feed.id,
            quantity: Decimal::from(5),
            lot_id: Some(lot.id),
            notes: None,
        };
        let dispatched = InventoryService::dispatch(&db, request, Some(1)).await.unwrap();

        assert_eq!(dispatched.kind, MovementKind::Exit);
        assert_eq!(dispatched.lot_id, Some(lot.id));
        assert_eq!(dispatched.description, Some(format!("Dispatch to lot {}", lot.code)));
        assert_eq!(stock_of(&db, feed.id).await, Decimal::from(20));
    }

    #[tokio::test]
    async fn test_supply_names_unique() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Vitamina C", 0).await;

        let request = SupplyRequest {
            name: "Vitamina C".to_string(),
            category_id: feed.category_id,
            unit: feed.unit,
            min_stock: None,
        };
        assert!(matches!(
            InventoryService::create_supply(&db, request).await,
            Err(AppError::Conflict(_))
        ));
    }
}
