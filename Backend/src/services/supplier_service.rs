// ============================================================================
// SERVICE : SUPPLIERS
// ============================================================================
//
// Notes:
//   - RUC is the 11-digit Peruvian tax id, unique across suppliers
//   - A supplier referenced by a purchase order cannot be deleted;
//     deactivate it instead (is_active = false)
//
// ============================================================================

use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::SupplierRequest;
use crate::models::{purchase_order, supplier};
use crate::services::now;

pub struct SupplierService;

impl SupplierService {
    pub async fn list(db: &DatabaseConnection, active_only: bool) -> AppResult<Vec<supplier::Model>> {
        let mut query = supplier::Entity::find().order_by_asc(supplier::Column::Name);
        if active_only {
            query = query.filter(supplier::Column::IsActive.eq(true));
        }
        Ok(query.all(db).await?)
    }

    pub async fn get<C: ConnectionTrait>(conn: &C, supplier_id: i32) -> AppResult<supplier::Model> {
        supplier::Entity::find_by_id(supplier_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier", supplier_id))
    }

    pub async fn create(db: &DatabaseConnection, request: SupplierRequest) -> AppResult<supplier::Model> {
        let ruc = check_ruc(&request.ruc)?;
        Self::check_unique_ruc(db, &ruc, None).await?;

        let created = supplier::ActiveModel {
            name: Set(request.name.trim().to_string()),
            ruc: Set(ruc),
            address: Set(request.address),
            phone: Set(request.phone),
            email: Set(request.email),
            is_active: Set(request.is_active.unwrap_or(true)),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!("🏭 Supplier {} created", created.name);
        Ok(created)
    }

    pub async fn update(
        db: &DatabaseConnection,
        supplier_id: i32,
        request: SupplierRequest,
    ) -> AppResult<supplier::Model> {
        let existing = Self::get(db, supplier_id).await?;
        let ruc = check_ruc(&request.ruc)?;
        Self::check_unique_ruc(db, &ruc, Some(existing.id)).await?;

        let mut active: supplier::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.ruc = Set(ruc);
        active.address = Set(request.address);
        active.phone = Set(request.phone);
        active.email = Set(request.email);
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, supplier_id: i32) -> AppResult<()> {
        let existing = Self::get(db, supplier_id).await?;

        let orders = purchase_order::Entity::find()
            .filter(purchase_order::Column::SupplierId.eq(existing.id))
            .count(db)
            .await?;
        if orders > 0 {
            return Err(AppError::Conflict(format!(
                "Supplier {} has {} purchase order(s); deactivate it instead",
                existing.name, orders
            )));
        }

        supplier::Entity::delete_by_id(existing.id).exec(db).await?;
        Ok(())
    }

    async fn check_unique_ruc(db: &DatabaseConnection, ruc: &str, exclude_id: Option<i32>) -> AppResult<()> {
        let taken = supplier::Entity::find()
            .filter(supplier::Column::Ruc.eq(ruc))
            .one(db)
            .await?;
        match taken {
            Some(other) if Some(other.id) != exclude_id => {
                Err(AppError::Conflict(format!("RUC {} is already registered", ruc)))
            }
            _ => Ok(()),
        }
    }
}

/// Exactly 11 digits
fn check_ruc(ruc: &str) -> AppResult<String> {
    let ruc = ruc.trim();
    if ruc.len() != 11 || !ruc.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("RUC must be exactly 11 digits"));
    }
    Ok(ruc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::purchase_order::PurchaseStatus;
    use rust_decimal::Decimal;

    fn request(name: &str, ruc: &str) -> SupplierRequest {
        SupplierRequest {
            name: name.to_string(),
            ruc: ruc.to_string(),
            address: None,
            phone: None,
            email: None,
            is_active: None,
        }
    }

    #[test]
    fn test_ruc_digits() {
        assert!(check_ruc("20123456789").is_ok());
        assert!(check_ruc("2012345678").is_err());
        assert!(check_ruc("2012345678A").is_err());
    }

    #[tokio::test]
    async fn test_unique_ruc() {
        let db = db::test_connection().await;
        let first = SupplierService::create(&db, request("Alimentos Andinos", "20123456789")).await.unwrap();
        assert!(first.is_active);

        let duplicate = SupplierService::create(&db, request("Otro", "20123456789")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let updated = SupplierService::update(&db, first.id, request("Alimentos Andinos SAC", "20123456789"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Alimentos Andinos SAC");
    }

    #[tokio::test]
    async fn test_delete_with_orders_rejected() {
        let db = db::test_connection().await;
        let used = SupplierService::create(&db, request("Con ordenes", "20123456789")).await.unwrap();
        let unused = SupplierService::create(&db, request("Sin ordenes", "20987654321")).await.unwrap();

        purchase_order::ActiveModel {
            code: Set("OC2410-001".to_string()),
            supplier_id: Set(used.id),
            status: Set(PurchaseStatus::Pending),
            order_date: Set(now().date()),
            expected_date: Set(None),
            total_cost: Set(Decimal::ZERO),
            notes: Set(None),
            created_by: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            received_at: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        assert!(matches!(
            SupplierService::delete(&db, used.id).await,
            Err(AppError::Conflict(_))
        ));
        SupplierService::delete(&db, unused.id).await.unwrap();
        assert_eq!(SupplierService::list(&db, false).await.unwrap().len(), 1);
    }
}
