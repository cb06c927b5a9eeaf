// Fixtures shared by the service tests

use rust_decimal::Decimal;
use sea_orm::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::AppConfig;
use crate::models::customer::{self, CustomerKind};
use crate::models::dto::{CategoryRequest, CreateUnitsRequest, CustomerRequest, SupplierRequest, SupplyRequest};
use crate::models::lot::{self, FeedType, LotStage};
use crate::models::rearing_unit::{self, UnitKind, UnitShape};
use crate::models::supply::{self, MeasureUnit};
use crate::models::{supplier, supply_category};
use crate::services::customer_service::CustomerService;
use crate::services::inventory_service::InventoryService;
use crate::services::lot_service::LotService;
use crate::services::now;
use crate::services::supplier_service::SupplierService;
use crate::services::unit_service::UnitService;

/// Head-count capacity given to fixture tanks and cages
pub const HEAD_CAPACITY: i32 = 100_000;

pub fn units_request(kind: UnitKind) -> CreateUnitsRequest {
    CreateUnitsRequest {
        kind,
        quantity: 1,
        shape: None,
        length_m: None,
        width_m: None,
        diameter_m: None,
        height_m: None,
        stocking_density_kg_m3: None,
        max_head_count: Some(HEAD_CAPACITY),
    }
}

/// Rectangular tank/cage of `length_m` x 1 m x 1 m at `density` kg/m3
pub async fn unit(
    db: &DatabaseConnection,
    kind: UnitKind,
    length_m: f64,
    density: f64,
    max_head_count: i32,
) -> rearing_unit::Model {
    let request = CreateUnitsRequest {
        shape: Some(UnitShape::Rectangular),
        length_m: Some(length_m),
        width_m: Some(1.0),
        height_m: Some(1.0),
        stocking_density_kg_m3: Some(density),
        max_head_count: Some(max_head_count),
        ..units_request(kind)
    };
    UnitService::create_units(db, &AppConfig::for_tests(), request)
        .await
        .unwrap()
        .remove(0)
}

/// Tank with `max_biomass_kg` of capacity
pub async fn tank(db: &DatabaseConnection, max_biomass_kg: f64) -> rearing_unit::Model {
    unit(db, UnitKind::Tank, max_biomass_kg / 25.0, 25.0, HEAD_CAPACITY).await
}

pub async fn cage(db: &DatabaseConnection, max_biomass_kg: f64) -> rearing_unit::Model {
    unit(db, UnitKind::Cage, max_biomass_kg / 15.0, 15.0, HEAD_CAPACITY).await
}

pub async fn egg_tray(db: &DatabaseConnection, max_head_count: i32) -> rearing_unit::Model {
    let request = CreateUnitsRequest {
        max_head_count: Some(max_head_count),
        ..units_request(UnitKind::EggTray)
    };
    UnitService::create_units(db, &AppConfig::for_tests(), request)
        .await
        .unwrap()
        .remove(0)
}

/// Active lot placed directly in a unit
pub async fn stocked_lot(
    db: &DatabaseConnection,
    unit_id: i32,
    stage: LotStage,
    head_count: i32,
    avg_weight_g: Option<f64>,
) -> lot::Model {
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    let code = format!("T-{:03}", NEXT.fetch_add(1, Ordering::Relaxed));
    let inserted = lot::ActiveModel {
        code: Set(code),
        stage: Set(stage),
        head_count: Set(head_count),
        initial_head_count: Set(head_count),
        initial_avg_weight_g: Set(avg_weight_g),
        avg_weight_g: Set(avg_weight_g),
        size_min_cm: Set(None),
        size_max_cm: Set(None),
        stage_entered_on: Set(now().date()),
        unit_id: Set(Some(unit_id)),
        daily_feed_kg: Set(0.0),
        feed_type: Set(FeedType::Indeterminate),
        is_active: Set(true),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let saved = LotService::save_lot(db, inserted).await.unwrap();
    UnitService::refresh_availability(db, unit_id).await.unwrap();
    saved
}

pub async fn reload_lot(db: &DatabaseConnection, lot_id: i32) -> lot::Model {
    LotService::get_lot(db, lot_id).await.unwrap()
}

/// Supply in the shared "Feed" category, zero stock
pub async fn supply(db: &DatabaseConnection, name: &str, min_stock: i64) -> supply::Model {
    let category = match supply_category::Entity::find()
        .filter(supply_category::Column::Name.eq("Feed"))
        .one(db)
        .await
        .unwrap()
    {
        Some(category) => category,
        None => InventoryService::create_category(
            db,
            CategoryRequest {
                name: "Feed".to_string(),
                description: None,
            },
        )
        .await
        .unwrap(),
    };

    let request = SupplyRequest {
        name: name.to_string(),
        category_id: category.id,
        unit: MeasureUnit::Kg,
        min_stock: Some(Decimal::from(min_stock)),
    };
    InventoryService::create_supply(db, request).await.unwrap()
}

pub async fn supplier(db: &DatabaseConnection, ruc: &str) -> supplier::Model {
    let request = SupplierRequest {
        name: format!("Supplier {}", ruc),
        ruc: ruc.to_string(),
        address: None,
        phone: None,
        email: None,
        is_active: None,
    };
    SupplierService::create(db, request).await.unwrap()
}

pub async fn customer(db: &DatabaseConnection, tax_id: &str, kind: CustomerKind) -> customer::Model {
    let request = CustomerRequest {
        name: format!("Customer {}", tax_id),
        tax_id: tax_id.to_string(),
        contact: None,
        phone: None,
        email: None,
        address: None,
        kind,
    };
    CustomerService::create(db, request).await.unwrap()
}
