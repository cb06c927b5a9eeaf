// ============================================================================
// SERVICE : REARING UNITS
// ============================================================================
//
// Description:
//   CRUD over egg trays, tanks and cages plus the occupancy queries the
//   lot and transfer services rely on.
//
// Notes:
//   - max_biomass_kg is always recomputed from geometry x density
//   - is_available is refreshed by whoever moves lots in or out
//   - A unit holding an active lot cannot be deleted
//
// ============================================================================

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::dto::{CreateUnitsRequest, UpdateUnitRequest};
use crate::models::rearing_unit::{self, UnitKind, UnitShape};
use crate::models::{daily_record, lot};
use crate::services::calculators::geometry::{self, Dimensions};
use crate::services::calculators::ration::biomass_kg;
use crate::services::calculators::{round2, LotMetrics};
use crate::services::sequence_service::{CodeKind, SequenceService};
use crate::services::transfer_service::TransferService;
use crate::services::{lot_service::LotService, now};

/// A unit with its resident lots and what is left of its capacity
#[derive(Debug, Serialize)]
pub struct UnitOverview {
    #[serde(flatten)]
    pub unit: rearing_unit::Model,
    pub lots: Vec<lot::Model>,
    pub head_count: i32,
    pub biomass_kg: f64,
    pub remaining_biomass_kg: f64,
    pub remaining_head_count: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ResidentLot {
    #[serde(flatten)]
    pub lot: lot::Model,
    pub days_in_stage: i64,
    pub metrics: LotMetrics,
    pub today: daily_record::Model,
}

#[derive(Debug, Serialize)]
pub struct UnitDetail {
    #[serde(flatten)]
    pub unit: rearing_unit::Model,
    pub lots: Vec<ResidentLot>,
    pub biomass_kg: f64,
    pub daily_feed_kg: f64,
}

/// Validated shape + capacity of a unit
struct Capacity {
    shape: Option<UnitShape>,
    dims: Dimensions,
    density: Option<f64>,
    max_head_count: Option<i32>,
    max_biomass_kg: f64,
}

pub struct UnitService;

impl UnitService {
    /// Creates `quantity` identical units, each with its own code
    pub async fn create_units(
        db: &DatabaseConnection,
        config: &AppConfig,
        request: CreateUnitsRequest,
    ) -> AppResult<Vec<rearing_unit::Model>> {
        let dims = Dimensions {
            length_m: request.length_m,
            width_m: request.width_m,
            diameter_m: request.diameter_m,
            height_m: request.height_m,
        };
        let capacity = Self::capacity(
            config,
            request.kind,
            request.shape,
            dims,
            request.stocking_density_kg_m3,
            request.max_head_count,
        )?;

        let today = now().date();
        let txn = db.begin().await?;
        let mut created = Vec::with_capacity(request.quantity as usize);

        for _ in 0..request.quantity {
            let code = SequenceService::next_code(&txn, CodeKind::Unit(request.kind), today).await?;

            let unit = rearing_unit::ActiveModel {
                code: Set(code),
                kind: Set(request.kind),
                shape: Set(capacity.shape),
                length_m: Set(capacity.dims.length_m),
                width_m: Set(capacity.dims.width_m),
                diameter_m: Set(capacity.dims.diameter_m),
                height_m: Set(capacity.dims.height_m),
                stocking_density_kg_m3: Set(capacity.density),
                max_head_count: Set(capacity.max_head_count),
                max_biomass_kg: Set(capacity.max_biomass_kg),
                is_available: Set(true),
                created_at: Set(now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            created.push(unit);
        }

        txn.commit().await?;

        info!("✅ Created {} {:?} unit(s)", created.len(), request.kind);
        Ok(created)
    }

    /// Updates geometry / density / head-count capacity and recomputes max biomass
    pub async fn update_unit(
        db: &DatabaseConnection,
        config: &AppConfig,
        unit_id: i32,
        request: UpdateUnitRequest,
    ) -> AppResult<rearing_unit::Model> {
        let unit = Self::get_unit(db, unit_id).await?;

        let dims = Dimensions {
            length_m: request.length_m.or(unit.length_m),
            width_m: request.width_m.or(unit.width_m),
            diameter_m: request.diameter_m.or(unit.diameter_m),
            height_m: request.height_m.or(unit.height_m),
        };
        let capacity = Self::capacity(
            config,
            unit.kind,
            request.shape.or(unit.shape),
            dims,
            request.stocking_density_kg_m3.or(unit.stocking_density_kg_m3),
            request.max_head_count.or(unit.max_head_count),
        )?;

        let mut active: rearing_unit::ActiveModel = unit.into();
        active.shape = Set(capacity.shape);
        active.length_m = Set(capacity.dims.length_m);
        active.width_m = Set(capacity.dims.width_m);
        active.diameter_m = Set(capacity.dims.diameter_m);
        active.height_m = Set(capacity.dims.height_m);
        active.stocking_density_kg_m3 = Set(capacity.density);
        active.max_head_count = Set(capacity.max_head_count);
        active.max_biomass_kg = Set(capacity.max_biomass_kg);

        Ok(active.update(db).await?)
    }

    pub async fn delete_unit(db: &DatabaseConnection, unit_id: i32) -> AppResult<()> {
        let unit = Self::get_unit(db, unit_id).await?;

        let residents = Self::resident_lots(db, unit.id).await?;
        if !residents.is_empty() {
            return Err(AppError::Conflict(format!(
                "Unit {} still holds {} active lot(s)",
                unit.code,
                residents.len()
            )));
        }

        rearing_unit::Entity::delete_by_id(unit.id).exec(db).await?;
        info!("🗑️  Deleted unit {}", unit.code);
        Ok(())
    }

    pub async fn get_unit<C: ConnectionTrait>(conn: &C, unit_id: i32) -> AppResult<rearing_unit::Model> {
        rearing_unit::Entity::find_by_id(unit_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Unit", unit_id))
    }

    /// Units (optionally of one kind) with their resident lots
    pub async fn list_units(
        db: &DatabaseConnection,
        kind: Option<UnitKind>,
    ) -> AppResult<Vec<UnitOverview>> {
        let mut query = rearing_unit::Entity::find().order_by_asc(rearing_unit::Column::Code);
        if let Some(kind) = kind {
            query = query.filter(rearing_unit::Column::Kind.eq(kind));
        }
        let units = query.all(db).await?;

        let unit_ids: Vec<i32> = units.iter().map(|u| u.id).collect();
        let lots = lot::Entity::find()
            .filter(lot::Column::IsActive.eq(true))
            .filter(lot::Column::UnitId.is_in(unit_ids))
            .order_by_asc(lot::Column::Code)
            .all(db)
            .await?;

        Ok(units
            .into_iter()
            .map(|unit| {
                let residents: Vec<lot::Model> = lots
                    .iter()
                    .filter(|l| l.unit_id == Some(unit.id))
                    .cloned()
                    .collect();
                Self::overview(unit, residents)
            })
            .collect())
    }

    /// Tanks/cages a lot may be moved to right now, with room for the whole lot
    pub async fn available_destinations(
        db: &DatabaseConnection,
        lot_id: i32,
    ) -> AppResult<Vec<UnitOverview>> {
        let lot = LotService::get_active_lot(db, lot_id).await?;
        let source_id = lot
            .unit_id
            .ok_or_else(|| AppError::validation(format!("Lot {} has no unit", lot.code)))?;
        let source = Self::get_unit(db, source_id).await?;

        let lot_biomass = LotMetrics::for_lot(&lot, now().date()).biomass_kg;
        let mut destinations = Vec::new();

        for candidate in Self::list_units(db, None).await? {
            if candidate.unit.id == source.id || candidate.unit.kind == UnitKind::EggTray {
                continue;
            }
            if TransferService::target_stage(source.kind, candidate.unit.kind, lot.stage).is_err() {
                continue;
            }
            let heads_fit = candidate
                .remaining_head_count
                .map_or(lot.avg_weight_g.is_some(), |left| lot.head_count <= left);
            if lot_biomass <= candidate.remaining_biomass_kg && heads_fit {
                destinations.push(candidate);
            }
        }

        Ok(destinations)
    }

    /// Unit with resident lots; today's daily record is created when missing
    pub async fn unit_detail(db: &DatabaseConnection, unit_id: i32) -> AppResult<UnitDetail> {
        let unit = Self::get_unit(db, unit_id).await?;
        let today = now().date();

        let mut lots = Vec::new();
        for lot in Self::resident_lots(db, unit.id).await? {
            let record = LotService::daily_record(db, lot.id, today).await?;
            let metrics = LotMetrics::for_lot(&lot, today);
            lots.push(ResidentLot {
                days_in_stage: (today - lot.stage_entered_on).num_days(),
                metrics,
                today: record,
                lot,
            });
        }

        let biomass_kg = round2(lots.iter().map(|l| l.metrics.biomass_kg).sum());
        let daily_feed_kg = round2(lots.iter().map(|l| l.metrics.daily_feed_kg).sum());

        Ok(UnitDetail {
            unit,
            lots,
            biomass_kg,
            daily_feed_kg,
        })
    }

    pub async fn resident_lots<C: ConnectionTrait>(conn: &C, unit_id: i32) -> Result<Vec<lot::Model>, DbErr> {
        lot::Entity::find()
            .filter(lot::Column::UnitId.eq(unit_id))
            .filter(lot::Column::IsActive.eq(true))
            .order_by_asc(lot::Column::Id)
            .all(conn)
            .await
    }

    /// is_available = no active lot in the unit
    pub async fn refresh_availability<C: ConnectionTrait>(conn: &C, unit_id: i32) -> Result<(), DbErr> {
        let occupied = lot::Entity::find()
            .filter(lot::Column::UnitId.eq(unit_id))
            .filter(lot::Column::IsActive.eq(true))
            .count(conn)
            .await?
            > 0;

        rearing_unit::Entity::update_many()
            .col_expr(rearing_unit::Column::IsAvailable, Expr::value(!occupied))
            .filter(rearing_unit::Column::Id.eq(unit_id))
            .exec(conn)
            .await?;
        Ok(())
    }

    pub fn overview(unit: rearing_unit::Model, lots: Vec<lot::Model>) -> UnitOverview {
        let head_count: i32 = lots.iter().map(|l| l.head_count).sum();
        let biomass_kg = round2(
            lots.iter()
                .map(|l| biomass_kg(l.head_count, l.avg_weight_g))
                .sum(),
        );
        let (remaining_biomass_kg, remaining_head_count) = remaining_capacity(&unit, &lots);

        UnitOverview {
            unit,
            lots,
            head_count,
            biomass_kg,
            remaining_biomass_kg,
            remaining_head_count,
        }
    }

    fn capacity(
        config: &AppConfig,
        kind: UnitKind,
        shape: Option<UnitShape>,
        dims: Dimensions,
        density: Option<f64>,
        max_head_count: Option<i32>,
    ) -> AppResult<Capacity> {
        // every unit declares how many fish it can hold
        let max_head_count = match max_head_count {
            Some(max) if max > 0 => max,
            Some(_) => return Err(AppError::validation("max_head_count must be positive")),
            None => return Err(AppError::validation(format!("{:?} units need a max_head_count", kind))),
        };

        if kind == UnitKind::EggTray {
            return Ok(Capacity {
                shape: None,
                dims: Dimensions::default(),
                density: None,
                max_head_count: Some(max_head_count),
                max_biomass_kg: 0.0,
            });
        }

        let shape = shape.ok_or_else(|| AppError::validation("Tanks and cages need a shape"))?;
        let volume = geometry::volume_m3(shape, &dims).ok_or_else(|| {
            AppError::validation(match shape {
                UnitShape::Rectangular => "Rectangular units need length, width and height",
                UnitShape::Circular => "Circular units need diameter and height",
            })
        })?;

        let density = match density {
            Some(d) if d > 0.0 => d,
            Some(_) => return Err(AppError::validation("Stocking density must be positive")),
            None if kind == UnitKind::Cage => config.cage_density_kg_m3,
            None => config.tank_density_kg_m3,
        };

        // keep only the dimensions the shape uses
        let dims = match shape {
            UnitShape::Rectangular => Dimensions { diameter_m: None, ..dims },
            UnitShape::Circular => Dimensions { length_m: None, width_m: None, ..dims },
        };

        Ok(Capacity {
            shape: Some(shape),
            dims,
            density: Some(density),
            max_head_count: Some(max_head_count),
            max_biomass_kg: geometry::max_biomass_kg(volume, density),
        })
    }
}

/// (remaining biomass kg, remaining head count when the unit declares one)
pub fn remaining_capacity(unit: &rearing_unit::Model, residents: &[lot::Model]) -> (f64, Option<i32>) {
    let used_biomass: f64 = residents
        .iter()
        .map(|l| biomass_kg(l.head_count, l.avg_weight_g))
        .sum();
    let used_heads: i32 = residents.iter().map(|l| l.head_count).sum();

    (
        round2(unit.max_biomass_kg - used_biomass),
        unit.max_head_count.map(|max| max - used_heads),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::lot::LotStage;
    use crate::services::test_support::{cage, egg_tray, stocked_lot, tank, units_request};

    #[tokio::test]
    async fn test_create_several_units_with_codes() {
        let db = db::test_connection().await;
        let request = CreateUnitsRequest {
            quantity: 3,
            shape: Some(UnitShape::Circular),
            diameter_m: Some(2.0),
            height_m: Some(1.0),
            ..units_request(UnitKind::Cage)
        };

        let cages = UnitService::create_units(&db, &AppConfig::for_tests(), request)
            .await
            .unwrap();

        assert_eq!(cages.len(), 3);
        assert!(cages.iter().all(|c| c.code.starts_with('J')));
        assert!(cages[0].code.ends_with("-01"));
        assert!(cages[2].code.ends_with("-03"));
        // pi x 1 x 1 x 15 kg/m3 (default cage density)
        assert_eq!(cages[0].max_biomass_kg, 47.12);
        assert_eq!(cages[0].stocking_density_kg_m3, Some(15.0));
    }

    #[tokio::test]
    async fn test_invalid_geometry_rejected() {
        let db = db::test_connection().await;
        let missing_width = CreateUnitsRequest {
            shape: Some(UnitShape::Rectangular),
            length_m: Some(3.0),
            height_m: Some(1.0),
            ..units_request(UnitKind::Tank)
        };
        let result = UnitService::create_units(&db, &AppConfig::for_tests(), missing_width).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let tray_without_capacity = CreateUnitsRequest {
            max_head_count: None,
            ..units_request(UnitKind::EggTray)
        };
        let result = UnitService::create_units(&db, &AppConfig::for_tests(), tray_without_capacity).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let tank_without_head_capacity = CreateUnitsRequest {
            shape: Some(UnitShape::Rectangular),
            length_m: Some(3.0),
            width_m: Some(1.0),
            height_m: Some(1.0),
            max_head_count: None,
            ..units_request(UnitKind::Tank)
        };
        let result = UnitService::create_units(&db, &AppConfig::for_tests(), tank_without_head_capacity).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_recomputes_capacity() {
        let db = db::test_connection().await;
        let unit = tank(&db, 100.0).await;

        let request = UpdateUnitRequest {
            stocking_density_kg_m3: Some(50.0),
            ..Default::default()
        };
        let updated = UnitService::update_unit(&db, &AppConfig::for_tests(), unit.id, request)
            .await
            .unwrap();

        assert_eq!(updated.max_biomass_kg, 200.0);
    }

    #[tokio::test]
    async fn test_delete_occupied_unit_rejected() {
        let db = db::test_connection().await;
        let occupied = tank(&db, 100.0).await;
        let empty = tank(&db, 100.0).await;
        stocked_lot(&db, occupied.id, LotStage::Fry, 100, Some(10.0)).await;

        let result = UnitService::delete_unit(&db, occupied.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        UnitService::delete_unit(&db, empty.id).await.unwrap();
        assert!(UnitService::get_unit(&db, empty.id).await.is_err());
    }

    #[tokio::test]
    async fn test_available_destinations() {
        let db = db::test_connection().await;
        let source = tank(&db, 250.0).await;
        let roomy = tank(&db, 100.0).await;
        let cramped = tank(&db, 10.0).await;
        let grow_cage = cage(&db, 1500.0).await;
        egg_tray(&db, 1000).await;
        let lot = stocked_lot(&db, source.id, LotStage::Fry, 1000, Some(50.0)).await;

        let destinations = UnitService::available_destinations(&db, lot.id).await.unwrap();
        let ids: Vec<i32> = destinations.iter().map(|d| d.unit.id).collect();

        assert!(ids.contains(&roomy.id));
        assert!(ids.contains(&grow_cage.id));
        assert!(!ids.contains(&cramped.id));
        assert!(!ids.contains(&source.id));
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_unit_feed_includes_egg_placeholder() {
        let db = db::test_connection().await;
        let tray = egg_tray(&db, 50_000).await;
        let eggs = LotService::create_egg_lot(&db, tray.id, 50_000, None).await.unwrap();
        lot::Entity::update_many()
            .col_expr(
                lot::Column::StageEnteredOn,
                Expr::value(now().date() - chrono::Duration::days(20)),
            )
            .filter(lot::Column::Id.eq(eggs.id))
            .exec(&db)
            .await
            .unwrap();

        let detail = UnitService::unit_detail(&db, tray.id).await.unwrap();

        // 50 000 eggs x 0.01 g placeholder
        assert_eq!(detail.lots[0].metrics.daily_feed_kg, 0.5);
        assert_eq!(detail.daily_feed_kg, 0.5);
    }

    #[tokio::test]
    async fn test_unit_detail_creates_daily_record() {
        let db = db::test_connection().await;
        let unit = tank(&db, 250.0).await;
        stocked_lot(&db, unit.id, LotStage::Fry, 1000, Some(50.0)).await;
        stocked_lot(&db, unit.id, LotStage::Juvenile, 500, Some(20.0)).await;

        let detail = UnitService::unit_detail(&db, unit.id).await.unwrap();

        assert_eq!(detail.lots.len(), 2);
        assert_eq!(detail.biomass_kg, 60.0);
        assert!(detail.lots.iter().all(|l| !l.today.fed));

        let overview = UnitService::list_units(&db, Some(UnitKind::Tank)).await.unwrap();
        assert_eq!(overview[0].remaining_biomass_kg, 190.0);
        assert_eq!(overview[0].head_count, 1500);
    }
}
