// ============================================================================
// SERVICE : LOT TRANSFER / SPLIT / MERGE
// ============================================================================
//
// Allowed moves:
//   EGG_TRAY -> TANK : EGGS -> FRY
//   TANK     -> TANK : stage kept (FRY, JUVENILE)
//   TANK     -> CAGE : FRY | JUVENILE -> GROW_OUT
//   CAGE     -> CAGE : GROW_OUT kept
//
// Outcomes:
//   - MERGE    : destination already holds an active lot of the target
//                stage; fish join it with head-count weighted weight/size
//   - TRANSFER : whole lot moves, relabelled in place
//   - SPLIT    : part of the lot moves as a new lot with a new code
//
// Notes:
//   - Capacity (biomass and head count) is checked against the
//     destination's remaining room before anything is written; unweighed
//     lots count as 0 kg, so the head count is what bounds them
//   - One transaction; a rejection leaves both units untouched
//
// ============================================================================

use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::lot::{self, LotStage};
use crate::models::movement_history::MovementEvent;
use crate::models::rearing_unit::UnitKind;
use crate::services::calculators::ration::biomass_kg;
use crate::services::lot_service::{HistoryEntry, LotService};
use crate::services::now;
use crate::services::sequence_service::{CodeKind, SequenceService};
use crate::services::unit_service::{remaining_capacity, UnitService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferKind {
    Transfer,
    Split,
    Merge,
}

#[derive(Debug, Serialize)]
pub struct TransferOutcome {
    pub kind: TransferKind,
    /// The source lot after the move (retired when emptied by a merge)
    pub source: lot::Model,
    /// The lot now holding the moved fish in the destination
    pub destination: lot::Model,
}

pub struct TransferService;

impl TransferService {
    /// Stage the fish will have in a unit of `destination` kind
    pub fn target_stage(source: UnitKind, destination: UnitKind, stage: LotStage) -> AppResult<LotStage> {
        match (source, destination, stage) {
            (UnitKind::EggTray, UnitKind::Tank, LotStage::Eggs) => Ok(LotStage::Fry),
            (UnitKind::Tank, UnitKind::Tank, LotStage::Fry | LotStage::Juvenile) => Ok(stage),
            (UnitKind::Tank, UnitKind::Cage, LotStage::Fry | LotStage::Juvenile) => Ok(LotStage::GrowOut),
            (UnitKind::Cage, UnitKind::Cage, LotStage::GrowOut) => Ok(stage),
            _ => Err(AppError::validation(format!(
                "A {:?} lot cannot move from {:?} to {:?}",
                stage, source, destination
            ))),
        }
    }

    pub async fn transfer(
        db: &DatabaseConnection,
        lot_id: i32,
        destination_unit_id: i32,
        count: i32,
        user_id: Option<i32>,
    ) -> AppResult<TransferOutcome> {
        let today = now().date();
        let txn = db.begin().await?;

        // 1. Source lot and both units
        let source = LotService::get_active_lot(&txn, lot_id).await?;
        let source_unit_id = source
            .unit_id
            .ok_or_else(|| AppError::validation(format!("Lot {} has no unit", source.code)))?;
        if source_unit_id == destination_unit_id {
            return Err(AppError::validation("Destination is the unit the lot is already in"));
        }
        let source_unit = UnitService::get_unit(&txn, source_unit_id).await?;
        let destination_unit = UnitService::get_unit(&txn, destination_unit_id).await?;

        let stage = Self::target_stage(source_unit.kind, destination_unit.kind, source.stage)?;

        // 2. Quantity
        if count <= 0 || count > source.head_count {
            return Err(AppError::validation(format!(
                "Quantity to move must be between 1 and {}",
                source.head_count
            )));
        }

        // 3. Destination capacity
        let residents = UnitService::resident_lots(&txn, destination_unit.id).await?;
        let (room_kg, room_heads) = remaining_capacity(&destination_unit, &residents);
        let moved_kg = biomass_kg(count, source.avg_weight_g);
        if moved_kg > room_kg + 1e-9 {
            return Err(AppError::validation(format!(
                "{} has room for {:.2} kg, {:.2} kg requested",
                destination_unit.code, room_kg.max(0.0), moved_kg
            )));
        }
        match room_heads {
            Some(room_heads) if count > room_heads => {
                return Err(AppError::validation(format!(
                    "{} has room for {} fish, {} requested",
                    destination_unit.code, room_heads.max(0), count
                )));
            }
            Some(_) => {}
            // unweighed fish only fit where a head count is declared
            None if source.avg_weight_g.is_none() => {
                return Err(AppError::validation(format!(
                    "{} declares no head-count capacity; weigh lot {} before moving it",
                    destination_unit.code, source.code
                )));
            }
            None => {}
        }

        let merge_target = residents.into_iter().find(|l| l.stage == stage);
        let full_move = count == source.head_count;

        // 4. Apply
        let outcome = match merge_target {
            Some(target) => {
                let (weight, size_min, size_max) = merged_measurements(&target, &source, count)?;
                let mut target = target;
                target.head_count += count;
                target.avg_weight_g = Some(weight);
                target.size_min_cm = size_min;
                target.size_max_cm = size_max;
                let destination = LotService::save_lot(&txn, target).await?;

                let mut remaining = source;
                remaining.head_count -= count;
                let source = LotService::save_lot(&txn, remaining).await?;

                let description = format!(
                    "{} fish merged from {} ({}) into {} ({})",
                    count, source.code, source_unit.code, destination.code, destination_unit.code
                );
                for lot_id in [source.id, destination.id] {
                    LotService::record_history(
                        &txn,
                        lot_id,
                        user_id,
                        HistoryEntry {
                            event: MovementEvent::Merge,
                            from_unit_id: Some(source_unit.id),
                            to_unit_id: Some(destination_unit.id),
                            head_count: count,
                            description: description.clone(),
                        },
                    )
                    .await?;
                }

                TransferOutcome { kind: TransferKind::Merge, source, destination }
            }
            None if full_move => {
                let mut moved = source;
                moved.unit_id = Some(destination_unit.id);
                if moved.stage != stage {
                    moved.stage = stage;
                    LotService::snapshot_stage_entry(&mut moved, today);
                }
                let moved = LotService::save_lot(&txn, moved).await?;

                LotService::record_history(
                    &txn,
                    moved.id,
                    user_id,
                    HistoryEntry {
                        event: MovementEvent::Transfer,
                        from_unit_id: Some(source_unit.id),
                        to_unit_id: Some(destination_unit.id),
                        head_count: count,
                        description: format!(
                            "Moved from {} to {} as {:?}",
                            source_unit.code, destination_unit.code, stage
                        ),
                    },
                )
                .await?;

                TransferOutcome {
                    kind: TransferKind::Transfer,
                    source: moved.clone(),
                    destination: moved,
                }
            }
            None => {
                let code = SequenceService::next_code(&txn, CodeKind::Lot, today).await?;
                let stage_entered_on = if stage == source.stage { source.stage_entered_on } else { today };

                let created = lot::ActiveModel {
                    code: Set(code),
                    stage: Set(stage),
                    head_count: Set(count),
                    initial_head_count: Set(count),
                    initial_avg_weight_g: Set(source.avg_weight_g),
                    avg_weight_g: Set(source.avg_weight_g),
                    size_min_cm: Set(source.size_min_cm),
                    size_max_cm: Set(source.size_max_cm),
                    stage_entered_on: Set(stage_entered_on),
                    unit_id: Set(Some(destination_unit.id)),
                    daily_feed_kg: Set(0.0),
                    feed_type: Set(source.feed_type),
                    is_active: Set(true),
                    created_at: Set(now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                let destination = LotService::save_lot(&txn, created).await?;

                let mut remaining = source;
                remaining.head_count -= count;
                let source = LotService::save_lot(&txn, remaining).await?;

                let description = format!(
                    "{} fish split from {} ({}) into new lot {} ({})",
                    count, source.code, source_unit.code, destination.code, destination_unit.code
                );
                for lot_id in [source.id, destination.id] {
                    LotService::record_history(
                        &txn,
                        lot_id,
                        user_id,
                        HistoryEntry {
                            event: MovementEvent::Split,
                            from_unit_id: Some(source_unit.id),
                            to_unit_id: Some(destination_unit.id),
                            head_count: count,
                            description: description.clone(),
                        },
                    )
                    .await?;
                }

                TransferOutcome { kind: TransferKind::Split, source, destination }
            }
        };

        // 5. Availability of both units
        UnitService::refresh_availability(&txn, source_unit.id).await?;
        UnitService::refresh_availability(&txn, destination_unit.id).await?;

        txn.commit().await?;

        info!(
            "🔀 {:?}: {} fish {} -> {}",
            outcome.kind, count, source_unit.code, destination_unit.code
        );
        Ok(outcome)
    }
}

/// Head-count weighted (weight, size_min, size_max) after `count` fish of
/// `incoming` join `target`. Both lots need a known weight.
fn merged_measurements(
    target: &lot::Model,
    incoming: &lot::Model,
    count: i32,
) -> AppResult<(f64, Option<f64>, Option<f64>)> {
    let (target_w, incoming_w) = match (target.avg_weight_g, incoming.avg_weight_g) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(AppError::validation(format!(
                "Merging {} into {} needs an average weight on both lots",
                incoming.code, target.code
            )))
        }
    };

    let a = target.head_count as f64;
    let b = count as f64;
    let weighted = |x: f64, y: f64| (x * a + y * b) / (a + b);
    let merge = |x: Option<f64>, y: Option<f64>| match (x, y) {
        (Some(x), Some(y)) => Some(weighted(x, y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    };

    Ok((
        weighted(target_w, incoming_w),
        merge(target.size_min_cm, incoming.size_min_cm),
        merge(target.size_max_cm, incoming.size_max_cm),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::movement_history;
    use crate::models::rearing_unit;
    use sea_orm::sea_query::Expr;
    use crate::services::test_support::{cage, egg_tray, reload_lot, stocked_lot, tank, unit};

    #[tokio::test]
    async fn test_partial_transfer_splits_lot() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        let empty_tank = tank(&db, 100.0).await;
        let lot = stocked_lot(&db, source_tank.id, LotStage::Fry, 1000, Some(50.0)).await;

        let outcome = TransferService::transfer(&db, lot.id, empty_tank.id, 400, Some(1))
            .await
            .unwrap();

        assert_eq!(outcome.kind, TransferKind::Split);
        assert_eq!(outcome.source.head_count, 600);
        assert_eq!(outcome.destination.head_count, 400);
        assert_ne!(outcome.destination.code, outcome.source.code);
        assert_eq!(outcome.destination.avg_weight_g, Some(50.0));
        assert_eq!(outcome.destination.unit_id, Some(empty_tank.id));

        let source_kg = biomass_kg(outcome.source.head_count, outcome.source.avg_weight_g);
        let moved_kg = biomass_kg(outcome.destination.head_count, outcome.destination.avg_weight_g);
        assert_eq!(source_kg, 30.0);
        assert_eq!(moved_kg, 20.0);

        let history = movement_history::Entity::find()
            .filter(movement_history::Column::Event.eq(MovementEvent::Split))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(history, 2);
    }

    #[tokio::test]
    async fn test_over_capacity_rejected_without_changes() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        let small_tank = tank(&db, 10.0).await;
        let lot = stocked_lot(&db, source_tank.id, LotStage::Fry, 1000, Some(50.0)).await;

        // 400 x 50 g = 20 kg > 10 kg
        let result = TransferService::transfer(&db, lot.id, small_tank.id, 400, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let unchanged = reload_lot(&db, lot.id).await;
        assert_eq!(unchanged.head_count, 1000);
        assert_eq!(unchanged.unit_id, Some(source_tank.id));
        assert!(UnitService::resident_lots(&db, small_tank.id).await.unwrap().is_empty());
        assert!(UnitService::get_unit(&db, small_tank.id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_merge_uses_weighted_average() {
        let db = db::test_connection().await;
        let tank_a = tank(&db, 250.0).await;
        let tank_b = tank(&db, 250.0).await;
        let moving = stocked_lot(&db, tank_a.id, LotStage::Fry, 400, Some(60.0)).await;
        let resident = stocked_lot(&db, tank_b.id, LotStage::Fry, 600, Some(50.0)).await;

        let outcome = TransferService::transfer(&db, moving.id, tank_b.id, 400, None)
            .await
            .unwrap();

        assert_eq!(outcome.kind, TransferKind::Merge);
        assert_eq!(outcome.destination.id, resident.id);
        assert_eq!(outcome.destination.head_count, 1000);
        // (600 x 50 + 400 x 60) / 1000 = 54
        let weight = outcome.destination.avg_weight_g.unwrap();
        assert!((weight - 54.0).abs() < 1e-9);
        assert!(weight > 50.0 && weight < 60.0);

        assert!(!outcome.source.is_active);
        assert_eq!(outcome.source.head_count, 0);
        assert_eq!(outcome.source.unit_id, None);
        assert!(UnitService::get_unit(&db, tank_a.id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_merge_requires_weights() {
        let db = db::test_connection().await;
        let tank_a = tank(&db, 250.0).await;
        let tank_b = tank(&db, 250.0).await;
        let moving = stocked_lot(&db, tank_a.id, LotStage::Fry, 100, None).await;
        stocked_lot(&db, tank_b.id, LotStage::Fry, 100, Some(20.0)).await;

        let result = TransferService::transfer(&db, moving.id, tank_b.id, 50, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(reload_lot(&db, moving.id).await.head_count, 100);
    }

    #[tokio::test]
    async fn test_full_move_to_cage_relabels_in_place() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        let grow_cage = cage(&db, 1500.0).await;
        let lot = stocked_lot(&db, source_tank.id, LotStage::Juvenile, 500, Some(80.0)).await;

        let outcome = TransferService::transfer(&db, lot.id, grow_cage.id, 500, None)
            .await
            .unwrap();

        assert_eq!(outcome.kind, TransferKind::Transfer);
        assert_eq!(outcome.destination.id, lot.id);
        assert_eq!(outcome.destination.code, lot.code);
        assert_eq!(outcome.destination.stage, LotStage::GrowOut);
        assert_eq!(outcome.destination.initial_head_count, 500);
        assert_eq!(outcome.destination.initial_avg_weight_g, Some(80.0));
        assert!(UnitService::get_unit(&db, source_tank.id).await.unwrap().is_available);
        assert!(!UnitService::get_unit(&db, grow_cage.id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_unweighed_lot_bounded_by_head_capacity() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        // 1 kg and 200 fish, already holding 100 x 10 g
        let tiny = unit(&db, UnitKind::Tank, 0.04, 25.0, 200).await;
        stocked_lot(&db, tiny.id, LotStage::Juvenile, 100, Some(10.0)).await;
        let fry = stocked_lot(&db, source_tank.id, LotStage::Fry, 50_000, None).await;

        let result = TransferService::transfer(&db, fry.id, tiny.id, 50_000, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let unchanged = reload_lot(&db, fry.id).await;
        assert_eq!(unchanged.head_count, 50_000);
        assert_eq!(unchanged.unit_id, Some(source_tank.id));

        // the remaining 100 places still take unweighed fish
        let outcome = TransferService::transfer(&db, fry.id, tiny.id, 100, None)
            .await
            .unwrap();
        assert_eq!(outcome.kind, TransferKind::Split);
    }

    #[tokio::test]
    async fn test_unweighed_lot_rejected_without_head_capacity() {
        let db = db::test_connection().await;
        let source_tank = tank(&db, 250.0).await;
        let legacy = tank(&db, 100.0).await;
        rearing_unit::Entity::update_many()
            .col_expr(rearing_unit::Column::MaxHeadCount, Expr::value(Option::<i32>::None))
            .filter(rearing_unit::Column::Id.eq(legacy.id))
            .exec(&db)
            .await
            .unwrap();
        let fry = stocked_lot(&db, source_tank.id, LotStage::Fry, 1000, None).await;

        let result = TransferService::transfer(&db, fry.id, legacy.id, 1000, None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(UnitService::resident_lots(&db, legacy.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eggs_move_to_tank_as_fry() {
        let db = db::test_connection().await;
        let tray = egg_tray(&db, 5000).await;
        let nursery = tank(&db, 100.0).await;
        let eggs = LotService::create_egg_lot(&db, tray.id, 3000, None).await.unwrap();

        let outcome = TransferService::transfer(&db, eggs.id, nursery.id, 3000, None)
            .await
            .unwrap();

        assert_eq!(outcome.destination.stage, LotStage::Fry);
        assert_eq!(outcome.destination.unit_id, Some(nursery.id));
        assert!(UnitService::get_unit(&db, tray.id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_disallowed_moves() {
        let db = db::test_connection().await;
        let grow_cage = cage(&db, 1500.0).await;
        let other_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, grow_cage.id, LotStage::GrowOut, 100, Some(200.0)).await;

        let back_to_tank = TransferService::transfer(&db, lot.id, other_tank.id, 10, None).await;
        assert!(back_to_tank.is_err());

        let same_unit = TransferService::transfer(&db, lot.id, grow_cage.id, 10, None).await;
        assert!(same_unit.is_err());

        let too_many = TransferService::transfer(&db, lot.id, other_tank.id, 101, None).await;
        assert!(too_many.is_err());

        assert!(TransferService::target_stage(UnitKind::Tank, UnitKind::EggTray, LotStage::Fry).is_err());
    }
}
