// ============================================================================
// SERVICE : LOTS
// ============================================================================
//
// Description:
//   Life cycle of a lot inside its unit: egg lot creation, mortality,
//   measurements, daily tasks, FRY -> JUVENILE advance, history and
//   performance. Moves between units live in transfer_service.
//
// Notes:
//   - Every write that touches head count or weight goes through save_lot,
//     which recomputes the ration and retires the lot at head count 0
//   - Each operation is one transaction and appends to movement_history
//
// ============================================================================

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::DailyTask;
use crate::models::lot::{self, FeedType, LotStage};
use crate::models::movement_history::{self, MovementEvent};
use crate::models::rearing_unit::UnitKind;
use crate::models::{daily_record, feeding, mortality_record};
use crate::services::calculators::ration::{self, biomass_kg};
use crate::services::calculators::{round2, LotMetrics};
use crate::services::now;
use crate::services::sequence_service::{CodeKind, SequenceService};
use crate::services::unit_service::UnitService;

#[derive(Debug, Serialize)]
pub struct LotPerformance {
    pub lot_id: i32,
    pub code: String,
    pub stage: LotStage,
    pub days_in_stage: i64,
    pub initial_biomass_kg: f64,
    pub current_biomass_kg: f64,
    pub biomass_gain_kg: f64,
    pub feed_consumed_kg: f64,
    pub fcr: Option<f64>,
    pub survival_pct: f64,
    pub metrics: LotMetrics,
}

/// Fields written by one history entry
pub struct HistoryEntry {
    pub event: MovementEvent,
    pub from_unit_id: Option<i32>,
    pub to_unit_id: Option<i32>,
    pub head_count: i32,
    pub description: String,
}

pub struct LotService;

impl LotService {
    /// New EGGS lot in an empty egg tray
    pub async fn create_egg_lot(
        db: &DatabaseConnection,
        unit_id: i32,
        head_count: i32,
        user_id: Option<i32>,
    ) -> AppResult<lot::Model> {
        let today = now().date();
        let txn = db.begin().await?;

        // 1. The tray: right kind, empty, big enough
        let tray = UnitService::get_unit(&txn, unit_id).await?;
        if tray.kind != UnitKind::EggTray {
            return Err(AppError::validation(format!("{} is not an egg tray", tray.code)));
        }
        if head_count <= 0 {
            return Err(AppError::validation("Egg count must be greater than zero"));
        }
        if let Some(max) = tray.max_head_count {
            if head_count > max {
                return Err(AppError::validation(format!(
                    "{} holds at most {} eggs",
                    tray.code, max
                )));
            }
        }
        if !UnitService::resident_lots(&txn, tray.id).await?.is_empty() {
            return Err(AppError::Conflict(format!("{} already holds a lot", tray.code)));
        }

        // 2. The lot
        let code = SequenceService::next_code(&txn, CodeKind::Lot, today).await?;
        let created = lot::ActiveModel {
            code: Set(code),
            stage: Set(LotStage::Eggs),
            head_count: Set(head_count),
            initial_head_count: Set(head_count),
            initial_avg_weight_g: Set(None),
            avg_weight_g: Set(None),
            size_min_cm: Set(None),
            size_max_cm: Set(None),
            stage_entered_on: Set(today),
            unit_id: Set(Some(tray.id)),
            daily_feed_kg: Set(0.0),
            feed_type: Set(FeedType::Indeterminate),
            is_active: Set(true),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // 3. History + availability
        Self::record_history(
            &txn,
            created.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::Created,
                from_unit_id: None,
                to_unit_id: Some(tray.id),
                head_count,
                description: format!("Lot created in {} with {} eggs", tray.code, head_count),
            },
        )
        .await?;
        UnitService::refresh_availability(&txn, tray.id).await?;

        txn.commit().await?;

        info!("🐟 Lot {} created in {}", created.code, tray.code);
        Ok(created)
    }

    pub async fn record_mortality(
        db: &DatabaseConnection,
        lot_id: i32,
        count: i32,
        notes: Option<String>,
        user_id: Option<i32>,
    ) -> AppResult<lot::Model> {
        let txn = db.begin().await?;
        let lot = Self::get_active_lot(&txn, lot_id).await?;

        if count <= 0 || count > lot.head_count {
            return Err(AppError::validation(format!(
                "Mortality must be between 1 and {}",
                lot.head_count
            )));
        }

        // 1. Immutable record
        mortality_record::ActiveModel {
            lot_id: Set(lot.id),
            date: Set(now().date()),
            count: Set(count),
            notes: Set(notes),
            user_id: Set(user_id),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // 2. head_count = head_count - n, guarded so it never goes below zero
        let result = lot::Entity::update_many()
            .col_expr(lot::Column::HeadCount, Expr::col(lot::Column::HeadCount).sub(count))
            .filter(lot::Column::Id.eq(lot.id))
            .filter(lot::Column::HeadCount.gte(count))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Lot {} changed while recording mortality",
                lot.code
            )));
        }

        // 3. Ration / retirement from the fresh row
        let fresh = Self::get_lot(&txn, lot.id).await?;
        let unit_id = fresh.unit_id;
        let saved = Self::save_lot(&txn, fresh).await?;

        Self::record_history(
            &txn,
            saved.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::Mortality,
                from_unit_id: unit_id,
                to_unit_id: None,
                head_count: count,
                description: format!("{} dead, {} remaining", count, saved.head_count),
            },
        )
        .await?;
        if let Some(unit_id) = unit_id {
            UnitService::refresh_availability(&txn, unit_id).await?;
        }

        txn.commit().await?;
        Ok(saved)
    }

    pub async fn set_size(
        db: &DatabaseConnection,
        lot_id: i32,
        size_min_cm: f64,
        size_max_cm: f64,
        user_id: Option<i32>,
    ) -> AppResult<lot::Model> {
        if size_min_cm < 0.0 || size_max_cm < 0.0 {
            return Err(AppError::validation("Sizes cannot be negative"));
        }
        if size_min_cm > size_max_cm {
            return Err(AppError::validation("Minimum size cannot exceed maximum size"));
        }

        let txn = db.begin().await?;
        let mut lot = Self::get_active_lot(&txn, lot_id).await?;
        lot.size_min_cm = Some(size_min_cm);
        lot.size_max_cm = Some(size_max_cm);
        let saved = Self::save_lot(&txn, lot).await?;

        Self::record_history(
            &txn,
            saved.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::Measurement,
                from_unit_id: saved.unit_id,
                to_unit_id: None,
                head_count: saved.head_count,
                description: format!("Size {:.1}-{:.1} cm", size_min_cm, size_max_cm),
            },
        )
        .await?;

        txn.commit().await?;
        Ok(saved)
    }

    pub async fn set_weight(
        db: &DatabaseConnection,
        lot_id: i32,
        avg_weight_g: f64,
        user_id: Option<i32>,
    ) -> AppResult<lot::Model> {
        if avg_weight_g <= 0.0 {
            return Err(AppError::validation("Average weight must be greater than zero"));
        }

        let txn = db.begin().await?;
        let mut lot = Self::get_active_lot(&txn, lot_id).await?;
        lot.avg_weight_g = Some(avg_weight_g);
        let saved = Self::save_lot(&txn, lot).await?;

        Self::record_history(
            &txn,
            saved.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::Measurement,
                from_unit_id: saved.unit_id,
                to_unit_id: None,
                head_count: saved.head_count,
                description: format!("Average weight {:.2} g", avg_weight_g),
            },
        )
        .await?;

        txn.commit().await?;
        Ok(saved)
    }

    /// Flags today's feeding or cleaning as done
    pub async fn mark_task(
        db: &DatabaseConnection,
        lot_id: i32,
        task: DailyTask,
    ) -> AppResult<daily_record::Model> {
        let lot = Self::get_active_lot(db, lot_id).await?;
        let record = Self::daily_record(db, lot.id, now().date()).await?;

        let mut active: daily_record::ActiveModel = record.into();
        match task {
            DailyTask::Feeding => active.fed = Set(true),
            DailyTask::Cleaning => active.cleaned = Set(true),
        }
        Ok(active.update(db).await?)
    }

    /// FRY -> JUVENILE, in place, tanks only
    pub async fn advance_stage(
        db: &DatabaseConnection,
        lot_id: i32,
        user_id: Option<i32>,
    ) -> AppResult<lot::Model> {
        let today = now().date();
        let txn = db.begin().await?;
        let mut lot = Self::get_active_lot(&txn, lot_id).await?;

        if lot.stage != LotStage::Fry {
            return Err(AppError::validation(format!(
                "Only FRY lots can advance in place, {} is {:?}",
                lot.code, lot.stage
            )));
        }
        let unit_id = lot
            .unit_id
            .ok_or_else(|| AppError::validation(format!("Lot {} has no unit", lot.code)))?;
        let unit = UnitService::get_unit(&txn, unit_id).await?;
        if unit.kind != UnitKind::Tank {
            return Err(AppError::validation("Stage advance happens in tanks only"));
        }

        lot.stage = LotStage::Juvenile;
        Self::snapshot_stage_entry(&mut lot, today);
        let saved = Self::save_lot(&txn, lot).await?;

        Self::record_history(
            &txn,
            saved.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::StageCompleted,
                from_unit_id: Some(unit.id),
                to_unit_id: Some(unit.id),
                head_count: saved.head_count,
                description: "FRY stage completed, now JUVENILE".to_string(),
            },
        )
        .await?;

        txn.commit().await?;
        Ok(saved)
    }

    /// Newest first
    pub async fn lot_history(
        db: &DatabaseConnection,
        lot_id: i32,
    ) -> AppResult<Vec<movement_history::Model>> {
        let lot = Self::get_lot(db, lot_id).await?;

        Ok(movement_history::Entity::find()
            .filter(movement_history::Column::LotId.eq(lot.id))
            .order_by_desc(movement_history::Column::CreatedAt)
            .order_by_desc(movement_history::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn lot_performance(db: &DatabaseConnection, lot_id: i32) -> AppResult<LotPerformance> {
        let lot = Self::get_lot(db, lot_id).await?;
        let today = now().date();

        let feedings = feeding::Entity::find()
            .filter(feeding::Column::LotId.eq(lot.id))
            .filter(feeding::Column::Date.gte(lot.stage_entered_on))
            .all(db)
            .await?;
        let feed_consumed_kg = round2(feedings.iter().map(|f| f.amount_g).sum::<f64>() / 1000.0);

        let initial_biomass_kg = round2(biomass_kg(lot.initial_head_count, lot.initial_avg_weight_g));
        let current_biomass_kg = round2(biomass_kg(lot.head_count, lot.avg_weight_g));
        let biomass_gain_kg = round2(current_biomass_kg - initial_biomass_kg);

        let survival_pct = if lot.initial_head_count > 0 {
            round2(lot.head_count as f64 / lot.initial_head_count as f64 * 100.0)
        } else {
            0.0
        };

        Ok(LotPerformance {
            lot_id: lot.id,
            code: lot.code.clone(),
            stage: lot.stage,
            days_in_stage: (today - lot.stage_entered_on).num_days(),
            initial_biomass_kg,
            current_biomass_kg,
            biomass_gain_kg,
            feed_consumed_kg,
            fcr: ration::fcr(feed_consumed_kg, biomass_gain_kg),
            survival_pct,
            metrics: LotMetrics::for_lot(&lot, today),
        })
    }

    pub async fn list_lots(
        db: &DatabaseConnection,
        stage: Option<LotStage>,
        include_retired: bool,
    ) -> AppResult<Vec<lot::Model>> {
        let mut query = lot::Entity::find().order_by_desc(lot::Column::Id);
        if let Some(stage) = stage {
            query = query.filter(lot::Column::Stage.eq(stage));
        }
        if !include_retired {
            query = query.filter(lot::Column::IsActive.eq(true));
        }
        Ok(query.all(db).await?)
    }

    pub async fn get_lot<C: ConnectionTrait>(conn: &C, lot_id: i32) -> AppResult<lot::Model> {
        lot::Entity::find_by_id(lot_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Lot", lot_id))
    }

    pub async fn get_active_lot<C: ConnectionTrait>(conn: &C, lot_id: i32) -> AppResult<lot::Model> {
        let lot = Self::get_lot(conn, lot_id).await?;
        if !lot.is_active {
            return Err(AppError::validation(format!("Lot {} is retired", lot.code)));
        }
        Ok(lot)
    }

    /// Get-or-create the (lot, date) daily record. Concurrent callers for
    /// the same day all end up with the one row.
    pub async fn daily_record<C: ConnectionTrait>(
        conn: &C,
        lot_id: i32,
        date: NaiveDate,
    ) -> Result<daily_record::Model, DbErr> {
        if let Some(record) = Self::find_daily_record(conn, lot_id, date).await? {
            return Ok(record);
        }

        Self::insert_daily_record(conn, lot_id, date).await?;
        Self::find_daily_record(conn, lot_id, date)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("daily record for lot {} on {}", lot_id, date)))
    }

    async fn find_daily_record<C: ConnectionTrait>(
        conn: &C,
        lot_id: i32,
        date: NaiveDate,
    ) -> Result<Option<daily_record::Model>, DbErr> {
        daily_record::Entity::find()
            .filter(daily_record::Column::LotId.eq(lot_id))
            .filter(daily_record::Column::Date.eq(date))
            .one(conn)
            .await
    }

    /// Inserts unless (lot, date) already exists; a row written meanwhile
    /// by another request is left alone and the transaction stays usable.
    async fn insert_daily_record<C: ConnectionTrait>(
        conn: &C,
        lot_id: i32,
        date: NaiveDate,
    ) -> Result<u64, DbErr> {
        daily_record::Entity::insert(daily_record::ActiveModel {
            lot_id: Set(lot_id),
            date: Set(date),
            fed: Set(false),
            cleaned: Set(false),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([daily_record::Column::LotId, daily_record::Column::Date])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
    }

    /// Removes the fish matching `kg` of product from a lot after a sale.
    /// No-op (returns 0) without an average weight or with kg <= 0.
    pub async fn decrement_for_sale<C: ConnectionTrait>(
        conn: &C,
        lot_id: i32,
        kg: f64,
        reference: &str,
        user_id: Option<i32>,
    ) -> AppResult<i32> {
        let mut lot = Self::get_lot(conn, lot_id).await?;

        let fish = fish_for_kg(kg, lot.avg_weight_g, lot.head_count);
        if fish == 0 {
            return Ok(0);
        }

        let unit_id = lot.unit_id;
        lot.head_count -= fish;
        let saved = Self::save_lot(conn, lot).await?;

        Self::record_history(
            conn,
            saved.id,
            user_id,
            HistoryEntry {
                event: MovementEvent::Sale,
                from_unit_id: unit_id,
                to_unit_id: None,
                head_count: fish,
                description: format!("{} fish ({:.2} kg) sold, {}", fish, kg, reference),
            },
        )
        .await?;
        if let Some(unit_id) = unit_id {
            UnitService::refresh_availability(conn, unit_id).await?;
        }

        Ok(fish)
    }

    /// Persists every mutable field of `lot` after recomputing its ration.
    /// head_count 0 retires the lot (inactive, no unit, no feed).
    pub async fn save_lot<C: ConnectionTrait>(conn: &C, mut lot: lot::Model) -> Result<lot::Model, DbErr> {
        let metrics = LotMetrics::for_lot(&lot, now().date());
        lot.daily_feed_kg = metrics.daily_feed_kg;
        lot.feed_type = metrics.feed_type;

        if lot.head_count <= 0 {
            lot.head_count = 0;
            lot.is_active = false;
            lot.unit_id = None;
            lot.daily_feed_kg = 0.0;
            info!("Lot {} retired", lot.code);
        }

        let active = lot::ActiveModel {
            id: Unchanged(lot.id),
            code: Unchanged(lot.code),
            stage: Set(lot.stage),
            head_count: Set(lot.head_count),
            initial_head_count: Set(lot.initial_head_count),
            initial_avg_weight_g: Set(lot.initial_avg_weight_g),
            avg_weight_g: Set(lot.avg_weight_g),
            size_min_cm: Set(lot.size_min_cm),
            size_max_cm: Set(lot.size_max_cm),
            stage_entered_on: Set(lot.stage_entered_on),
            unit_id: Set(lot.unit_id),
            daily_feed_kg: Set(lot.daily_feed_kg),
            feed_type: Set(lot.feed_type),
            is_active: Set(lot.is_active),
            created_at: Unchanged(lot.created_at),
        };
        active.update(conn).await
    }

    /// Initial values snapshot at stage entry
    pub fn snapshot_stage_entry(lot: &mut lot::Model, today: NaiveDate) {
        lot.initial_head_count = lot.head_count;
        lot.initial_avg_weight_g = lot.avg_weight_g;
        lot.stage_entered_on = today;
    }

    pub async fn record_history<C: ConnectionTrait>(
        conn: &C,
        lot_id: i32,
        user_id: Option<i32>,
        entry: HistoryEntry,
    ) -> Result<movement_history::Model, DbErr> {
        movement_history::ActiveModel {
            lot_id: Set(lot_id),
            event: Set(entry.event),
            from_unit_id: Set(entry.from_unit_id),
            to_unit_id: Set(entry.to_unit_id),
            head_count: Set(entry.head_count),
            description: Set(entry.description),
            user_id: Set(user_id),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(conn)
        .await
    }
}

/// Fish removed for `kg` of product: round-half-up(kg / (weight / 1000)),
/// capped at the head count. 0 when weight is unknown or kg <= 0.
pub fn fish_for_kg(kg: f64, avg_weight_g: Option<f64>, head_count: i32) -> i32 {
    match avg_weight_g {
        Some(w) if w > 0.0 && kg > 0.0 => {
            let fish = (kg / (w / 1000.0) + 0.5).floor() as i64;
            fish.clamp(0, head_count.max(0) as i64) as i32
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::test_support::{egg_tray, reload_lot, stocked_lot, tank};

    #[tokio::test]
    async fn test_create_egg_lot_rules() {
        let db = db::test_connection().await;
        let tray = egg_tray(&db, 10_000).await;
        let fry_tank = tank(&db, 100.0).await;

        let too_many = LotService::create_egg_lot(&db, tray.id, 10_001, None).await;
        assert!(matches!(too_many, Err(AppError::Validation(_))));

        let not_a_tray = LotService::create_egg_lot(&db, fry_tank.id, 100, None).await;
        assert!(matches!(not_a_tray, Err(AppError::Validation(_))));

        let lot = LotService::create_egg_lot(&db, tray.id, 8_000, Some(1)).await.unwrap();
        assert_eq!(lot.stage, LotStage::Eggs);
        assert_eq!(lot.initial_head_count, 8_000);
        assert!(lot.code.starts_with('L'));
        assert!(!UnitService::get_unit(&db, tray.id).await.unwrap().is_available);

        let second = LotService::create_egg_lot(&db, tray.id, 100, None).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let history = LotService::lot_history(&db, lot.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event, MovementEvent::Created);
    }

    #[tokio::test]
    async fn test_mortality_never_below_zero() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 100, Some(10.0)).await;

        let too_many = LotService::record_mortality(&db, lot.id, 101, None, None).await;
        assert!(too_many.is_err());
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 100);

        let after = LotService::record_mortality(&db, lot.id, 40, None, None).await.unwrap();
        assert_eq!(after.head_count, 60);
        assert!(after.is_active);

        let retired = LotService::record_mortality(&db, lot.id, 60, Some("storm".into()), None)
            .await
            .unwrap();
        assert_eq!(retired.head_count, 0);
        assert!(!retired.is_active);
        assert_eq!(retired.unit_id, None);
        assert!(UnitService::get_unit(&db, fry_tank.id).await.unwrap().is_available);

        let records = mortality_record::Entity::find()
            .filter(mortality_record::Column::LotId.eq(lot.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(records, 2);
    }

    #[tokio::test]
    async fn test_measurements_recompute_ration() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 1000, None).await;
        assert_eq!(lot.daily_feed_kg, 0.0);

        let weighed = LotService::set_weight(&db, lot.id, 50.0, None).await.unwrap();
        assert_eq!(weighed.daily_feed_kg, 1.25);

        let measured = LotService::set_size(&db, lot.id, 8.0, 12.0, None).await.unwrap();
        assert_eq!(measured.feed_type, FeedType::Grower1);

        assert!(LotService::set_size(&db, lot.id, 12.0, 8.0, None).await.is_err());
        assert!(LotService::set_weight(&db, lot.id, 0.0, None).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_task_reuses_daily_record() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 100, Some(5.0)).await;

        let fed = LotService::mark_task(&db, lot.id, DailyTask::Feeding).await.unwrap();
        let cleaned = LotService::mark_task(&db, lot.id, DailyTask::Cleaning).await.unwrap();

        assert_eq!(fed.id, cleaned.id);
        assert!(cleaned.fed && cleaned.cleaned);
    }

    #[tokio::test]
    async fn test_daily_record_written_meanwhile_is_reused() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 100, Some(5.0)).await;
        let today = now().date();

        // another request got there between our lookup and our insert
        assert_eq!(LotService::insert_daily_record(&db, lot.id, today).await.unwrap(), 1);
        assert_eq!(LotService::insert_daily_record(&db, lot.id, today).await.unwrap(), 0);

        let txn = db.begin().await.unwrap();
        let record = LotService::daily_record(&txn, lot.id, today).await.unwrap();
        LotService::insert_daily_record(&txn, lot.id, today).await.unwrap();
        txn.commit().await.unwrap();

        let rows = daily_record::Entity::find()
            .filter(daily_record::Column::LotId.eq(lot.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, record.id);
    }

    #[tokio::test]
    async fn test_advance_stage_snapshots_initial_values() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 900, Some(30.0)).await;
        LotService::record_mortality(&db, lot.id, 100, None, None).await.unwrap();

        let advanced = LotService::advance_stage(&db, lot.id, None).await.unwrap();
        assert_eq!(advanced.stage, LotStage::Juvenile);
        assert_eq!(advanced.initial_head_count, 800);
        assert_eq!(advanced.initial_avg_weight_g, Some(30.0));

        assert!(LotService::advance_stage(&db, lot.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_performance_survival_and_fcr() {
        let db = db::test_connection().await;
        let fry_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, fry_tank.id, LotStage::Fry, 1000, Some(20.0)).await;
        LotService::record_mortality(&db, lot.id, 100, None, None).await.unwrap();
        LotService::set_weight(&db, lot.id, 40.0, None).await.unwrap();

        feeding::ActiveModel {
            lot_id: Set(lot.id),
            date: Set(now().date()),
            time: Set(now().time()),
            amount_g: Set(24_000.0),
            feed_type: Set(FeedType::Fry2),
            notes: Set(None),
            user_id: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let perf = LotService::lot_performance(&db, lot.id).await.unwrap();
        // 20 kg -> 900 x 40 g = 36 kg, 16 kg gained on 24 kg of feed
        assert_eq!(perf.initial_biomass_kg, 20.0);
        assert_eq!(perf.current_biomass_kg, 36.0);
        assert_eq!(perf.feed_consumed_kg, 24.0);
        assert_eq!(perf.fcr, Some(1.5));
        assert_eq!(perf.survival_pct, 90.0);
    }

    #[tokio::test]
    async fn test_decrement_for_sale() {
        let db = db::test_connection().await;
        let grow_tank = tank(&db, 250.0).await;
        let lot = stocked_lot(&db, grow_tank.id, LotStage::Fry, 100, Some(250.0)).await;

        // 10 kg at 250 g = 40 fish
        let fish = LotService::decrement_for_sale(&db, lot.id, 10.0, "VP2501-0001", None)
            .await
            .unwrap();
        assert_eq!(fish, 40);
        assert_eq!(reload_lot(&db, lot.id).await.head_count, 60);

        // capped at the remaining head count
        let fish = LotService::decrement_for_sale(&db, lot.id, 100.0, "VP2501-0002", None)
            .await
            .unwrap();
        assert_eq!(fish, 60);
        assert!(!reload_lot(&db, lot.id).await.is_active);
    }

    #[test]
    fn test_fish_for_kg_rounding() {
        assert_eq!(fish_for_kg(1.1, Some(200.0), 100), 6); // 5.5 rounds up
        assert_eq!(fish_for_kg(1.0, None, 100), 0);
        assert_eq!(fish_for_kg(0.0, Some(200.0), 100), 0);
        assert_eq!(fish_for_kg(50.0, Some(200.0), 100), 100);
    }
}
