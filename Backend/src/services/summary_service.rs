// ============================================================================
// SERVICE : DAILY UNIT SUMMARIES
// ============================================================================
//
// Description:
//   For one day, writes one unit_daily_summaries row per tank/cage holding
//   active lots: head count, biomass, ration and that day's mortality.
//
// Notes:
//   - update-or-create keyed by (unit_id, date): rerunning a day rewrites
//     the same rows
//   - run by scheduler::spawn_daily_summary for "yesterday"
//
// ============================================================================

use chrono::NaiveDate;
use sea_orm::*;
use std::collections::HashMap;
use tracing::info;

use crate::error::AppResult;
use crate::models::rearing_unit::{self, UnitKind};
use crate::models::{lot, mortality_record, unit_daily_summary};
use crate::services::calculators::ration::biomass_kg;
use crate::services::calculators::round2;
use crate::services::now;

pub struct SummaryService;

impl SummaryService {
    /// Returns the number of summaries written
    pub async fn summarize_day(db: &DatabaseConnection, date: NaiveDate) -> AppResult<usize> {
        let units = rearing_unit::Entity::find()
            .filter(rearing_unit::Column::Kind.is_in([UnitKind::Tank, UnitKind::Cage]))
            .all(db)
            .await?;
        let unit_ids: Vec<i32> = units.iter().map(|u| u.id).collect();

        let lots = lot::Entity::find()
            .filter(lot::Column::IsActive.eq(true))
            .filter(lot::Column::UnitId.is_in(unit_ids))
            .all(db)
            .await?;

        let mut by_unit: HashMap<i32, Vec<lot::Model>> = HashMap::new();
        for lot in lots {
            if let Some(unit_id) = lot.unit_id {
                by_unit.entry(unit_id).or_default().push(lot);
            }
        }

        let txn = db.begin().await?;
        let mut written = 0;

        for unit in units {
            let Some(residents) = by_unit.get(&unit.id) else {
                continue;
            };

            let lot_ids: Vec<i32> = residents.iter().map(|l| l.id).collect();
            let mortality: i32 = mortality_record::Entity::find()
                .filter(mortality_record::Column::LotId.is_in(lot_ids))
                .filter(mortality_record::Column::Date.eq(date))
                .all(&txn)
                .await?
                .iter()
                .map(|m| m.count)
                .sum();

            let head_count: i32 = residents.iter().map(|l| l.head_count).sum();
            let biomass = round2(residents.iter().map(|l| biomass_kg(l.head_count, l.avg_weight_g)).sum());
            let feed = round2(residents.iter().map(|l| l.daily_feed_kg).sum());

            let existing = unit_daily_summary::Entity::find()
                .filter(unit_daily_summary::Column::UnitId.eq(unit.id))
                .filter(unit_daily_summary::Column::Date.eq(date))
                .one(&txn)
                .await?;

            let mut active = match existing {
                Some(row) => row.into(),
                None => unit_daily_summary::ActiveModel {
                    unit_id: Set(unit.id),
                    date: Set(date),
                    ..Default::default()
                },
            };
            active.unit_kind = Set(unit.kind);
            active.lot_count = Set(residents.len() as i32);
            active.head_count = Set(head_count);
            active.biomass_kg = Set(biomass);
            active.daily_feed_kg = Set(feed);
            active.mortality = Set(mortality);
            active.updated_at = Set(now());
            active.save(&txn).await?;

            written += 1;
        }

        txn.commit().await?;

        info!("📊 Unit summaries for {}: {} written", date, written);
        Ok(written)
    }

    pub async fn list(
        db: &DatabaseConnection,
        unit_id: Option<i32>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<unit_daily_summary::Model>> {
        let mut query = unit_daily_summary::Entity::find()
            .order_by_desc(unit_daily_summary::Column::Date)
            .order_by_asc(unit_daily_summary::Column::UnitId);
        if let Some(unit_id) = unit_id {
            query = query.filter(unit_daily_summary::Column::UnitId.eq(unit_id));
        }
        if let Some(from) = from {
            query = query.filter(unit_daily_summary::Column::Date.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(unit_daily_summary::Column::Date.lte(to));
        }
        Ok(query.all(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::lot::LotStage;
    use crate::services::lot_service::LotService;
    use crate::services::test_support::{cage, egg_tray, stocked_lot, tank};

    #[tokio::test]
    async fn test_summary_is_idempotent() {
        let db = db::test_connection().await;
        let nursery = tank(&db, 250.0).await;
        let grow = cage(&db, 1500.0).await;
        tank(&db, 100.0).await; // empty, skipped
        let tray = egg_tray(&db, 1000).await;
        LotService::create_egg_lot(&db, tray.id, 500, None).await.unwrap();

        let fry = stocked_lot(&db, nursery.id, LotStage::Fry, 1000, Some(50.0)).await;
        stocked_lot(&db, nursery.id, LotStage::Juvenile, 200, Some(100.0)).await;
        stocked_lot(&db, grow.id, LotStage::GrowOut, 100, Some(200.0)).await;
        LotService::record_mortality(&db, fry.id, 10, None, None).await.unwrap();

        let today = now().date();
        assert_eq!(SummaryService::summarize_day(&db, today).await.unwrap(), 2);
        assert_eq!(SummaryService::summarize_day(&db, today).await.unwrap(), 2);

        let rows = SummaryService::list(&db, None, None, None).await.unwrap();
        assert_eq!(rows.len(), 2);

        let nursery_row = rows.iter().find(|r| r.unit_id == nursery.id).unwrap();
        assert_eq!(nursery_row.unit_kind, UnitKind::Tank);
        assert_eq!(nursery_row.lot_count, 2);
        assert_eq!(nursery_row.head_count, 1190);
        // 990 x 50 g + 200 x 100 g
        assert_eq!(nursery_row.biomass_kg, 69.5);
        assert_eq!(nursery_row.mortality, 10);

        let cage_row = rows.iter().find(|r| r.unit_id == grow.id).unwrap();
        assert_eq!(cage_row.unit_kind, UnitKind::Cage);
        assert_eq!(cage_row.mortality, 0);
    }
}
