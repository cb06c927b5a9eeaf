// ============================================================================
// SERVICE : NOTIFICATIONS
// ============================================================================
//
// Rules (computed on the fly, nothing stored):
//   PRODUCTION
//     - EGGS lot more than 15 days in stage        -> move to tank
//     - after 20:00, FRY/JUVENILE/GROW_OUT lot not fed today
//     - FRY/JUVENILE lot >= 75 g and >= 15 cm       -> ready for cage
//   PRODUCTION or SALES
//     - GROW_OUT lot >= 125 g and >= 25 cm          -> ready for sale
//
// Staff users see everything.
//
// ============================================================================

use chrono::{NaiveDateTime, NaiveTime};
use sea_orm::*;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::daily_record;
use crate::models::lot::{self, LotStage};
use crate::models::user_group::AccessGroup;

pub const EGGS_MAX_DAYS: i64 = 15;
pub const CAGE_READY_WEIGHT_G: f64 = 75.0;
pub const CAGE_READY_SIZE_CM: f64 = 15.0;
pub const SALE_READY_WEIGHT_G: f64 = 125.0;
pub const SALE_READY_SIZE_CM: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    MoveToTank,
    FeedingPending,
    ReadyForCage,
    ReadyForSale,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub lot_id: i32,
    pub lot_code: String,
    pub message: String,
}

pub struct NotificationService;

impl NotificationService {
    pub async fn for_user(
        db: &DatabaseConnection,
        user: &AuthUser,
        now: NaiveDateTime,
    ) -> AppResult<Vec<Notification>> {
        let production = user.has_group(AccessGroup::Production);
        let sales = user.has_group(AccessGroup::Sales);
        if !production && !sales {
            return Ok(Vec::new());
        }

        let lots = lot::Entity::find()
            .filter(lot::Column::IsActive.eq(true))
            .order_by_asc(lot::Column::Code)
            .all(db)
            .await?;

        let today = now.date();
        let fed_today: HashSet<i32> = daily_record::Entity::find()
            .filter(daily_record::Column::Date.eq(today))
            .filter(daily_record::Column::Fed.eq(true))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.lot_id)
            .collect();

        let evening = NaiveTime::from_hms_opt(20, 0, 0).map_or(false, |t| now.time() >= t);
        let mut notifications = Vec::new();

        for lot in &lots {
            let days = (today - lot.stage_entered_on).num_days();
            let weight = lot.avg_weight_g.unwrap_or(0.0);
            let size = lot.size_max_cm.unwrap_or(0.0);

            if production {
                if lot.stage == LotStage::Eggs && days > EGGS_MAX_DAYS {
                    notifications.push(notify(
                        NotificationKind::MoveToTank,
                        lot,
                        format!("Lot {} has been {} days as eggs, move it to a tank", lot.code, days),
                    ));
                }
                if evening && lot.stage != LotStage::Eggs && !fed_today.contains(&lot.id) {
                    notifications.push(notify(
                        NotificationKind::FeedingPending,
                        lot,
                        format!("Lot {} has not been fed today", lot.code),
                    ));
                }
                if matches!(lot.stage, LotStage::Fry | LotStage::Juvenile)
                    && weight >= CAGE_READY_WEIGHT_G
                    && size >= CAGE_READY_SIZE_CM
                {
                    notifications.push(notify(
                        NotificationKind::ReadyForCage,
                        lot,
                        format!("Lot {} is ready to move to a cage", lot.code),
                    ));
                }
            }

            if lot.stage == LotStage::GrowOut && weight >= SALE_READY_WEIGHT_G && size >= SALE_READY_SIZE_CM {
                notifications.push(notify(
                    NotificationKind::ReadyForSale,
                    lot,
                    format!("Lot {} has reached sale size", lot.code),
                ));
            }
        }

        Ok(notifications)
    }
}

fn notify(kind: NotificationKind, lot: &lot::Model, message: String) -> Notification {
    Notification {
        kind,
        lot_id: lot.id,
        lot_code: lot.code.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::dto::DailyTask;
    use crate::services::lot_service::LotService;
    use crate::services::now;
    use crate::services::test_support::{cage, stocked_lot, tank};

    fn user(groups: Vec<AccessGroup>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "maria".to_string(),
            is_staff: false,
            groups,
        }
    }

    fn at(hour: u32) -> NaiveDateTime {
        now().date().and_hms_opt(hour, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_ready_notifications_by_group() {
        let db = db::test_connection().await;
        let nursery = tank(&db, 250.0).await;
        let grow = cage(&db, 1500.0).await;
        let juvenile = stocked_lot(&db, nursery.id, LotStage::Juvenile, 100, Some(80.0)).await;
        LotService::set_size(&db, juvenile.id, 14.0, 16.0, None).await.unwrap();
        let market = stocked_lot(&db, grow.id, LotStage::GrowOut, 100, Some(130.0)).await;
        LotService::set_size(&db, market.id, 24.0, 26.0, None).await.unwrap();

        let production = NotificationService::for_user(&db, &user(vec![AccessGroup::Production]), at(9))
            .await
            .unwrap();
        let kinds: Vec<NotificationKind> = production.iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NotificationKind::ReadyForCage));
        assert!(kinds.contains(&NotificationKind::ReadyForSale));
        assert!(!kinds.contains(&NotificationKind::FeedingPending));

        let sales = NotificationService::for_user(&db, &user(vec![AccessGroup::Sales]), at(9))
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].kind, NotificationKind::ReadyForSale);

        let logistics = NotificationService::for_user(&db, &user(vec![AccessGroup::Logistics]), at(9))
            .await
            .unwrap();
        assert!(logistics.is_empty());
    }

    #[tokio::test]
    async fn test_feeding_pending_after_eight_pm() {
        let db = db::test_connection().await;
        let nursery = tank(&db, 250.0).await;
        let hungry = stocked_lot(&db, nursery.id, LotStage::Fry, 100, Some(5.0)).await;
        let fed = stocked_lot(&db, nursery.id, LotStage::Juvenile, 100, Some(30.0)).await;
        LotService::mark_task(&db, fed.id, DailyTask::Feeding).await.unwrap();

        let evening = NotificationService::for_user(&db, &user(vec![AccessGroup::Production]), at(20))
            .await
            .unwrap();

        let pending: Vec<i32> = evening
            .iter()
            .filter(|n| n.kind == NotificationKind::FeedingPending)
            .map(|n| n.lot_id)
            .collect();
        assert_eq!(pending, vec![hungry.id]);
    }
}
