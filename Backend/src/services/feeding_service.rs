use chrono::NaiveDate;
use sea_orm::*;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::dto::{FeedingFilter, FeedingRequest, UpdateFeedingRequest};
use crate::models::{feeding, lot};
use crate::services::calculators::{round2, LotMetrics};
use crate::services::lot_service::LotService;
use crate::services::now;

/// Number of entries returned by the per-lot history
pub const HISTORY_LIMIT: u64 = 10;

#[derive(Debug, Serialize)]
pub struct FeedingSummary {
    pub lot_id: i32,
    pub feedings: usize,
    pub total_g: f64,
    pub feeding_days: usize,
    pub avg_per_day_g: f64,
}

/// What the calculator recommends against what is stored on the lot
#[derive(Debug, Serialize)]
pub struct OptimisedFeeding {
    pub lot_id: i32,
    pub current_daily_feed_kg: f64,
    pub current_feed_type: lot::FeedType,
    pub recommended: LotMetrics,
}

pub struct FeedingService;

impl FeedingService {
    /// Logs a feeding; also flags the day's record as fed
    pub async fn create(
        db: &DatabaseConnection,
        request: FeedingRequest,
        user_id: Option<i32>,
    ) -> AppResult<feeding::Model> {
        if request.amount_g <= 0.0 {
            return Err(AppError::validation("Amount must be greater than zero"));
        }

        let lot = LotService::get_active_lot(db, request.lot_id).await?;
        let timestamp = now();
        let date = request.date.unwrap_or(timestamp.date());

        let txn = db.begin().await?;
        let created = feeding::ActiveModel {
            lot_id: Set(lot.id),
            date: Set(date),
            time: Set(request.time.unwrap_or(timestamp.time())),
            amount_g: Set(request.amount_g),
            feed_type: Set(request.feed_type.unwrap_or(lot.feed_type)),
            notes: Set(request.notes),
            user_id: Set(user_id),
            created_at: Set(timestamp),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let record = LotService::daily_record(&txn, lot.id, date).await?;
        if !record.fed {
            let mut active: crate::models::daily_record::ActiveModel = record.into();
            active.fed = Set(true);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    pub async fn update(
        db: &DatabaseConnection,
        feeding_id: i32,
        request: UpdateFeedingRequest,
    ) -> AppResult<feeding::Model> {
        let existing = Self::get(db, feeding_id).await?;
        let mut active: feeding::ActiveModel = existing.into();

        if let Some(amount) = request.amount_g {
            if amount <= 0.0 {
                return Err(AppError::validation("Amount must be greater than zero"));
            }
            active.amount_g = Set(amount);
        }
        if let Some(date) = request.date {
            active.date = Set(date);
        }
        if let Some(time) = request.time {
            active.time = Set(time);
        }
        if let Some(feed_type) = request.feed_type {
            active.feed_type = Set(feed_type);
        }
        if request.notes.is_some() {
            active.notes = Set(request.notes);
        }

        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, feeding_id: i32) -> AppResult<()> {
        let existing = Self::get(db, feeding_id).await?;
        feeding::Entity::delete_by_id(existing.id).exec(db).await?;
        Ok(())
    }

    pub async fn get(db: &DatabaseConnection, feeding_id: i32) -> AppResult<feeding::Model> {
        feeding::Entity::find_by_id(feeding_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Feeding", feeding_id))
    }

    pub async fn list(db: &DatabaseConnection, filter: FeedingFilter) -> AppResult<Vec<feeding::Model>> {
        let mut query = feeding::Entity::find()
            .order_by_desc(feeding::Column::Date)
            .order_by_desc(feeding::Column::Time);

        if let Some(lot_id) = filter.lot_id {
            query = query.filter(feeding::Column::LotId.eq(lot_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(feeding::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(feeding::Column::Date.lte(to));
        }

        Ok(query.all(db).await?)
    }

    /// Last HISTORY_LIMIT feedings of a lot
    pub async fn history(db: &DatabaseConnection, lot_id: i32) -> AppResult<Vec<feeding::Model>> {
        let lot = LotService::get_lot(db, lot_id).await?;

        Ok(feeding::Entity::find()
            .filter(feeding::Column::LotId.eq(lot.id))
            .order_by_desc(feeding::Column::Date)
            .order_by_desc(feeding::Column::Time)
            .order_by_desc(feeding::Column::Id)
            .limit(HISTORY_LIMIT)
            .all(db)
            .await?)
    }

    pub async fn summary(db: &DatabaseConnection, lot_id: i32) -> AppResult<FeedingSummary> {
        let lot = LotService::get_lot(db, lot_id).await?;
        let feedings = feeding::Entity::find()
            .filter(feeding::Column::LotId.eq(lot.id))
            .all(db)
            .await?;

        let total_g: f64 = feedings.iter().map(|f| f.amount_g).sum();
        let mut days: Vec<NaiveDate> = feedings.iter().map(|f| f.date).collect();
        days.sort();
        days.dedup();

        let avg_per_day_g = if days.is_empty() {
            0.0
        } else {
            round2(total_g / days.len() as f64)
        };

        Ok(FeedingSummary {
            lot_id: lot.id,
            feedings: feedings.len(),
            total_g: round2(total_g),
            feeding_days: days.len(),
            avg_per_day_g,
        })
    }

    pub async fn optimised_preview(db: &DatabaseConnection, lot_id: i32) -> AppResult<OptimisedFeeding> {
        let lot = LotService::get_active_lot(db, lot_id).await?;

        Ok(OptimisedFeeding {
            lot_id: lot.id,
            current_daily_feed_kg: lot.daily_feed_kg,
            current_feed_type: lot.feed_type,
            recommended: LotMetrics::for_lot(&lot, now().date()),
        })
    }

    /// Stores the recommended ration and feed type on the lot
    pub async fn apply_optimised(db: &DatabaseConnection, lot_id: i32) -> AppResult<lot::Model> {
        let lot = LotService::get_active_lot(db, lot_id).await?;
        Ok(LotService::save_lot(db, lot).await?)
    }
}
