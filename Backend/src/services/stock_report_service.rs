// ============================================================================
// SERVICE : STOCK REPORTS
// ============================================================================
//
// Description:
//   Read-only views over supplies and movements for the logistics
//   dashboard: stock summary, stock per category (chart data) and
//   movement totals per kind over a date range.
//
// ============================================================================

use rust_decimal::Decimal;
use sea_orm::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::AppResult;
use crate::models::dto::DateRange;
use crate::models::inventory_movement::MovementKind;
use crate::models::supply::MeasureUnit;
use crate::models::{supply, supply_category};
use crate::services::inventory_service::InventoryService;

#[derive(Debug, Clone, Serialize)]
pub struct StockLine {
    pub supply_id: i32,
    pub name: String,
    pub category: String,
    pub unit: MeasureUnit,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub is_low: bool,
}

#[derive(Debug, Serialize)]
pub struct StockSummary {
    pub total_supplies: usize,
    pub low_stock_count: usize,
    pub lines: Vec<StockLine>,
}

#[derive(Debug, Serialize)]
pub struct CategoryStock {
    pub category: String,
    pub supplies: usize,
    pub total_stock: Decimal,
}

#[derive(Debug, Serialize)]
pub struct KindTotal {
    pub kind: MovementKind,
    pub count: usize,
    pub quantity: Decimal,
}

pub struct StockReportService;

impl StockReportService {
    pub async fn stock_summary(db: &DatabaseConnection) -> AppResult<StockSummary> {
        let categories: HashMap<i32, String> = supply_category::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let lines: Vec<StockLine> = supply::Entity::find()
            .order_by_asc(supply::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(|s| StockLine {
                is_low: s.is_low_stock(),
                supply_id: s.id,
                category: categories.get(&s.category_id).cloned().unwrap_or_default(),
                name: s.name,
                unit: s.unit,
                current_stock: s.current_stock,
                min_stock: s.min_stock,
            })
            .collect();

        Ok(StockSummary {
            total_supplies: lines.len(),
            low_stock_count: lines.iter().filter(|l| l.is_low).count(),
            lines,
        })
    }

    /// Chart data, one bar per category
    pub async fn stock_by_category(db: &DatabaseConnection) -> AppResult<Vec<CategoryStock>> {
        let summary = Self::stock_summary(db).await?;

        let mut by_category: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
        for line in summary.lines {
            let entry = by_category.entry(line.category).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += line.current_stock;
        }

        Ok(by_category
            .into_iter()
            .map(|(category, (supplies, total_stock))| CategoryStock {
                category,
                supplies,
                total_stock,
            })
            .collect())
    }

    pub async fn movements_by_kind(db: &DatabaseConnection, range: &DateRange) -> AppResult<Vec<KindTotal>> {
        let movements = InventoryService::list_movements(db, None, range).await?;

        let mut totals: Vec<KindTotal> = [
            MovementKind::Entry,
            MovementKind::Exit,
            MovementKind::AdjustPos,
            MovementKind::AdjustNeg,
        ]
        .into_iter()
        .map(|kind| KindTotal {
            kind,
            count: 0,
            quantity: Decimal::ZERO,
        })
        .collect();

        for movement in movements {
            if let Some(total) = totals.iter_mut().find(|t| t.kind == movement.kind) {
                total.count += 1;
                total.quantity += movement.quantity;
            }
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::dto::MovementRequest;
    use crate::services::now;
    use crate::services::test_support::supply;

    async fn enter(db: &DatabaseConnection, supply_id: i32, kind: MovementKind, quantity: i64) {
        let request = MovementRequest {
            supply_id,
            kind,
            quantity: Decimal::from(quantity),
            description: None,
        };
        InventoryService::create_movement(db, request, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_summary_flags_low_stock() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Pellet 2mm", 10).await;
        let salt = supply(&db, "Sal", 5).await;
        enter(&db, feed.id, MovementKind::Entry, 50).await;
        enter(&db, salt.id, MovementKind::Entry, 5).await;

        let summary = StockReportService::stock_summary(&db).await.unwrap();
        assert_eq!(summary.total_supplies, 2);
        assert_eq!(summary.low_stock_count, 1);
        let low = summary.lines.iter().find(|l| l.is_low).unwrap();
        assert_eq!(low.name, "Sal");

        let chart = StockReportService::stock_by_category(&db).await.unwrap();
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].category, "Feed");
        assert_eq!(chart[0].total_stock, Decimal::from(55));
    }

    #[tokio::test]
    async fn test_movements_by_kind_in_range() {
        let db = db::test_connection().await;
        let feed = supply(&db, "Pellet 4mm", 0).await;
        enter(&db, feed.id, MovementKind::Entry, 30).await;
        enter(&db, feed.id, MovementKind::Entry, 10).await;
        enter(&db, feed.id, MovementKind::Exit, 15).await;

        let today = now().date();
        let range = DateRange {
            from: Some(today),
            to: Some(today),
        };
        let totals = StockReportService::movements_by_kind(&db, &range).await.unwrap();
        let entry = totals.iter().find(|t| t.kind == MovementKind::Entry).unwrap();
        let exit = totals.iter().find(|t| t.kind == MovementKind::Exit).unwrap();
        assert_eq!((entry.count, entry.quantity), (2, Decimal::from(40)));
        assert_eq!((exit.count, exit.quantity), (1, Decimal::from(15)));

        let yesterday = today.pred_opt().unwrap();
        let before = DateRange {
            from: None,
            to: Some(yesterday),
        };
        let none = StockReportService::movements_by_kind(&db, &before).await.unwrap();
        assert!(none.iter().all(|t| t.count == 0));
    }
}
