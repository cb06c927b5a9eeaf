// ============================================================================
// SERVICE : SEQUENCE CODES
// ============================================================================
//
// Description:
//   Human-readable codes: prefix + yymm + "-" + zero-padded number,
//   e.g. L2410-007, OC2410-012, VP2410-0031.
//
// Notes:
//   - One counter row per prefix+month in sequence_counters
//   - The counter is bumped with `last_value = last_value + 1` inside the
//     caller's transaction, so two writers never get the same number
//
// ============================================================================

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::models::rearing_unit::UnitKind;
use crate::models::sequence_counter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Unit(UnitKind),
    Lot,
    PurchaseOrder,
    WholesaleOrder,
    PosSale,
    RetailOrder,
}

impl CodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            CodeKind::Unit(kind) => kind.code_prefix(),
            CodeKind::Lot => "L",
            CodeKind::PurchaseOrder => "OC",
            CodeKind::WholesaleOrder => "PM",
            CodeKind::PosSale => "VP",
            CodeKind::RetailOrder => "VR",
        }
    }

    pub fn width(&self) -> usize {
        match self {
            CodeKind::Unit(_) => 2,
            CodeKind::Lot | CodeKind::PurchaseOrder | CodeKind::WholesaleOrder => 3,
            CodeKind::PosSale | CodeKind::RetailOrder => 4,
        }
    }
}

pub struct SequenceService;

impl SequenceService {
    /// Issues the next code for `kind` in the month of `today`
    pub async fn next_code<C: ConnectionTrait>(
        conn: &C,
        kind: CodeKind,
        today: NaiveDate,
    ) -> Result<String, DbErr> {
        let period = today.format("%y%m").to_string();
        let key = format!("{}{}", kind.prefix(), period);

        let value = Self::bump(conn, &key).await?;

        Ok(format!(
            "{}{}-{:0width$}",
            kind.prefix(),
            period,
            value,
            width = kind.width()
        ))
    }

    async fn bump<C: ConnectionTrait>(conn: &C, key: &str) -> Result<i32, DbErr> {
        // 1. Atomic increment of an existing counter
        let result = sequence_counter::Entity::update_many()
            .col_expr(
                sequence_counter::Column::LastValue,
                Expr::col(sequence_counter::Column::LastValue).add(1),
            )
            .filter(sequence_counter::Column::Key.eq(key))
            .exec(conn)
            .await?;

        // 2. First code of the month
        if result.rows_affected == 0 {
            sequence_counter::ActiveModel {
                key: Set(key.to_string()),
                last_value: Set(1),
            }
            .insert(conn)
            .await?;
            return Ok(1);
        }

        // 3. Read back the value we just reserved
        let counter = sequence_counter::Entity::find_by_id(key.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("sequence counter {}", key)))?;

        Ok(counter.last_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_codes_are_sequential_per_month() {
        let db = db::test_connection().await;
        let october = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        let november = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();

        let first = SequenceService::next_code(&db, CodeKind::Lot, october).await.unwrap();
        let second = SequenceService::next_code(&db, CodeKind::Lot, october).await.unwrap();
        let next_month = SequenceService::next_code(&db, CodeKind::Lot, november).await.unwrap();

        assert_eq!(first, "L2410-001");
        assert_eq!(second, "L2410-002");
        assert_eq!(next_month, "L2411-001");
    }

    #[tokio::test]
    async fn test_prefixes_and_widths() {
        let db = db::test_connection().await;
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        let tank = SequenceService::next_code(&db, CodeKind::Unit(UnitKind::Tank), day).await.unwrap();
        let tray = SequenceService::next_code(&db, CodeKind::Unit(UnitKind::EggTray), day).await.unwrap();
        let pos = SequenceService::next_code(&db, CodeKind::PosSale, day).await.unwrap();
        let po = SequenceService::next_code(&db, CodeKind::PurchaseOrder, day).await.unwrap();

        assert_eq!(tank, "A2501-01");
        assert_eq!(tray, "B2501-01");
        assert_eq!(pos, "VP2501-0001");
        assert_eq!(po, "OC2501-001");
    }
}
