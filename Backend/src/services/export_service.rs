// ============================================================================
// SERVICE : XLSX EXPORTS
// ============================================================================
//
// Description:
//   Spreadsheet versions of the stock summary and the sales report,
//   returned as bytes for download.
//
// ============================================================================

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use sea_orm::DatabaseConnection;

use crate::error::AppResult;
use crate::models::dto::SalesReportFilter;
use crate::services::sales_report_service::SalesReportService;
use crate::services::stock_report_service::StockReportService;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

impl ExportService {
    pub async fn stock_summary(db: &DatabaseConnection) -> AppResult<Vec<u8>> {
        let summary = StockReportService::stock_summary(db).await?;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Stock")?;
        header(sheet, &["Supply", "Category", "Unit", "Current stock", "Minimum stock", "Low"])?;

        for (i, line) in summary.lines.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &line.name)?;
            sheet.write_string(row, 1, &line.category)?;
            sheet.write_string(row, 2, format!("{:?}", line.unit).to_uppercase())?;
            sheet.write_number(row, 3, to_f64(line.current_stock))?;
            sheet.write_number(row, 4, to_f64(line.min_stock))?;
            sheet.write_string(row, 5, if line.is_low { "YES" } else { "" })?;
        }
        sheet.set_column_width(0, 30)?;
        sheet.set_column_width(1, 20)?;

        Ok(workbook.save_to_buffer()?)
    }

    pub async fn sales_report(db: &DatabaseConnection, filter: &SalesReportFilter) -> AppResult<Vec<u8>> {
        let report = SalesReportService::report(db, filter).await?;

        let mut workbook = Workbook::new();

        // 1. Ledger rows
        let sheet = workbook.add_worksheet();
        sheet.set_name("Sales")?;
        header(sheet, &["Date", "Type", "Reference", "Customer", "Lot", "Kg", "Amount"])?;
        for (i, record) in report.records.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, record.date.format("%Y-%m-%d").to_string())?;
            sheet.write_string(row, 1, format!("{:?}", record.sale_type))?;
            sheet.write_string(row, 2, &record.reference_code)?;
            if let Some(customer_id) = record.customer_id {
                sheet.write_number(row, 3, customer_id)?;
            }
            if let Some(lot_id) = record.lot_id {
                sheet.write_number(row, 4, lot_id)?;
            }
            sheet.write_number(row, 5, record.kg)?;
            sheet.write_number(row, 6, to_f64(record.amount))?;
        }
        sheet.set_column_width(2, 16)?;

        // 2. Totals per type
        let totals = workbook.add_worksheet();
        totals.set_name("Summary")?;
        header(totals, &["Type", "Sales", "Kg", "Amount"])?;
        let mut row = 1;
        for total in &report.summary.by_type {
            totals.write_string(row, 0, format!("{:?}", total.sale_type))?;
            totals.write_number(row, 1, total.count as f64)?;
            totals.write_number(row, 2, total.kg)?;
            totals.write_number(row, 3, to_f64(total.amount))?;
            row += 1;
        }
        let bold = Format::new().set_bold();
        totals.write_string_with_format(row, 0, "Total", &bold)?;
        totals.write_number_with_format(row, 1, report.summary.total_count as f64, &bold)?;
        totals.write_number_with_format(row, 2, report.summary.total_kg, &bold)?;
        totals.write_number_with_format(row, 3, to_f64(report.summary.total_amount), &bold)?;

        Ok(workbook.save_to_buffer()?)
    }
}

fn header(sheet: &mut Worksheet, titles: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    Ok(())
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::test_support::supply;

    // xlsx files are zip archives
    fn is_zip(bytes: &[u8]) -> bool {
        bytes.starts_with(b"PK")
    }

    #[tokio::test]
    async fn test_stock_export() {
        let db = db::test_connection().await;
        supply(&db, "Pellet 2mm", 10).await;

        let bytes = ExportService::stock_summary(&db).await.unwrap();
        assert!(is_zip(&bytes));
    }

    #[tokio::test]
    async fn test_empty_sales_export() {
        let db = db::test_connection().await;

        let bytes = ExportService::sales_report(&db, &SalesReportFilter::default()).await.unwrap();
        assert!(is_zip(&bytes));
    }
}
