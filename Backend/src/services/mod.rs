pub mod calculators;
pub mod customer_service;
pub mod diagnosis;
pub mod export_service;
pub mod feeding_service;
pub mod inventory_service;
pub mod lot_service;
pub mod notification_service;
pub mod purchase_order_service;
pub mod retail_service;
pub mod sales_report_service;
pub mod scheduler;
pub mod sequence_service;
pub mod stock_report_service;
pub mod summary_service;
pub mod supplier_service;
pub mod transfer_service;
pub mod unit_service;
pub mod user_service;
pub mod wholesale_service;

#[cfg(test)]
pub mod test_support;

use chrono::NaiveDateTime;

/// Farm-local wall clock; every timestamp and "today" is derived from it.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
