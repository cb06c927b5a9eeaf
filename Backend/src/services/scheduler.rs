// Periodic background jobs

use chrono::Duration as ChronoDuration;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tracing::{error, info};

use crate::services::now;
use crate::services::summary_service::SummaryService;

/// Runs the unit summary for "yesterday" every `interval_secs` (first run at
/// startup). 0 disables the job.
pub fn spawn_daily_summary(db: DatabaseConnection, interval_secs: u64) {
    if interval_secs == 0 {
        info!("⏸️  Daily unit summary job disabled");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        info!("⏰ Daily unit summary job every {}s", interval_secs);

        loop {
            interval.tick().await;

            let yesterday = now().date() - ChronoDuration::days(1);
            if let Err(e) = SummaryService::summarize_day(&db, yesterday).await {
                error!("❌ Unit summary for {} failed: {}", yesterday, e);
            }
        }
    });
}
