//! Scheduled expiry sweep: runs `mark_expired` on a cron schedule
//! (default: daily at midnight), independent of any request.

use crate::services::expiry::ExpiryService;
use chrono::Utc;
use cron::Schedule;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{error, info};

pub async fn run_expiry_sweeper(pool: PgPool, schedule: &str) {
    let schedule = match Schedule::from_str(schedule) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid expiry sweep schedule, sweeper not started");
            return;
        }
    };

    let service = ExpiryService::new(pool);
    info!("expiry sweeper started");

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            error!("expiry sweep schedule has no upcoming occurrence, sweeper stopped");
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match service.mark_expired().await {
            Ok(marked) => info!(marked, "scheduled expiry sweep completed"),
            Err(e) => error!(error = %e, "scheduled expiry sweep failed"),
        }
    }
}
