//! Hourly background jobs: the low-stock sweep and expired reset-code cleanup.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::db::OtpRepository;
use crate::services::notifications::NotificationService;
use crate::state::AppState;

/// How often the jobs run.
pub const JOB_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawn the job loop. The first run happens immediately.
pub fn spawn_background_jobs(state: AppState) -> JoinHandle<()> {
    info!("Spawning background jobs");
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(JOB_INTERVAL);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            run_jobs(&state).await;
        }
    })
}

/// Run every job once, logging results. Failures never stop the loop.
pub async fn run_jobs(state: &AppState) {
    match NotificationService::new(state.pool(), state.email())
        .sweep_low_stock()
        .await
    {
        Ok(alerts) => info!(alerts, "Low-stock sweep finished"),
        Err(e) => error!(error = %e, "Low-stock sweep failed"),
    }

    match OtpRepository::new(state.pool()).delete_expired().await {
        Ok(deleted) => info!(deleted, "Expired reset codes removed"),
        Err(e) => error!(error = %e, "Reset code cleanup failed"),
    }
}
