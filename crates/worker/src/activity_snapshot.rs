//! Daily active/trial user snapshot
//!
//! Counts the current snapshot with the revenue report's classification and
//! upserts one row per UTC day into `daily_active_users`.

use subdash_billing::{ActivitySnapshot, SubscriptionStore};
use subdash_shared::{SubdashError, SubdashResult};
use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobSchedulerError};
use tracing::{error, info};

/// Capture and store today's counts
pub async fn record_daily_snapshot(
    store: &SubscriptionStore,
    now: OffsetDateTime,
) -> SubdashResult<ActivitySnapshot> {
    let records = store
        .fetch_all()
        .await
        .map_err(|e| SubdashError::Database(e.to_string()))?;

    let snapshot = ActivitySnapshot::capture(&records, now);
    store
        .record_activity(&snapshot)
        .await
        .map_err(|e| SubdashError::Database(e.to_string()))?;

    Ok(snapshot)
}

/// Run one snapshot, logging instead of failing so the schedule keeps going
pub async fn run_snapshot(store: &SubscriptionStore) {
    match record_daily_snapshot(store, OffsetDateTime::now_utc()).await {
        Ok(snapshot) => info!(
            date = %snapshot.date,
            active_users = snapshot.active_users,
            trial_users = snapshot.trial_users,
            "Recorded daily activity snapshot"
        ),
        Err(e) => error!(error = %e, "Failed to record daily activity snapshot"),
    }
}

/// Cron job wrapping [`run_snapshot`]
pub fn snapshot_job(cron: &str, store: SubscriptionStore) -> Result<Job, JobSchedulerError> {
    Job::new_async(cron, move |_id, _scheduler| {
        let store = store.clone();
        Box::pin(async move {
            run_snapshot(&store).await;
        })
    })
}
