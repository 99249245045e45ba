//! SubDash background worker
//!
//! Records the daily active/trial user counts charted by the dashboard.

mod activity_snapshot;
mod config;

use anyhow::Context;
use subdash_billing::SubscriptionStore;
use subdash_shared::{create_pool, init_tracing, run_migrations};
use tokio_cron_scheduler::JobScheduler;
use tracing::info;

use crate::{activity_snapshot::snapshot_job, config::WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::from_env().context("Failed to load worker configuration")?;
    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    let store = SubscriptionStore::new(pool);

    // Today's row exists even if the worker starts after the scheduled time
    activity_snapshot::run_snapshot(&store).await;

    let mut scheduler = JobScheduler::new()
        .await
        .context("Failed to create scheduler")?;
    scheduler
        .add(snapshot_job(&config.activity_snapshot_cron, store).context("Invalid ACTIVITY_SNAPSHOT_CRON")?)
        .await
        .context("Failed to schedule activity snapshot")?;
    scheduler.start().await.context("Failed to start scheduler")?;
    info!(cron = %config.activity_snapshot_cron, "SubDash worker started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down worker");
    scheduler.shutdown().await.context("Failed to stop scheduler")?;

    Ok(())
}
