//! SubDash API server

use anyhow::Context;
use subdash_api::{routes::create_router, AppState, Config};
use subdash_shared::{create_pool, init_tracing, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if config.admin_emails.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty; any authenticated user can use the dashboard");
    }
    if config.supabase_url.is_empty() || config.supabase_service_role_key.is_empty() {
        tracing::warn!("Supabase admin API not configured; adding users is disabled");
    }

    let bind_address = config.bind_address.clone();
    let app = create_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "SubDash API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("SubDash API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
