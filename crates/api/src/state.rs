//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;
use subdash_billing::{RevenueAggregator, RevenueReport, SubscriptionStore};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{auth::SupabaseJwtVerifier, config::Config, supabase::SupabaseAdminClient};

/// Last report computed from a complete snapshot
#[derive(Debug, Clone)]
pub struct LastReport {
    pub report: RevenueReport,
    pub computed_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: SubscriptionStore,
    pub aggregator: RevenueAggregator,
    pub jwt: SupabaseJwtVerifier,
    pub supabase: SupabaseAdminClient,
    /// Served with `stale: true` when the store is unreachable
    pub last_report: Arc<RwLock<Option<LastReport>>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            store: SubscriptionStore::new(pool.clone()),
            aggregator: RevenueAggregator::new(config.monthly_unit_price_cents),
            jwt: SupabaseJwtVerifier::new(&config.supabase_jwt_secret),
            supabase: SupabaseAdminClient::new(
                &config.supabase_url,
                &config.supabase_service_role_key,
            ),
            last_report: Arc::new(RwLock::new(None)),
            config: Arc::new(config),
            pool,
        }
    }
}
