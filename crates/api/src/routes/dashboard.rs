//! Revenue dashboard

use axum::{extract::State, Json};
use serde::Serialize;
use subdash_billing::{
    format_currency, format_percentage, RevenueReport, SubscriptionMetrics,
};
use time::OffsetDateTime;

use crate::{
    error::ApiResult,
    state::{AppState, LastReport},
};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub report: RevenueReport,
    pub display: MetricsDisplay,
    /// True when the store failed and this is the last good report
    pub stale: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
}

/// Stat card values, pre-formatted
#[derive(Debug, Serialize, PartialEq)]
pub struct MetricsDisplay {
    pub mrr: String,
    pub arr: String,
    pub total_revenue: String,
    pub conversion_rate: String,
    pub churn_rate: String,
}

impl From<&SubscriptionMetrics> for MetricsDisplay {
    fn from(metrics: &SubscriptionMetrics) -> Self {
        Self {
            mrr: format_currency(metrics.mrr_cents),
            arr: format_currency(metrics.arr_cents),
            total_revenue: format_currency(metrics.total_revenue_cents),
            conversion_rate: format_percentage(metrics.conversion_rate),
            churn_rate: format_percentage(metrics.churn_rate),
        }
    }
}

impl DashboardResponse {
    fn new(last: LastReport, stale: bool) -> Self {
        Self {
            display: MetricsDisplay::from(&last.report.metrics),
            report: last.report,
            stale,
            computed_at: last.computed_at,
        }
    }
}

/// Month series and headline metrics from one fresh snapshot
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let now = OffsetDateTime::now_utc();

    match state.store.fetch_all().await {
        Ok(records) => {
            let last = LastReport {
                report: state.aggregator.aggregate(&records, now),
                computed_at: now,
            };
            *state.last_report.write().await = Some(last.clone());

            tracing::debug!(
                records = records.len(),
                months = last.report.months.len(),
                "Computed revenue report"
            );
            Ok(Json(DashboardResponse::new(last, false)))
        }
        Err(e) => {
            let cached = state.last_report.read().await.clone();
            match cached {
                Some(last) => {
                    tracing::warn!(
                        error = %e,
                        computed_at = %last.computed_at,
                        "Subscription store unavailable, serving last report"
                    );
                    Ok(Json(DashboardResponse::new(last, true)))
                }
                None => Err(e.into()),
            }
        }
    }
}
