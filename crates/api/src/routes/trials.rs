//! Upcoming trial expirations

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use subdash_billing::{trials::upcoming_trials, UpcomingTrial};
use time::OffsetDateTime;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Longest lookahead accepted from the query string
const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingTrialsQuery {
    pub days: Option<i64>,
}

/// Rows whose billing window closes within the lookahead, soonest first
pub async fn list_upcoming_trials(
    State(state): State<AppState>,
    Query(query): Query<UpcomingTrialsQuery>,
) -> ApiResult<Json<Vec<UpcomingTrial>>> {
    let days = query
        .days
        .unwrap_or(state.config.upcoming_trial_window_days);
    if !(0..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(ApiError::BadRequest(format!(
            "days must be between 0 and {}",
            MAX_WINDOW_DAYS
        )));
    }

    let now = OffsetDateTime::now_utc();
    let records = state.store.fetch_ending_within(now, days).await?;

    Ok(Json(upcoming_trials(&records, now, days)))
}
