//! Daily active users chart

use axum::{extract::State, Json};
use subdash_billing::{DailyActivityPoint, ACTIVITY_CHART_DAYS};

use crate::{error::ApiResult, state::AppState};

pub async fn daily_activity(State(state): State<AppState>) -> ApiResult<Json<Vec<DailyActivityPoint>>> {
    let rows = state.store.recent_activity(ACTIVITY_CHART_DAYS).await?;

    Ok(Json(rows.iter().map(DailyActivityPoint::from).collect()))
}
