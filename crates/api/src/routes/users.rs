//! User management routes

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use subdash_billing::{
    users::{filter_users, paginate, project_users},
    BillingError, DashboardUser, NewUserRequest, Page, StatusChange, StatusFilter, UserStatus,
};
use subdash_shared::{Profile, SubscriptionId, SubscriptionRecord};
use time::OffsetDateTime;

use crate::{
    auth::AdminUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// "all" or one of the listing statuses
    pub status: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

// =============================================================================
// Handlers
// =============================================================================

/// Filtered, paginated user table
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Page<DashboardUser>>> {
    let filter: StatusFilter = query
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;

    let now = OffsetDateTime::now_utc();
    let records = state.store.fetch_all().await?;
    let profiles = load_profiles(&state, &records).await?;

    let users = filter_users(project_users(&records, &profiles, now), filter);
    Ok(Json(paginate(
        users,
        query.page.unwrap_or(1),
        state.config.users_page_size,
    )))
}

/// Add a user: auth identity first, then its subscription row
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(request): Json<NewUserRequest>,
) -> ApiResult<(StatusCode, Json<DashboardUser>)> {
    request.validate()?;

    let name = request.name.trim();
    let email = request.email.trim();
    let user_id = state.supabase.create_user(email, name).await?;

    let now = OffsetDateTime::now_utc();
    let stored = async {
        let record = state
            .store
            .insert(&request.to_insert(user_id.clone(), now, state.config.trial_length_days))
            .await?;
        let profile = state.store.upsert_profile(&user_id, name, email).await?;
        Ok::<_, BillingError>((record, profile))
    }
    .await;

    // The auth identity already exists at this point and is not rolled back
    let (record, profile) = stored.inspect_err(|e| {
        tracing::error!(
            admin_id = %admin.user_id,
            user_id = %user_id,
            error = %e,
            "Auth user created but its records were not stored; orphaned auth user"
        );
    })?;

    tracing::info!(
        admin_id = %admin.user_id,
        subscription_id = %record.id,
        status = %request.status,
        "Operator added user"
    );

    Ok((
        StatusCode::CREATED,
        Json(DashboardUser::project(&record, Some(&profile), now)),
    ))
}

/// Move a user to another listing status
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<DashboardUser>> {
    let now = OffsetDateTime::now_utc();
    let change = StatusChange::for_status(request.status, now, state.config.trial_length_days);
    let record = state
        .store
        .update_status(SubscriptionId(id), &change)
        .await?;
    let profiles = load_profiles(&state, std::slice::from_ref(&record)).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        subscription_id = id,
        status = %request.status,
        "Operator changed user status"
    );

    Ok(Json(DashboardUser::project(&record, profiles.first(), now)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.delete(SubscriptionId(id)).await?;

    tracing::info!(admin_id = %admin.user_id, subscription_id = id, "Operator deleted user");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_profiles(state: &AppState, records: &[SubscriptionRecord]) -> ApiResult<Vec<Profile>> {
    let mut user_ids: Vec<String> = records.iter().filter_map(|r| r.user_id.clone()).collect();
    user_ids.sort();
    user_ids.dedup();

    Ok(state.store.fetch_profiles(&user_ids).await?)
}
