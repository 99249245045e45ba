//! Subscription Record Store
//!
//! Thin sqlx service over the `subscriptions`, `profiles`, and
//! `daily_active_users` tables. Reads are full snapshots; filtering and
//! aggregation happen in memory.

use sqlx::PgPool;
use subdash_shared::{DailyActiveUsersRow, Profile, SubscriptionId, SubscriptionRecord};
use time::OffsetDateTime;

use crate::activity::ActivitySnapshot;
use crate::error::{BillingError, BillingResult};
use crate::trials::trial_window;
use crate::users::{NewSubscription, StatusChange};

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, user_id, stripe_customer_id, stripe_subscription_id, status, type,
    trial_start_date, trial_end_date, subscription_start_date,
    subscription_end_date, created_at
"#;

/// Service for reading and writing subscription records
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: PgPool,
}

impl SubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Full-table snapshot, no filtering pushed down
    pub async fn fetch_all(&self) -> BillingResult<Vec<SubscriptionRecord>> {
        let records: Vec<SubscriptionRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions ORDER BY id",
            SUBSCRIPTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Profiles for the given auth user ids
    pub async fn fetch_profiles(&self, user_ids: &[String]) -> BillingResult<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles: Vec<Profile> = sqlx::query_as(
            r#"
            SELECT id, display_name, email, created_at
            FROM profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    /// Rows whose billing window closes within `days` of `now`, soonest first
    pub async fn fetch_ending_within(
        &self,
        now: OffsetDateTime,
        days: i64,
    ) -> BillingResult<Vec<SubscriptionRecord>> {
        let (from, to) = trial_window(now, days);
        let records: Vec<SubscriptionRecord> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE subscription_end_date >= $1
              AND subscription_end_date <= $2
            ORDER BY subscription_end_date ASC
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn delete(&self, id: SubscriptionId) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BillingError::SubscriptionNotFound(id.to_string()));
        }

        tracing::info!(subscription_id = %id, "Deleted subscription record");
        Ok(())
    }

    /// Apply a status change; trial windows replace both subscription dates
    pub async fn update_status(
        &self,
        id: SubscriptionId,
        change: &StatusChange,
    ) -> BillingResult<SubscriptionRecord> {
        let sql = match change.trial_window {
            Some(_) => format!(
                r#"
                UPDATE subscriptions
                SET status = $2, subscription_start_date = $3, subscription_end_date = $4
                WHERE id = $1
                RETURNING {}
                "#,
                SUBSCRIPTION_COLUMNS
            ),
            None => format!(
                "UPDATE subscriptions SET status = $2 WHERE id = $1 RETURNING {}",
                SUBSCRIPTION_COLUMNS
            ),
        };

        let mut query = sqlx::query_as(&sql)
            .bind(id)
            .bind(change.store_status.as_str());
        if let Some((start, end)) = change.trial_window {
            query = query.bind(start).bind(end);
        }

        let record: SubscriptionRecord = query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BillingError::SubscriptionNotFound(id.to_string()))?;

        tracing::info!(
            subscription_id = %id,
            status = %change.store_status,
            trial = change.trial_window.is_some(),
            "Updated subscription status"
        );
        Ok(record)
    }

    pub async fn insert(&self, new: &NewSubscription) -> BillingResult<SubscriptionRecord> {
        let record: SubscriptionRecord = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions
                (stripe_customer_id, user_id, status, subscription_start_date, subscription_end_date, type)
            VALUES (NULL, $1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(&new.user_id)
        .bind(new.store_status.as_str())
        .bind(new.subscription_start_date)
        .bind(new.subscription_end_date)
        .bind(new.plan_type)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(subscription_id = %record.id, status = %new.store_status, "Created subscription record");
        Ok(record)
    }

    /// Name and email for a newly created auth user
    pub async fn upsert_profile(&self, user_id: &str, display_name: &str, email: &str) -> BillingResult<Profile> {
        let profile: Profile = sqlx::query_as(
            r#"
            INSERT INTO profiles (id, display_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                email = EXCLUDED.email
            RETURNING id, display_name, email, created_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Most recent `days` activity rows, oldest first
    pub async fn recent_activity(&self, days: i64) -> BillingResult<Vec<DailyActiveUsersRow>> {
        let rows: Vec<DailyActiveUsersRow> = sqlx::query_as(
            r#"
            SELECT id, date, active_users, trial_users, created_at
            FROM (
                SELECT id, date, active_users, trial_users, created_at
                FROM daily_active_users
                ORDER BY date DESC
                LIMIT $1
            ) recent
            ORDER BY date ASC
            "#,
        )
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Upsert one day's snapshot
    pub async fn record_activity(&self, snapshot: &ActivitySnapshot) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_active_users (date, active_users, trial_users)
            VALUES ($1, $2, $3)
            ON CONFLICT (date) DO UPDATE
            SET active_users = EXCLUDED.active_users,
                trial_users = EXCLUDED.trial_users
            "#,
        )
        .bind(snapshot.date)
        .bind(snapshot.active_users)
        .bind(snapshot.trial_users)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
