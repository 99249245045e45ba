//! Common types used across SubDash

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

// =============================================================================
// ID Wrappers
// =============================================================================

/// Subscription row ID wrapper (BIGSERIAL in the store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SubscriptionId(pub i64);

impl From<i64> for SubscriptionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status as recorded in the `subscriptions.status` column.
///
/// Trial timing is tracked separately through `trial_end_date`; a row can be
/// `active` here and still be trialing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Active,
    Inactive,
    Canceled,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

// =============================================================================
// Store Rows
// =============================================================================

/// One row of the `subscriptions` table.
///
/// Every column except `id` and `created_at` is nullable; readers treat an
/// absent value as "not set" rather than as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub user_id: Option<String>,
    #[sqlx(rename = "stripe_customer_id")]
    pub customer_ref: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Raw status text; see [`SubscriptionRecord::store_status`]
    pub status: Option<String>,
    #[sqlx(rename = "type")]
    pub plan_type: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_end_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_end_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SubscriptionRecord {
    /// A bare record with only the required columns set
    pub fn new(id: impl Into<SubscriptionId>, created_at: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            customer_ref: None,
            stripe_subscription_id: None,
            status: None,
            plan_type: None,
            trial_start_date: None,
            trial_end_date: None,
            subscription_start_date: None,
            subscription_end_date: None,
            created_at,
        }
    }

    /// Parsed status, `None` when the column is empty or holds an unknown value
    pub fn store_status(&self) -> Option<StoreStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Exact `status == "active"` check used by all revenue rules
    pub fn is_status_active(&self) -> bool {
        self.status.as_deref() == Some(StoreStatus::Active.as_str())
    }

    /// Trialing means a trial end strictly after `now`, whatever the status says
    pub fn is_trialing(&self, now: OffsetDateTime) -> bool {
        self.trial_end_date.is_some_and(|end| end > now)
    }

    /// Billing ended and the row is no longer active
    pub fn is_churned(&self) -> bool {
        self.subscription_end_date.is_some() && !self.is_status_active()
    }
}

/// One row of the `profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// One row of the `daily_active_users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyActiveUsersRow {
    pub id: i64,
    pub date: Date,
    pub active_users: i32,
    pub trial_users: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}
