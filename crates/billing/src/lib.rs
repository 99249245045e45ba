//! SubDash Billing
//!
//! Revenue reporting and subscriber management over the `subscriptions`
//! table:
//! - Monthly revenue, churn, and MRR/ARR aggregation
//! - Plan pricing inferred from the subscription type
//! - User directory projection, filtering, and pagination
//! - Upcoming trial expirations
//! - Daily active/trial user snapshots
//!
//! Everything except [`store`] is pure and takes `now` explicitly.

pub mod activity;
pub mod error;
pub mod format;
pub mod pricing;
pub mod revenue;
pub mod store;
pub mod trials;
pub mod users;

pub use activity::{ActivitySnapshot, DailyActivityPoint, ACTIVITY_CHART_DAYS};
pub use error::{BillingError, BillingResult};
pub use format::{format_currency, format_date, format_percentage};
pub use pricing::{infer_plan, PlanInterval, PlanPrice};
pub use revenue::{
    MonthBucket, MonthKey, RecordClass, RevenueAggregator, RevenueReport, SubscriptionMetrics,
    DEFAULT_MONTHLY_UNIT_PRICE_CENTS,
};
pub use store::SubscriptionStore;
pub use trials::{TrialUrgency, UpcomingTrial, DEFAULT_TRIAL_WINDOW_DAYS};
pub use users::{
    DashboardUser, NewSubscription, NewUserRequest, Page, StatusChange, StatusFilter, UserStatus,
    DEFAULT_PAGE_SIZE, DEFAULT_TRIAL_DAYS,
};
