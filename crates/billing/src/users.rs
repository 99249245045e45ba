//! User Directory
//!
//! Projects subscription rows (joined with optional profiles) into the user
//! list shown to operators, and builds the store changes behind the list's
//! actions: status changes and new users.
//!
//! The listing status is derived from the row's end date, not from the trial
//! columns the revenue aggregator reads: a row whose billing window is still
//! open is shown as a trial.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use subdash_shared::{Profile, StoreStatus, SubscriptionId, SubscriptionRecord};
use time::{Duration, OffsetDateTime};

use crate::error::{BillingError, BillingResult};
use crate::pricing::{infer_plan, plan_type_for, PlanInterval};

/// Default trial length applied by "start trial" and new trial users
pub const DEFAULT_TRIAL_DAYS: i64 = 14;
/// Default rows per page in the user table
pub const DEFAULT_PAGE_SIZE: usize = 5;

const UNKNOWN_NAME: &str = "Unknown User";
const UNKNOWN_EMAIL: &str = "unknown@example.com";

// =============================================================================
// Status
// =============================================================================

/// Status as presented to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Trial,
    Expired,
    Cancelled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trial => "trial",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Capitalized badge text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Trial => "Trial",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Listing status of a stored row at `now`
    pub fn derive(record: &SubscriptionRecord, now: OffsetDateTime) -> Self {
        let stored = record.store_status();
        if stored == Some(StoreStatus::Inactive) {
            Self::Expired
        } else if record.subscription_end_date.is_some_and(|end| end > now) {
            Self::Trial
        } else if stored == Some(StoreStatus::Canceled) {
            Self::Cancelled
        } else {
            Self::Active
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trial" => Ok(Self::Trial),
            "expired" => Ok(Self::Expired),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// Status filter for the user table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(UserStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: UserStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

// =============================================================================
// Projection
// =============================================================================

/// One row of the user table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardUser {
    pub id: SubscriptionId,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    pub subscription_amount_cents: i64,
    pub subscription_interval: Option<PlanInterval>,
    /// Pre-rendered "$5/mo" or "No subscription"
    pub subscription_label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
}

impl DashboardUser {
    pub fn project(record: &SubscriptionRecord, profile: Option<&Profile>, now: OffsetDateTime) -> Self {
        let (name, email) = identity_for(record, profile);
        let plan = infer_plan(record.plan_type.as_deref());
        let amount = plan.map(|p| p.amount_cents).unwrap_or(0);
        let interval = plan.map(|p| p.interval);

        Self {
            id: record.id,
            name,
            email,
            status: UserStatus::derive(record, now),
            trial_ends_at: record.subscription_end_date,
            subscription_amount_cents: amount,
            subscription_interval: interval,
            subscription_label: crate::pricing::describe_subscription(amount, interval),
            created_at: record.created_at,
            last_active: record.subscription_end_date.unwrap_or(record.created_at),
        }
    }
}

/// Project a whole snapshot, matching rows to profiles by `user_id`
pub fn project_users(
    records: &[SubscriptionRecord],
    profiles: &[Profile],
    now: OffsetDateTime,
) -> Vec<DashboardUser> {
    let by_id: HashMap<&str, &Profile> = profiles.iter().map(|p| (p.id.as_str(), p)).collect();

    records
        .iter()
        .map(|record| {
            let profile = record
                .user_id
                .as_deref()
                .and_then(|user_id| by_id.get(user_id).copied());
            DashboardUser::project(record, profile, now)
        })
        .collect()
}

/// Best-effort display name and email for a row
fn identity_for(record: &SubscriptionRecord, profile: Option<&Profile>) -> (String, String) {
    if let Some(profile) = profile {
        return (
            profile
                .display_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            profile.email.clone().unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
        );
    }

    let mut name = record.customer_ref.clone();

    match record.user_id.as_deref().filter(|u| u.contains('@')) {
        Some(email) => {
            let name = name.get_or_insert_with(|| name_from_email(email));
            (name.clone(), email.to_string())
        }
        None => (
            name.take().unwrap_or_else(|| format!("User {}", record.id)),
            format!("user-{}@example.com", record.id),
        ),
    }
}

/// "jane.doe_99@x.io" -> "Jane Doe 99"
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn filter_users(users: Vec<DashboardUser>, filter: StatusFilter) -> Vec<DashboardUser> {
    users.into_iter().filter(|u| filter.matches(u.status)).collect()
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a client-side paginated list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped into range
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Column changes for an operator-initiated status change
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub store_status: StoreStatus,
    /// Set only when starting a trial: (start, end)
    pub trial_window: Option<(OffsetDateTime, OffsetDateTime)>,
}

impl StatusChange {
    pub fn for_status(status: UserStatus, now: OffsetDateTime, trial_days: i64) -> Self {
        let store_status = match status {
            UserStatus::Expired | UserStatus::Cancelled => StoreStatus::Inactive,
            UserStatus::Active | UserStatus::Trial => StoreStatus::Active,
        };
        let trial_window =
            (status == UserStatus::Trial).then(|| (now, now + Duration::days(trial_days)));

        Self {
            store_status,
            trial_window,
        }
    }
}

/// Operator request to add a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_new_user_status")]
    pub status: UserStatus,
    #[serde(default)]
    pub subscription_interval: Option<PlanInterval>,
}

fn default_new_user_status() -> UserStatus {
    UserStatus::Trial
}

impl NewUserRequest {
    pub fn validate(&self) -> BillingResult<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(BillingError::InvalidInput(
                "Please fill out all required fields".to_string(),
            ));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(BillingError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }
        Ok(())
    }

    /// Row to insert once the auth identity exists
    pub fn to_insert(&self, user_id: String, now: OffsetDateTime, trial_days: i64) -> NewSubscription {
        let store_status = match self.status {
            UserStatus::Active => StoreStatus::Active,
            UserStatus::Cancelled => StoreStatus::Canceled,
            UserStatus::Trial | UserStatus::Expired => StoreStatus::Inactive,
        };
        let is_trial = self.status == UserStatus::Trial;
        let interval = if self.status == UserStatus::Active {
            self.subscription_interval
        } else {
            None
        };

        NewSubscription {
            user_id,
            store_status,
            plan_type: plan_type_for(interval),
            subscription_start_date: is_trial.then_some(now),
            subscription_end_date: is_trial.then(|| now + Duration::days(trial_days)),
        }
    }
}

/// Row written for a new user
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub user_id: String,
    pub store_status: StoreStatus,
    pub plan_type: &'static str,
    pub subscription_start_date: Option<OffsetDateTime>,
    pub subscription_end_date: Option<OffsetDateTime>,
}

/// `local@domain.tld` with no whitespace and exactly one '@'
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Some dot with text on both sides
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-03-15 12:00 UTC);

    fn record(id: i64) -> SubscriptionRecord {
        SubscriptionRecord::new(id, datetime!(2024-01-01 0:00 UTC))
    }

    fn profile(id: &str, name: Option<&str>, email: Option<&str>) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: name.map(str::to_string),
            email: email.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn test_derive_status() {
        let mut r = record(1);
        r.status = Some("active".to_string());
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Active);

        r.subscription_end_date = Some(datetime!(2024-03-20 0:00 UTC));
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Trial);

        r.status = Some("canceled".to_string());
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Trial);

        r.subscription_end_date = Some(datetime!(2024-03-01 0:00 UTC));
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Cancelled);

        // Inactive wins over an open window
        r.status = Some("inactive".to_string());
        r.subscription_end_date = Some(datetime!(2024-04-01 0:00 UTC));
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Expired);

        r.status = None;
        r.subscription_end_date = None;
        assert_eq!(UserStatus::derive(&r, NOW), UserStatus::Active);
    }

    #[test]
    fn test_project_with_profile() {
        let mut r = record(7);
        r.user_id = Some("uid-7".to_string());
        r.plan_type = Some("Monthly Plan".to_string());
        let profiles = vec![profile("uid-7", Some("Emma Thompson"), None)];

        let users = project_users(&[r], &profiles, NOW);

        assert_eq!(users[0].name, "Emma Thompson");
        assert_eq!(users[0].email, "unknown@example.com");
        assert_eq!(users[0].subscription_amount_cents, 500);
        assert_eq!(users[0].subscription_interval, Some(PlanInterval::Monthly));
        assert_eq!(users[0].subscription_label, "$5/mo");
    }

    #[test]
    fn test_project_email_user_id_derives_name() {
        let mut r = record(3);
        r.user_id = Some("sophia.chen-99@example.com".to_string());

        let user = DashboardUser::project(&r, None, NOW);

        assert_eq!(user.name, "Sophia Chen 99");
        assert_eq!(user.email, "sophia.chen-99@example.com");
        assert_eq!(user.subscription_label, "No subscription");
        assert_eq!(user.subscription_interval, None);
    }

    #[test]
    fn test_project_customer_ref_beats_derived_name() {
        let mut r = record(3);
        r.user_id = Some("james@example.com".to_string());
        r.customer_ref = Some("cus_123".to_string());

        let user = DashboardUser::project(&r, None, NOW);

        assert_eq!(user.name, "cus_123");
        assert_eq!(user.email, "james@example.com");
    }

    #[test]
    fn test_project_without_profile_or_email() {
        let mut r = record(12);
        r.user_id = Some("0b7f0e4c".to_string());

        let user = DashboardUser::project(&r, None, NOW);

        assert_eq!(user.name, "User 12");
        assert_eq!(user.email, "user-12@example.com");
        assert_eq!(user.last_active, r.created_at);
    }

    #[test]
    fn test_project_dates() {
        let mut r = record(1);
        r.subscription_end_date = Some(datetime!(2024-03-29 0:00 UTC));

        let user = DashboardUser::project(&r, None, NOW);

        assert_eq!(user.trial_ends_at, r.subscription_end_date);
        assert_eq!(user.last_active, datetime!(2024-03-29 0:00 UTC));
    }

    #[test]
    fn test_name_from_email() {
        assert_eq!(name_from_email("emma@example.com"), "Emma");
        assert_eq!(name_from_email("JOHN_DOE@x.io"), "John Doe");
        assert_eq!(name_from_email("a..b@x.io"), "A B");
        assert_eq!(name_from_email("@x.io"), "");
    }

    #[test]
    fn test_status_filter() {
        assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "trial".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(UserStatus::Trial))
        );
        assert!("vip".parse::<StatusFilter>().is_err());

        let mut expired = record(1);
        expired.status = Some("inactive".to_string());
        let users = project_users(&[record(2), expired], &[], NOW);

        let only_expired = filter_users(users.clone(), StatusFilter::Only(UserStatus::Expired));
        assert_eq!(only_expired.len(), 1);
        assert_eq!(only_expired[0].id, SubscriptionId(1));
        assert_eq!(filter_users(users, StatusFilter::All).len(), 2);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=12).collect();

        let first = paginate(items.clone(), 1, 5);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total, 12);

        let last = paginate(items.clone(), 3, 5);
        assert_eq!(last.items, vec![11, 12]);

        let clamped = paginate(items.clone(), 99, 5);
        assert_eq!(clamped.page, 3);
        assert_eq!(paginate(items, 0, 5).page, 1);

        let empty = paginate(Vec::<u32>::new(), 4, 5);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn test_status_change() {
        let trial = StatusChange::for_status(UserStatus::Trial, NOW, 14);
        assert_eq!(trial.store_status, StoreStatus::Active);
        assert_eq!(trial.trial_window, Some((NOW, datetime!(2024-03-29 12:00 UTC))));

        let active = StatusChange::for_status(UserStatus::Active, NOW, 14);
        assert_eq!(active.store_status, StoreStatus::Active);
        assert_eq!(active.trial_window, None);

        for status in [UserStatus::Expired, UserStatus::Cancelled] {
            let change = StatusChange::for_status(status, NOW, 14);
            assert_eq!(change.store_status, StoreStatus::Inactive);
            assert_eq!(change.trial_window, None);
        }
    }

    fn request(status: UserStatus, interval: Option<PlanInterval>) -> NewUserRequest {
        NewUserRequest {
            name: "Ava Wilson".to_string(),
            email: "ava@example.com".to_string(),
            status,
            subscription_interval: interval,
        }
    }

    #[test]
    fn test_new_user_validation() {
        assert!(request(UserStatus::Trial, None).validate().is_ok());

        let mut missing = request(UserStatus::Trial, None);
        missing.name = "  ".to_string();
        assert!(matches!(missing.validate(), Err(BillingError::InvalidInput(_))));

        let mut bad_email = request(UserStatus::Trial, None);
        bad_email.email = "ava@example".to_string();
        assert!(matches!(bad_email.validate(), Err(BillingError::InvalidInput(_))));
    }

    #[test]
    fn test_new_user_insert_mapping() {
        let trial = request(UserStatus::Trial, Some(PlanInterval::Monthly)).to_insert("u1".into(), NOW, 14);
        assert_eq!(trial.store_status, StoreStatus::Inactive);
        assert_eq!(trial.plan_type, "Free Plan");
        assert_eq!(trial.subscription_start_date, Some(NOW));
        assert_eq!(trial.subscription_end_date, Some(datetime!(2024-03-29 12:00 UTC)));

        let active = request(UserStatus::Active, Some(PlanInterval::Yearly)).to_insert("u2".into(), NOW, 14);
        assert_eq!(active.store_status, StoreStatus::Active);
        assert_eq!(active.plan_type, "Yearly Plan");
        assert_eq!(active.subscription_start_date, None);
        assert_eq!(active.subscription_end_date, None);

        let cancelled = request(UserStatus::Cancelled, None).to_insert("u3".into(), NOW, 14);
        assert_eq!(cancelled.store_status, StoreStatus::Canceled);
        assert_eq!(cancelled.user_id, "u3");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("emma@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.io"));
        assert!(!is_valid_email("emma@example"));
        assert!(!is_valid_email("emma@.com"));
        assert!(!is_valid_email("emma@example."));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("em ma@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn test_new_user_request_defaults() {
        let req: NewUserRequest =
            serde_json::from_str(r#"{"name":"Ethan","email":"ethan@example.com"}"#).unwrap();
        assert_eq!(req.status, UserStatus::Trial);
        assert_eq!(req.subscription_interval, None);
    }
}
