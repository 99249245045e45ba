//! Upcoming trial expirations
//!
//! A trial row here is one whose billing window closes within the lookahead
//! window; the operator uses the list to chase conversions before it lapses.

use serde::{Deserialize, Serialize};
use subdash_shared::{SubscriptionId, SubscriptionRecord};
use time::{Duration, OffsetDateTime};

use crate::format::format_date;

/// Default lookahead for the upcoming-trials card
pub const DEFAULT_TRIAL_WINDOW_DAYS: i64 = 14;

/// Badge severity by days left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialUrgency {
    /// Three days or fewer
    Critical,
    /// Seven days or fewer
    Warning,
    Normal,
}

impl TrialUrgency {
    pub fn for_days(days_remaining: i64) -> Self {
        if days_remaining <= 3 {
            Self::Critical
        } else if days_remaining <= 7 {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingTrial {
    pub id: SubscriptionId,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    /// "Jan 5, 2024"
    pub trial_ends_label: String,
    pub days_remaining: i64,
    pub urgency: TrialUrgency,
}

impl UpcomingTrial {
    pub fn project(record: &SubscriptionRecord, now: OffsetDateTime) -> Self {
        let days_remaining = days_remaining(record.subscription_end_date, now);
        Self {
            id: record.id,
            name: record
                .customer_ref
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            email: record
                .user_id
                .clone()
                .unwrap_or_else(|| "unknown@example.com".to_string()),
            trial_ends_at: record.subscription_end_date,
            trial_ends_label: format_date(record.subscription_end_date),
            days_remaining,
            urgency: TrialUrgency::for_days(days_remaining),
        }
    }
}

/// Whole days until `end`, rounded up; 0 when there is no end
pub fn days_remaining(end: Option<OffsetDateTime>, now: OffsetDateTime) -> i64 {
    let Some(end) = end else {
        return 0;
    };
    let nanos = (end - now).whole_nanoseconds();
    let day = Duration::DAY.whole_nanoseconds();
    let days = nanos.div_euclid(day) + i128::from(nanos.rem_euclid(day) > 0);
    days as i64
}

/// Inclusive window bounds used by the store query
pub fn trial_window(now: OffsetDateTime, days: i64) -> (OffsetDateTime, OffsetDateTime) {
    (now, now + Duration::days(days))
}

/// In-memory version of the store query: rows ending inside the window,
/// soonest first
pub fn upcoming_trials(records: &[SubscriptionRecord], now: OffsetDateTime, days: i64) -> Vec<UpcomingTrial> {
    let (from, to) = trial_window(now, days);
    let mut ending: Vec<&SubscriptionRecord> = records
        .iter()
        .filter(|r| r.subscription_end_date.is_some_and(|end| end >= from && end <= to))
        .collect();
    ending.sort_by_key(|r| r.subscription_end_date);

    ending.into_iter().map(|r| UpcomingTrial::project(r, now)).collect()
}
