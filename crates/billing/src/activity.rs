//! Daily active/trial user counts
//!
//! The worker captures one snapshot per day; the dashboard charts the most
//! recent points.

use serde::{Deserialize, Serialize};
use subdash_shared::{DailyActiveUsersRow, SubscriptionRecord};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::revenue::{month_label, RecordClass};

/// Points shown on the activity chart
pub const ACTIVITY_CHART_DAYS: i64 = 30;

/// One chart point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivityPoint {
    /// Axis label, e.g. "5 Jan"
    pub label: String,
    pub date: Date,
    pub active: i32,
    pub trial: i32,
}

impl From<&DailyActiveUsersRow> for DailyActivityPoint {
    fn from(row: &DailyActiveUsersRow) -> Self {
        Self {
            label: day_label(row.date),
            date: row.date,
            active: row.active_users,
            trial: row.trial_users,
        }
    }
}

pub fn day_label(date: Date) -> String {
    format!("{} {}", date.day(), month_label(u8::from(date.month())))
}

/// Active and trial counts for one day, classified like the revenue report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub date: Date,
    pub active_users: i32,
    pub trial_users: i32,
}

impl ActivitySnapshot {
    pub fn capture(records: &[SubscriptionRecord], now: OffsetDateTime) -> Self {
        let (mut active, mut trial) = (0i32, 0i32);
        for record in records {
            match RecordClass::of(record, now) {
                RecordClass::Trialing => trial = trial.saturating_add(1),
                RecordClass::BillableActive => active = active.saturating_add(1),
                RecordClass::Other => {}
            }
        }

        Self {
            date: now.to_offset(UtcOffset::UTC).date(),
            active_users: active,
            trial_users: trial,
        }
    }
}
