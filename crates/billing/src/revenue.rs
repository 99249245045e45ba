//! Revenue Aggregation
//!
//! Turns a full snapshot of subscription records into the per-month revenue
//! series and the headline metrics shown on the dashboard.
//!
//! ## Rules
//!
//! 1. **Classification**: a record whose `trial_end_date` is after `now` is
//!    trialing and never earns revenue. Otherwise it is active when its status
//!    is exactly `active`.
//! 2. **Month walk**: every non-trialing record with a start date is walked
//!    forward by incrementing the month field of the visited date, until its
//!    month passes the end month (or the month of `now`). A day that does not
//!    exist in the next month overflows into the one after it, so Jan 31 steps
//!    to Mar 2 and February is never visited. Each visited month past the
//!    trial end earns one flat unit price, whatever the plan claims to cost.
//! 3. **Attribution**: the start month counts one new subscriber; the end month
//!    counts one churned subscriber when the record ended and is not active.
//! 4. **Deterministic**: `now` is a parameter. Nothing here reads the clock or
//!    touches the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use subdash_shared::SubscriptionRecord;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

/// Flat monthly price used for revenue accrual ($5)
pub const DEFAULT_MONTHLY_UNIT_PRICE_CENTS: i64 = 500;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Abbreviated English month name for a 1-based month number
pub fn month_label(month: u8) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_LABELS.get(usize::from(index)))
        .copied()
        .unwrap_or("???")
}

// =============================================================================
// Classification
// =============================================================================

/// Disjoint classes a record falls into relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClass {
    /// Trial ends after `now`; counted as a trial user, never billed
    Trialing,
    /// Not trialing and status is `active`
    BillableActive,
    /// Inactive, canceled, or unknown status
    Other,
}

impl RecordClass {
    pub fn of(record: &SubscriptionRecord, now: OffsetDateTime) -> Self {
        if record.is_trialing(now) {
            Self::Trialing
        } else if record.is_status_active() {
            Self::BillableActive
        } else {
            Self::Other
        }
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Calendar month key, compared as (year, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u8,
}

impl MonthKey {
    /// Month containing `at`, taken in UTC
    pub fn of(at: OffsetDateTime) -> Self {
        let utc = at.to_offset(UtcOffset::UTC);
        Self {
            year: utc.year(),
            month: u8::from(utc.month()),
        }
    }
}

/// Revenue and subscriber movement for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month_order: u8,
    pub month_label: String,
    /// Chart axis label, e.g. "Jan 2024"
    pub formatted_month: String,
    pub revenue_cents: i64,
    pub new_subscribers: u32,
    pub churned_subscribers: u32,
}

impl MonthBucket {
    fn empty(key: MonthKey) -> Self {
        let label = month_label(key.month);
        Self {
            year: key.year,
            month_order: key.month,
            month_label: label.to_string(),
            formatted_month: format!("{} {}", label, key.year),
            revenue_cents: 0,
            new_subscribers: 0,
            churned_subscribers: 0,
        }
    }

    pub fn key(&self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: self.month_order,
        }
    }
}

/// Headline metrics for the stat cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionMetrics {
    pub mrr_cents: i64,
    pub arr_cents: i64,
    pub total_revenue_cents: i64,
    pub active_users: u64,
    pub trial_users: u64,
    /// Active records over all records, 0 when there are none
    pub conversion_rate: f64,
    /// Ended non-active records over all records, 0 when there are none
    pub churn_rate: f64,
}

/// Everything the dashboard renders from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    /// Sorted ascending by (year, month)
    pub months: Vec<MonthBucket>,
    pub metrics: SubscriptionMetrics,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Stateless aggregator; each call starts from an empty bucket set
#[derive(Debug, Clone, Copy)]
pub struct RevenueAggregator {
    unit_price_cents: i64,
}

impl Default for RevenueAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MONTHLY_UNIT_PRICE_CENTS)
    }
}

impl RevenueAggregator {
    pub fn new(unit_price_cents: i64) -> Self {
        Self { unit_price_cents }
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    /// Aggregate a full snapshot as of `now`
    pub fn aggregate(&self, records: &[SubscriptionRecord], now: OffsetDateTime) -> RevenueReport {
        let mut buckets: BTreeMap<MonthKey, MonthBucket> = BTreeMap::new();
        let mut active_users = 0u64;
        let mut trial_users = 0u64;
        let mut churned = 0u64;

        for record in records {
            match RecordClass::of(record, now) {
                RecordClass::Trialing => {
                    trial_users += 1;
                }
                class => {
                    if class == RecordClass::BillableActive {
                        active_users += 1;
                    }
                    self.accumulate(record, now, &mut buckets);
                }
            }

            if record.is_churned() {
                churned += 1;
            }
        }

        let mrr_cents = self.current_mrr(&buckets, active_users, now);
        let total_revenue_cents = buckets.values().map(|b| b.revenue_cents).sum();
        let total = records.len() as u64;

        RevenueReport {
            months: buckets.into_values().collect(),
            metrics: SubscriptionMetrics {
                mrr_cents,
                arr_cents: mrr_cents * 12,
                total_revenue_cents,
                active_users,
                trial_users,
                conversion_rate: ratio(active_users, total),
                churn_rate: ratio(churned, total),
            },
        }
    }

    /// Walk one record's billable window into the bucket set
    fn accumulate(
        &self,
        record: &SubscriptionRecord,
        now: OffsetDateTime,
        buckets: &mut BTreeMap<MonthKey, MonthBucket>,
    ) {
        let Some(start) = record.subscription_start_date else {
            return;
        };
        let end = record.subscription_end_date.unwrap_or(now);

        let start_key = MonthKey::of(start);
        let end_key = MonthKey::of(end);
        if start_key > end_key {
            return;
        }

        // Attributed before the walk, so the start bucket exists even when
        // the trial swallows its revenue
        bucket(buckets, start_key).new_subscribers += 1;

        let mut visited = start.to_offset(UtcOffset::UTC);
        loop {
            let key = MonthKey::of(visited);
            if key > end_key {
                break;
            }
            if !record.trial_end_date.is_some_and(|trial_end| visited <= trial_end) {
                bucket(buckets, key).revenue_cents += self.unit_price_cents;
            }
            visited = match next_month(visited) {
                Some(next) => next,
                None => break,
            };
        }

        if record.is_churned() {
            bucket(buckets, end_key).churned_subscribers += 1;
        }
    }

    /// December of the current year, else the current month, else the
    /// active count at the unit price
    fn current_mrr(
        &self,
        buckets: &BTreeMap<MonthKey, MonthBucket>,
        active_users: u64,
        now: OffsetDateTime,
    ) -> i64 {
        let current = MonthKey::of(now);
        let december = MonthKey {
            year: current.year,
            month: 12,
        };

        buckets
            .get(&december)
            .or_else(|| buckets.get(&current))
            .map(|b| b.revenue_cents)
            .unwrap_or_else(|| active_users as i64 * self.unit_price_cents)
    }
}

fn bucket(buckets: &mut BTreeMap<MonthKey, MonthBucket>, key: MonthKey) -> &mut MonthBucket {
    buckets.entry(key).or_insert_with(|| MonthBucket::empty(key))
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// `at` with its month field incremented, in UTC. Days past the end of the
/// next month spill into the month after it (Jan 31 -> Mar 2 in a leap year).
/// `None` only when the result leaves the supported date range.
pub fn next_month(at: OffsetDateTime) -> Option<OffsetDateTime> {
    let at = at.to_offset(UtcOffset::UTC);
    let year = match at.month() {
        Month::December => at.year().checked_add(1)?,
        _ => at.year(),
    };

    let first = Date::from_calendar_date(year, at.month().next(), 1).ok()?;
    let date = first.checked_add(Duration::days(i64::from(at.day()) - 1))?;
    Some(at.replace_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const UNIT: i64 = 5;

    fn aggregator() -> RevenueAggregator {
        RevenueAggregator::new(UNIT)
    }

    fn record(id: i64, status: &str) -> SubscriptionRecord {
        let mut r = SubscriptionRecord::new(id, datetime!(2024-01-01 0:00 UTC));
        r.status = Some(status.to_string());
        r
    }

    fn find(report: &RevenueReport, year: i32, month: u8) -> &MonthBucket {
        report
            .months
            .iter()
            .find(|b| b.year == year && b.month_order == month)
            .unwrap_or_else(|| panic!("no bucket for {}-{}", year, month))
    }

    #[test]
    fn test_scenario_a_active_without_end() {
        let mut r = record(1, "active");
        r.subscription_start_date = Some(datetime!(2024-01-01 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-03-15 12:00 UTC));

        assert_eq!(report.months.len(), 3);
        for (month, label) in [(1, "Jan"), (2, "Feb"), (3, "Mar")] {
            let b = find(&report, 2024, month);
            assert_eq!(b.revenue_cents, 5);
            assert_eq!(b.month_label, label);
            assert_eq!(b.churned_subscribers, 0);
        }
        assert_eq!(find(&report, 2024, 1).new_subscribers, 1);
        assert_eq!(find(&report, 2024, 2).new_subscribers, 0);
        assert_eq!(report.metrics.active_users, 1);
        assert_eq!(report.metrics.trial_users, 0);
        assert_eq!(report.metrics.total_revenue_cents, 15);
        // No December bucket, so the current month wins
        assert_eq!(report.metrics.mrr_cents, 5);
        assert_eq!(report.metrics.arr_cents, 60);
        assert_eq!(report.metrics.conversion_rate, 1.0);
        assert_eq!(report.metrics.churn_rate, 0.0);
    }

    #[test]
    fn test_scenario_b_trial_month_keeps_new_subscriber_bucket() {
        let mut r = record(1, "active");
        r.subscription_start_date = Some(datetime!(2024-01-01 0:00 UTC));
        r.trial_end_date = Some(datetime!(2024-01-20 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-03-15 12:00 UTC));

        let jan = find(&report, 2024, 1);
        assert_eq!(jan.revenue_cents, 0);
        assert_eq!(jan.new_subscribers, 1);
        assert_eq!(find(&report, 2024, 2).revenue_cents, 5);
        assert_eq!(find(&report, 2024, 3).revenue_cents, 5);
        assert_eq!(report.metrics.total_revenue_cents, 10);
        assert_eq!(report.metrics.active_users, 1);
        assert_eq!(report.metrics.trial_users, 0);
    }

    #[test]
    fn test_scenario_c_canceled_with_end_date() {
        let mut r = record(1, "canceled");
        r.subscription_start_date = Some(datetime!(2024-01-01 0:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-03-01 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-06-15 12:00 UTC));

        assert_eq!(report.months.len(), 3);
        assert_eq!(find(&report, 2024, 1).revenue_cents, 5);
        assert_eq!(find(&report, 2024, 2).revenue_cents, 5);
        let mar = find(&report, 2024, 3);
        assert_eq!(mar.revenue_cents, 5);
        assert_eq!(mar.churned_subscribers, 1);
        assert_eq!(report.metrics.active_users, 0);
        assert_eq!(report.metrics.churn_rate, 1.0);
        assert_eq!(report.metrics.conversion_rate, 0.0);
        // Neither December nor June has a bucket and nobody is active
        assert_eq!(report.metrics.mrr_cents, 0);
    }

    #[test]
    fn test_scenario_d_empty_snapshot() {
        let report = aggregator().aggregate(&[], datetime!(2024-03-15 12:00 UTC));

        assert!(report.months.is_empty());
        assert_eq!(report.metrics, SubscriptionMetrics::default());
        assert!(!report.metrics.conversion_rate.is_nan());
        assert!(!report.metrics.churn_rate.is_nan());
    }

    #[test]
    fn test_trialing_record_earns_nothing_even_with_history() {
        let mut r = record(1, "active");
        r.subscription_start_date = Some(datetime!(2023-06-01 0:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-12-01 0:00 UTC));
        r.trial_end_date = Some(datetime!(2024-04-01 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-03-15 12:00 UTC));

        assert!(report.months.is_empty());
        assert_eq!(report.metrics.trial_users, 1);
        assert_eq!(report.metrics.active_users, 0);
        assert_eq!(report.metrics.total_revenue_cents, 0);
    }

    #[test]
    fn test_ended_trial_only_excludes_months_on_or_before_trial_end() {
        let mut r = record(1, "active");
        r.subscription_start_date = Some(datetime!(2023-11-10 0:00 UTC));
        // Visited dates: Nov 10, Dec 10, Jan 10, Feb 10, Mar 10
        r.trial_end_date = Some(datetime!(2024-01-10 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-03-15 12:00 UTC));

        // Only the start month exists among the trial months, via attribution
        let nov = find(&report, 2023, 11);
        assert_eq!(nov.revenue_cents, 0);
        assert_eq!(nov.new_subscribers, 1);
        assert!(!report.months.iter().any(|b| b.key() == MonthKey { year: 2023, month: 12 }));
        // Equal to the trial end still counts as trial
        assert!(!report.months.iter().any(|b| b.key() == MonthKey { year: 2024, month: 1 }));
        assert_eq!(find(&report, 2024, 2).revenue_cents, 5);
        assert_eq!(find(&report, 2024, 3).revenue_cents, 5);
        assert_eq!(report.months.len(), 3);
    }

    #[test]
    fn test_month_walk_overflows_short_months() {
        let mut r = record(1, "canceled");
        r.subscription_start_date = Some(datetime!(2024-01-31 9:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-04-30 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-06-01 0:00 UTC));

        // Jan 31 -> Mar 2 -> Apr 2: February is skipped
        let months: Vec<u8> = report.months.iter().map(|b| b.month_order).collect();
        assert_eq!(months, vec![1, 3, 4]);
        assert!(!report.months.iter().any(|b| b.month_order == 2));
        assert_eq!(report.metrics.total_revenue_cents, 15);
        assert_eq!(find(&report, 2024, 4).churned_subscribers, 1);
    }

    #[test]
    fn test_end_month_is_inclusive_even_when_day_is_earlier() {
        let mut r = record(1, "inactive");
        r.subscription_start_date = Some(datetime!(2024-01-15 0:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-03-10 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-06-01 0:00 UTC));

        assert_eq!(find(&report, 2024, 3).revenue_cents, 5);
        assert_eq!(report.metrics.total_revenue_cents, 15);
    }

    #[test]
    fn test_buckets_span_year_boundary_in_order() {
        let mut a = record(1, "active");
        a.subscription_start_date = Some(datetime!(2023-11-05 0:00 UTC));
        let mut b = record(2, "active");
        b.subscription_start_date = Some(datetime!(2024-01-20 0:00 UTC));

        let report = aggregator().aggregate(&[b, a], datetime!(2024-02-10 0:00 UTC));

        let keys: Vec<(i32, u8)> = report.months.iter().map(|m| (m.year, m.month_order)).collect();
        assert_eq!(keys, vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
        assert_eq!(find(&report, 2024, 1).revenue_cents, 10);
        assert_eq!(find(&report, 2024, 1).new_subscribers, 1);
        assert_eq!(find(&report, 2023, 11).formatted_month, "Nov 2023");
    }

    #[test]
    fn test_mrr_prefers_december_of_current_year() {
        let mut r = record(1, "active");
        r.subscription_start_date = Some(datetime!(2024-01-01 0:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-12-31 0:00 UTC));
        let mut other = record(2, "active");
        other.subscription_start_date = Some(datetime!(2024-03-01 0:00 UTC));

        let report = aggregator().aggregate(&[r, other], datetime!(2024-03-15 0:00 UTC));

        // December only holds the first record; March holds both
        assert_eq!(find(&report, 2024, 12).revenue_cents, 5);
        assert_eq!(find(&report, 2024, 3).revenue_cents, 10);
        assert_eq!(report.metrics.mrr_cents, 5);
        assert_eq!(report.metrics.arr_cents, 60);
    }

    #[test]
    fn test_mrr_falls_back_to_active_count() {
        // Active but without a start date, so no buckets at all
        let records = vec![record(1, "active"), record(2, "active"), record(3, "inactive")];

        let report = aggregator().aggregate(&records, datetime!(2024-03-15 0:00 UTC));

        assert!(report.months.is_empty());
        assert_eq!(report.metrics.active_users, 2);
        assert_eq!(report.metrics.mrr_cents, 10);
        assert_eq!(report.metrics.arr_cents, 120);
    }

    #[test]
    fn test_end_before_start_contributes_nothing() {
        let mut r = record(1, "canceled");
        r.subscription_start_date = Some(datetime!(2024-05-01 0:00 UTC));
        r.subscription_end_date = Some(datetime!(2024-02-01 0:00 UTC));

        let report = aggregator().aggregate(&[r], datetime!(2024-06-01 0:00 UTC));

        assert!(report.months.is_empty());
        // Still an ended, non-active record for the churn rate
        assert_eq!(report.metrics.churn_rate, 1.0);
    }

    #[test]
    fn test_unknown_status_is_other() {
        let mut r = record(1, "paused");
        r.subscription_start_date = Some(datetime!(2024-03-01 0:00 UTC));
        let now = datetime!(2024-03-15 0:00 UTC);

        assert_eq!(RecordClass::of(&r, now), RecordClass::Other);
        let report = aggregator().aggregate(&[r], now);
        assert_eq!(report.metrics.active_users, 0);
        // History is still scanned
        assert_eq!(report.metrics.total_revenue_cents, 5);
    }

    #[test]
    fn test_record_class_trial_wins_over_status() {
        let now = datetime!(2024-03-15 0:00 UTC);
        let mut r = record(1, "active");
        assert_eq!(RecordClass::of(&r, now), RecordClass::BillableActive);

        r.trial_end_date = Some(datetime!(2024-03-20 0:00 UTC));
        assert_eq!(RecordClass::of(&r, now), RecordClass::Trialing);

        r.status = Some("canceled".to_string());
        assert_eq!(RecordClass::of(&r, now), RecordClass::Trialing);
    }

    #[test]
    fn test_month_key_uses_utc() {
        let at = datetime!(2024-03-01 1:00 +03:00);
        assert_eq!(MonthKey::of(at), MonthKey { year: 2024, month: 2 });
    }

    #[test]
    fn test_next_month() {
        assert_eq!(
            next_month(datetime!(2024-01-31 8:30 UTC)),
            Some(datetime!(2024-03-02 8:30 UTC))
        );
        assert_eq!(
            next_month(datetime!(2023-01-31 8:30 UTC)),
            Some(datetime!(2023-03-03 8:30 UTC))
        );
        assert_eq!(
            next_month(datetime!(2023-12-31 8:30 UTC)),
            Some(datetime!(2024-01-31 8:30 UTC))
        );
        assert_eq!(
            next_month(datetime!(2024-03-02 8:30 UTC)),
            Some(datetime!(2024-04-02 8:30 UTC))
        );
        assert_eq!(
            next_month(datetime!(2024-02-15 23:00 -02:00)),
            Some(datetime!(2024-03-16 1:00 UTC))
        );
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(12), "Dec");
        assert_eq!(month_label(0), "???");
        assert_eq!(month_label(13), "???");
    }

    #[test]
    fn test_default_unit_price() {
        assert_eq!(RevenueAggregator::default().unit_price_cents(), 500);
    }
}
