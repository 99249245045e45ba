//! Plan pricing inferred from the free-text plan descriptor
//!
//! The store keeps only a descriptor such as "Monthly Plan". Display amounts
//! are inferred from it; revenue accrual does not use these amounts (see
//! [`crate::revenue`]).

use serde::{Deserialize, Serialize};

/// Listed price of a monthly plan ($5)
pub const MONTHLY_PLAN_CENTS: i64 = 500;
/// Listed price of a yearly plan ($50)
pub const YEARLY_PLAN_CENTS: i64 = 5_000;

/// Billing interval of a paid plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Monthly,
    Yearly,
}

impl PlanInterval {
    /// Short suffix used in "$5/mo"
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Monthly => "mo",
            Self::Yearly => "yr",
        }
    }
}

/// Paid plan inferred from a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPrice {
    pub interval: PlanInterval,
    pub amount_cents: i64,
}

/// Infer the paid plan from a descriptor; `None` means free
pub fn infer_plan(plan_type: Option<&str>) -> Option<PlanPrice> {
    let plan_type = plan_type?;
    if plan_type.contains("Monthly") {
        Some(PlanPrice {
            interval: PlanInterval::Monthly,
            amount_cents: MONTHLY_PLAN_CENTS,
        })
    } else if plan_type.contains("Yearly") {
        Some(PlanPrice {
            interval: PlanInterval::Yearly,
            amount_cents: YEARLY_PLAN_CENTS,
        })
    } else {
        None
    }
}

/// Descriptor written when a record is created
pub fn plan_type_for(interval: Option<PlanInterval>) -> &'static str {
    match interval {
        Some(PlanInterval::Monthly) => "Monthly Plan",
        Some(PlanInterval::Yearly) => "Yearly Plan",
        None => "Free Plan",
    }
}

/// Table cell text for a user's plan
pub fn describe_subscription(amount_cents: i64, interval: Option<PlanInterval>) -> String {
    match interval {
        Some(interval) if amount_cents > 0 => format!(
            "{}/{}",
            crate::format::format_currency(amount_cents),
            interval.suffix()
        ),
        _ => "No subscription".to_string(),
    }
}
