//! Display formatting for dashboard values (en-US)

use time::{OffsetDateTime, UtcOffset};

use crate::revenue::month_label;

/// Whole US dollars from cents, rounded half away from zero: `$1,235`
pub fn format_currency(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let dollars = abs / 100 + u64::from(abs % 100 >= 50);

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative && dollars > 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Rate as a percentage with one decimal: `0.683` -> `68.3%`
pub fn format_percentage(rate: f64) -> String {
    if !rate.is_finite() {
        return "0.0%".to_string();
    }
    format!("{:.1}%", rate * 100.0)
}

/// Calendar date like `Jan 5, 2024` (UTC), or `N/A`
pub fn format_date(at: Option<OffsetDateTime>) -> String {
    match at {
        Some(at) => {
            let utc = at.to_offset(UtcOffset::UTC);
            format!(
                "{} {}, {}",
                month_label(u8::from(utc.month())),
                utc.day(),
                utc.year()
            )
        }
        None => "N/A".to_string(),
    }
}
