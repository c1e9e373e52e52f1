use chrono::{DateTime, FixedOffset, NaiveDate};

/// All date-only filters compare against timestamptz columns as an explicit
/// Asia/Bangkok day range. Inputs are "YYYY-MM-DD"; anything else is None.
pub fn bangkok_day_bounds(
    start: &str,
    end: &str,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let from = DateTime::parse_from_rfc3339(&format!("{}T00:00:00+07:00", start)).ok()?;
    let to = DateTime::parse_from_rfc3339(&format!("{}T23:59:59+07:00", end)).ok()?;
    if from > to {
        return None;
    }
    Some((from, to))
}

pub fn parse_date_safe(date_str: &str) -> Option<NaiveDate> {
    if date_str.trim().is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%Y%m%d"))
        .ok()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Currency sums clamp negative rows to zero first, then round once after
/// the summation.
pub fn sum_amounts(amounts: &[f64]) -> f64 {
    round2(amounts.iter().map(|v| v.max(0.0)).sum())
}
