//! Human-readable notification text.
//!
//! Message wording is part of the operator-facing contract: dashboards and
//! mail filters match on it, so the formatting rules here are exact and
//! covered by tests.

use super::types::{AlertCondition, AlertRule};

/// Ordinal suffix for a percentile value: "st", "nd", "rd" or "th".
///
/// Computed from the digit string of the value formatted without trailing
/// zeros and with the decimal point removed: a trailing 11, 12 or 13 gets
/// "th"; otherwise the last digit decides. This makes `50.12` → "5012" →
/// "th", while `50.21` → "5021" → "st".
#[must_use]
pub fn ordinal_suffix(value: f64) -> &'static str {
    let digits: String =
        format_number(value).chars().filter(char::is_ascii_digit).collect();
    let tail: u32 = digits
        .get(digits.len().saturating_sub(2)..)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    if (11..=13).contains(&tail) {
        return "th";
    }
    match tail % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Formats a number without trailing zeros: `95.0` → "95", `99.9` → "99.9".
#[must_use]
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// Humanizes an evaluation window: "the last 5 minutes", "the last 90
/// seconds".
#[must_use]
pub fn format_time_period(seconds: u32) -> String {
    if seconds == 60 {
        "the last minute".to_string()
    } else if seconds % 60 == 0 {
        format!("the last {} minutes", seconds / 60)
    } else if seconds == 1 {
        "the last second".to_string()
    } else {
        format!("the last {seconds} seconds")
    }
}

/// Subject line for an open or resolution notification.
#[must_use]
pub fn subject(agent_id: &str, rule: &AlertRule, resolved: bool) -> String {
    let severity = rule.severity.as_str();
    if resolved {
        format!("[{severity}] {agent_id} - {} - resolved", rule.name)
    } else {
        format!("[{severity}] {agent_id} - {}", rule.name)
    }
}

/// Body text for a newly opened incident.
#[must_use]
pub fn breach_message(condition: &AlertCondition) -> String {
    match condition {
        AlertCondition::TransactionPercentile {
            percentile,
            threshold_millis,
            time_period_seconds,
            ..
        } => {
            format!(
                "{p}{suffix} percentile over {period} is greater than or equal to the alert \
                 threshold of {threshold} milliseconds.",
                p = format_number(*percentile),
                suffix = ordinal_suffix(*percentile),
                period = format_time_period(*time_period_seconds),
                threshold = threshold_millis,
            )
        }
        AlertCondition::GaugeAverage {
            gauge_name,
            display_unit,
            threshold,
            time_period_seconds,
            lower_bound,
        } => {
            format!(
                "Average {gauge_name} over {period} is {bound} than or equal to the alert \
                 threshold of {threshold} {display_unit}.",
                period = format_time_period(*time_period_seconds),
                bound = if *lower_bound { "less" } else { "greater" },
                threshold = format_number(*threshold),
            )
        }
    }
}

/// Body text for a resolved incident.
#[must_use]
pub fn resolution_message(condition: &AlertCondition) -> String {
    match condition {
        AlertCondition::TransactionPercentile {
            percentile,
            threshold_millis,
            time_period_seconds,
            ..
        } => {
            format!(
                "{p}{suffix} percentile over {period} is no longer greater than or equal to the \
                 alert threshold of {threshold} milliseconds.",
                p = format_number(*percentile),
                suffix = ordinal_suffix(*percentile),
                period = format_time_period(*time_period_seconds),
                threshold = threshold_millis,
            )
        }
        AlertCondition::GaugeAverage {
            gauge_name,
            display_unit,
            threshold,
            time_period_seconds,
            lower_bound,
        } => {
            format!(
                "Average {gauge_name} over {period} is no longer {bound} than or equal to the \
                 alert threshold of {threshold} {display_unit}.",
                period = format_time_period(*time_period_seconds),
                bound = if *lower_bound { "less" } else { "greater" },
                threshold = format_number(*threshold),
            )
        }
    }
}
