//! Schedule expression parsing.
//!
//! Three dialects are accepted:
//!
//! - standard 5-field cron (`minute hour day month weekday`) with ranges,
//!   steps, lists, and day/month aliases;
//! - the descriptors `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`;
//! - intervals: `@every <duration>`, where the duration is a compound of
//!   `ms`, `s`, `m`, and `h` segments such as `30s` or `1h30m`.
//!
//! Cron dialects are delegated to the `cron` crate after normalization to
//! its 6-field grammar: 5-field expressions get a zero seconds field
//! prepended, and descriptors expand to their fixed 6-field equivalents.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::ScheduleError;

const EVERY_PREFIX: &str = "@every";

/// A validated schedule expression.
#[derive(Debug, Clone)]
pub enum Expression {
    Cron(Box<Schedule>),
    Every(Duration),
}

impl Expression {
    /// Parse and validate an expression, failing eagerly on any problem.
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let expression = raw.trim();

        if expression.is_empty() {
            return Err(invalid(raw, "cron expression cannot be empty"));
        }

        if let Some(rest) = expression.strip_prefix(EVERY_PREFIX) {
            let duration = parse_duration(rest.trim()).map_err(|reason| invalid(raw, reason))?;
            return Ok(Expression::Every(duration));
        }

        if expression.starts_with('@') {
            let Some(normalized) = descriptor(expression) else {
                return Err(invalid(raw, "unknown descriptor"));
            };
            let schedule =
                Schedule::from_str(normalized).map_err(|err| invalid(raw, err.to_string()))?;
            return Ok(Expression::Cron(Box::new(schedule)));
        }

        let fields = expression.split_whitespace().count();
        if fields != 5 {
            return Err(invalid(raw, format!("expected 5 fields, got {fields}")));
        }

        let schedule = Schedule::from_str(&format!("0 {expression}"))
            .map_err(|err| invalid(raw, err.to_string()))?;
        Ok(Expression::Cron(Box::new(schedule)))
    }

    /// The next firing instant strictly after `now`, evaluated in UTC.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Expression::Cron(schedule) => schedule.after(&now).next(),
            Expression::Every(interval) => {
                Some(now + chrono::Duration::from_std(*interval).ok()?)
            }
        }
    }
}

/// The 6-field equivalent of a `@descriptor` expression.
fn descriptor(expression: &str) -> Option<&'static str> {
    match expression {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * SUN"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

fn invalid(expression: &str, reason: impl Into<String>) -> ScheduleError {
    ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

/// Parse a compound duration such as `30s`, `250ms`, or `1h30m`.
///
/// Each segment is an unsigned integer followed by one of `ms`, `s`, `m`,
/// `h`. The total must be positive.
fn parse_duration(input: &str) -> Result<Duration, String> {
    if input.is_empty() {
        return Err("missing duration after @every".to_string());
    }

    let bytes = input.as_bytes();
    let mut total = Duration::ZERO;
    let mut at = 0;

    while at < bytes.len() {
        let digits_start = at;
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        if at == digits_start {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: u64 = input[digits_start..at]
            .parse()
            .map_err(|_| format!("invalid duration {input:?}"))?;

        let unit_start = at;
        while at < bytes.len() && bytes[at].is_ascii_alphabetic() {
            at += 1;
        }
        let segment = match &input[unit_start..at] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        total += segment;
    }

    if total.is_zero() {
        return Err(format!("duration {input:?} must be positive"));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_expressions() {
        for expression in ["* * * * *", "@hourly", "@every 30s", "0 9 * * MON-FRI"] {
            assert!(
                Expression::parse(expression).is_ok(),
                "expected {expression:?} to parse"
            );
        }
    }

    #[test]
    fn rejects_invalid_expressions() {
        for expression in ["@every abc", "", "@invalid", "* * * * * * *", "60 * * * *"] {
            assert!(
                matches!(
                    Expression::parse(expression),
                    Err(ScheduleError::InvalidCronExpression { .. })
                ),
                "expected {expression:?} to be rejected"
            );
        }
    }

    #[test]
    fn rejects_six_field_expressions() {
        assert!(Expression::parse("0 * * * * *").is_err());
    }

    #[test]
    fn five_field_fires_on_minute_boundaries() {
        let expression = Expression::parse("*/5 * * * *").unwrap();
        let now = Utc::now();
        let next = expression.next_after(now).unwrap();
        assert!(next > now);
        use chrono::Timelike;
        assert_eq!(next.second(), 0);
        assert_eq!(next.minute() % 5, 0);
    }

    #[test]
    fn descriptors_fire_in_the_future() {
        for expression in ["@yearly", "@monthly", "@weekly", "@daily", "@hourly"] {
            let parsed = Expression::parse(expression).unwrap();
            let now = Utc::now();
            assert!(parsed.next_after(now).unwrap() > now, "{expression}");
        }
    }

    #[test]
    fn every_advances_by_the_interval() {
        let expression = Expression::parse("@every 90s").unwrap();
        let now = Utc::now();
        let next = expression.next_after(now).unwrap();
        assert_eq!(next - now, chrono::Duration::seconds(90));
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(90 * 60)
        );
        assert_eq!(
            parse_duration("2h45m10s500ms").unwrap(),
            Duration::from_secs(2 * 3600 + 45 * 60 + 10) + Duration::from_millis(500)
        );
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["abc", "10", "10d", "s30", "-5s", "0s", ""] {
            assert!(parse_duration(input).is_err(), "expected {input:?} to fail");
        }
    }
}
