use crate::utils::error::{PvError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::sync::LazyLock;

static FREQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d*)\s*(min|T|H|h|S|s|D|d)\s*$").expect("frequency pattern is valid")
});

/// Parse a pandas-style frequency such as `1H`, `15min`, `30s` or `1D`.
pub fn parse_freq(freq: &str) -> Result<TimeDelta> {
    let invalid = |reason: &str| PvError::InvalidConfigValueError {
        field: "freq".to_string(),
        value: freq.to_string(),
        reason: reason.to_string(),
    };
    let caps = FREQ_RE
        .captures(freq)
        .ok_or_else(|| invalid("Expected <n>min, <n>H, <n>s or <n>D"))?;
    let n: i64 = if caps[1].is_empty() {
        1
    } else {
        caps[1].parse().map_err(|_| invalid("Step count is too large"))?
    };
    if n == 0 {
        return Err(invalid("Step must be positive"));
    }
    let step = match &caps[2] {
        "min" | "T" => TimeDelta::try_minutes(n),
        "H" | "h" => TimeDelta::try_hours(n),
        "S" | "s" => TimeDelta::try_seconds(n),
        _ => TimeDelta::try_days(n),
    };
    step.ok_or_else(|| invalid("Step is out of range"))
}

/// Every `step` from `start` up to and including `end`.
pub fn date_range(start: DateTime<Utc>, end: DateTime<Utc>, step: TimeDelta) -> Vec<DateTime<Utc>> {
    let mut times = Vec::new();
    if step <= TimeDelta::zero() {
        return times;
    }
    let mut t = start;
    while t <= end {
        times.push(t);
        t += step;
    }
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_freq() {
        assert_eq!(parse_freq("1H").unwrap(), TimeDelta::hours(1));
        assert_eq!(parse_freq("h").unwrap(), TimeDelta::hours(1));
        assert_eq!(parse_freq("1min").unwrap(), TimeDelta::minutes(1));
        assert_eq!(parse_freq("15min").unwrap(), TimeDelta::minutes(15));
        assert_eq!(parse_freq("30s").unwrap(), TimeDelta::seconds(30));
        assert_eq!(parse_freq("1D").unwrap(), TimeDelta::days(1));
        assert!(parse_freq("0H").is_err());
        assert!(parse_freq("weekly").is_err());
    }

    #[test]
    fn test_date_range_includes_end() {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap();
        let times = date_range(start, end, TimeDelta::hours(1));
        assert_eq!(times.len(), 25);
        assert_eq!(times.last(), Some(&end));
    }

    #[test]
    fn test_year_of_hours() {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        // 2024 is a leap year and February 29 falls inside the window.
        assert_eq!(date_range(start, end, TimeDelta::hours(1)).len(), 366 * 24 + 1);
    }
}
