//! Loaders for third-party weather exports and their side-by-side comparison.
//!
//! * KNMI: hourly station data, headerless after a fixed preamble, global
//!   radiation `Q` in J/cm² per hour.
//! * Solcast: headed CSV with a `period_end` timestamp and `ghi` in W/m².

use crate::domain::model::Table;
use crate::utils::error::{PvError, Result};
use crate::utils::plot::{Figure, Series};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

pub const KNMI_COLUMNS: [&str; 25] = [
    "STN", "YYYYMMDD", "HH", "DD", "FH", "FF", "FX", "T", "T10N", "TD", "SQ", "Q", "DR", "RH", "P",
    "VV", "N", "U", "WW", "IX", "M", "R", "S", "O", "Y",
];
pub const KNMI_PREAMBLE_LINES: usize = 52;
pub const DATETIME_COLUMN: &str = "datetime";
pub const KNMI_IRRADIANCE_COLUMN: &str = "Q_Wm2";
pub const SOLCAST_IRRADIANCE_COLUMN: &str = "ghi";

/// J/cm² accumulated over one hour → mean W/m².
const J_PER_CM2_HOUR_TO_W_PER_M2: f64 = 10_000.0 / 3_600.0;

/// A table whose rows each carry a UTC timestamp.
#[derive(Debug, Clone, Default)]
pub struct TimedTable {
    pub times: Vec<DateTime<Utc>>,
    pub table: Table,
}

impl TimedTable {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct KnmiOptions {
    pub skip_rows: usize,
}

impl Default for KnmiOptions {
    fn default() -> Self {
        Self {
            skip_rows: KNMI_PREAMBLE_LINES,
        }
    }
}

pub fn load_knmi<P: AsRef<Path>>(path: P, options: &KnmiOptions) -> Result<TimedTable> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let body: Vec<&str> = content.lines().skip(options.skip_rows).collect();
    let body = body.join("\n");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut table = Table::new(KNMI_COLUMNS.iter().map(|c| c.to_string()).collect());
    for result in rdr.records() {
        let record = result?;
        let mut row: Vec<String> = record
            .iter()
            .take(KNMI_COLUMNS.len())
            .map(str::to_string)
            .collect();
        row.resize(KNMI_COLUMNS.len(), String::new());
        table.push_row(row)?;
    }

    let q_wm2: Vec<String> = table
        .column_f64("Q")?
        .into_iter()
        .map(|q| q.map(|q| (q * J_PER_CM2_HOUR_TO_W_PER_M2).to_string()).unwrap_or_default())
        .collect();
    let table = table.with_column(KNMI_IRRADIANCE_COLUMN, q_wm2)?;

    let stamps: Vec<Option<DateTime<Utc>>> = table
        .column("YYYYMMDD")?
        .into_iter()
        .zip(table.column("HH")?)
        .map(|(day, hour)| knmi_timestamp(day, hour))
        .collect();

    let timed = attach_times(table, stamps)?;
    tracing::info!("Loaded {} KNMI rows from {}", timed.len(), path.as_ref().display());
    Ok(timed)
}

/// `YYYYMMDD` plus zero-padded `HH` read as `%Y%m%d%H`. KNMI labels the last
/// hour of a day `24`, which does not form a valid time and is rejected.
fn knmi_timestamp(day: &str, hour: &str) -> Option<DateTime<Utc>> {
    let (day, hour) = (day.trim(), hour.trim());
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    let hour = if hour.len() == 1 { format!("0{}", hour) } else { hour.to_string() };
    if !digits(day, 8) || !digits(&hour, 2) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{}{}00", day, hour), "%Y%m%d%H%M")
        .ok()
        .map(|t| t.and_utc())
}

pub fn load_solcast<P: AsRef<Path>>(path: P) -> Result<TimedTable> {
    let table = Table::from_path(path.as_ref())?;
    let stamps: Vec<Option<DateTime<Utc>>> = table
        .column("period_end")?
        .into_iter()
        .map(parse_timestamp)
        .collect();
    let timed = attach_times(table, stamps)?;
    tracing::info!(
        "Loaded {} Solcast rows from {}",
        timed.len(),
        path.as_ref().display()
    );
    Ok(timed)
}

/// Add the `datetime` column and drop rows without a timestamp.
fn attach_times(table: Table, stamps: Vec<Option<DateTime<Utc>>>) -> Result<TimedTable> {
    let dropped = stamps.iter().filter(|s| s.is_none()).count();
    if dropped > 0 {
        tracing::warn!("Dropped {} rows without a valid timestamp", dropped);
    }
    let rendered = stamps
        .iter()
        .map(|s| s.map(|t| t.to_rfc3339()).unwrap_or_default())
        .collect();
    let table = table
        .with_column(DATETIME_COLUMN, rendered)?
        .select_rows(|i| stamps[i].is_some());
    let times = stamps.into_iter().flatten().collect();
    Ok(TimedTable { times, table })
}

/// Lenient timestamp parsing: RFC 3339, explicit offsets, naive date-times
/// (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_zoned_timestamp(value).or_else(|| parse_naive_timestamp(value).map(|t| t.and_utc()))
}

/// Timestamps that carry their own offset.
pub fn parse_zoned_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Wall-clock date-times and bare dates (midnight).
pub fn parse_naive_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_bound(field: &str, value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value).ok_or_else(|| PvError::InvalidTimestamp {
        value: value.to_string(),
        reason: format!("{} must be a date (YYYY-MM-DD) or date-time", field),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub datetime: DateTime<Utc>,
    pub knmi_q_wm2: f64,
    pub solcast_ghi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComparisonStats {
    pub count: usize,
    pub mean_knmi: f64,
    pub mean_solcast: f64,
    /// Mean of solcast − knmi.
    pub mean_bias: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub points: Vec<ComparisonPoint>,
    pub stats: ComparisonStats,
}

/// Inner join on timestamp, restricted to `start <= t < end`.
pub fn compare(
    knmi: &TimedTable,
    solcast: &TimedTable,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Comparison> {
    let knmi_q = knmi.table.column_f64(KNMI_IRRADIANCE_COLUMN)?;
    let solcast_ghi = solcast.table.column_f64(SOLCAST_IRRADIANCE_COLUMN)?;

    let mut by_time: HashMap<DateTime<Utc>, Vec<usize>> = HashMap::new();
    for (i, t) in knmi.times.iter().enumerate() {
        by_time.entry(*t).or_default().push(i);
    }

    let mut points = Vec::new();
    for (j, t) in solcast.times.iter().enumerate() {
        if *t < start || *t >= end {
            continue;
        }
        let Some(matches) = by_time.get(t) else {
            continue;
        };
        for &i in matches {
            if let (Some(q), Some(ghi)) = (knmi_q[i], solcast_ghi[j]) {
                points.push(ComparisonPoint {
                    datetime: *t,
                    knmi_q_wm2: q,
                    solcast_ghi: ghi,
                });
            }
        }
    }
    points.sort_by_key(|p| p.datetime);

    let stats = comparison_stats(&points);
    tracing::debug!(
        "Matched {} hours between {} and {}",
        stats.count,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    Ok(Comparison {
        start,
        end,
        points,
        stats,
    })
}

fn comparison_stats(points: &[ComparisonPoint]) -> ComparisonStats {
    if points.is_empty() {
        return ComparisonStats::default();
    }
    let n = points.len() as f64;
    let mean_knmi = points.iter().map(|p| p.knmi_q_wm2).sum::<f64>() / n;
    let mean_solcast = points.iter().map(|p| p.solcast_ghi).sum::<f64>() / n;
    let mse = points
        .iter()
        .map(|p| (p.solcast_ghi - p.knmi_q_wm2).powi(2))
        .sum::<f64>()
        / n;
    ComparisonStats {
        count: points.len(),
        mean_knmi,
        mean_solcast,
        mean_bias: mean_solcast - mean_knmi,
        rmse: mse.sqrt(),
    }
}

impl Comparison {
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(vec![
            DATETIME_COLUMN.to_string(),
            KNMI_IRRADIANCE_COLUMN.to_string(),
            SOLCAST_IRRADIANCE_COLUMN.to_string(),
        ]);
        for p in &self.points {
            table.push_row(vec![
                p.datetime.to_rfc3339(),
                p.knmi_q_wm2.to_string(),
                p.solcast_ghi.to_string(),
            ])?;
        }
        Ok(table)
    }

    pub fn figure(&self) -> Figure {
        let hours = |t: DateTime<Utc>| (t - self.start).num_seconds() as f64 / 3600.0;
        let knmi = self
            .points
            .iter()
            .map(|p| (hours(p.datetime), p.knmi_q_wm2))
            .collect();
        let solcast = self
            .points
            .iter()
            .map(|p| (hours(p.datetime), p.solcast_ghi))
            .collect();
        Figure::new(
            format!(
                "Comparison of KNMI and Solcast Solar Radiation Data ({} to {})",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            ),
            format!("hours since {}", self.start.format("%Y-%m-%d %H:%M UTC")),
            "Solar Irradiance (W/m²)",
        )
        .with_series(Series::new("KNMI (Q in W/m²)", knmi))
        .with_series(Series::new("Solcast (GHI in W/m²)", solcast))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_knmi_timestamp_rejects_hour_24() {
        assert_eq!(
            knmi_timestamp("20240101", "1"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap())
        );
        assert_eq!(knmi_timestamp("20240101", "24"), None);
        assert_eq!(knmi_timestamp("2024011", "1"), None);
        assert_eq!(knmi_timestamp("2024011", "01"), None);
        assert_eq!(knmi_timestamp("20240101", "123"), None);
        assert_eq!(
            knmi_timestamp(" 20240131", " 9"),
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2023, 6, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2023-06-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2023-06-01T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-06-01T12:30:00+0200"), Some(expected));
        assert_eq!(parse_timestamp("2023-06-01 10:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2023-06-01"),
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_stats_of_known_points() {
        let t = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();
        let points = vec![
            ComparisonPoint {
                datetime: t,
                knmi_q_wm2: 100.0,
                solcast_ghi: 110.0,
            },
            ComparisonPoint {
                datetime: t,
                knmi_q_wm2: 200.0,
                solcast_ghi: 190.0,
            },
        ];
        let stats = comparison_stats(&points);
        assert_eq!(stats.count, 2);
        assert!((stats.mean_bias).abs() < 1e-12);
        assert!((stats.rmse - 10.0).abs() < 1e-12);
    }
}
