use anyhow::Result;
use chrono::{TimeZone, Timelike, Utc};
use pv_explore::core::weather::{
    compare, load_knmi, load_solcast, parse_bound, KnmiOptions, DATETIME_COLUMN, KNMI_COLUMNS,
    KNMI_IRRADIANCE_COLUMN, KNMI_PREAMBLE_LINES,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// KNMI hourly export: a commented preamble followed by padded,
/// headerless rows.
fn write_knmi(dir: &Path, rows: &[(&str, u32, &str)]) -> Result<PathBuf> {
    let mut lines: Vec<String> = (0..KNMI_PREAMBLE_LINES)
        .map(|i| format!("# BRON: KONINKLIJK NEDERLANDS METEOROLOGISCH INSTITUUT (KNMI) line {}", i))
        .collect();
    for (day, hour, q) in rows {
        let mut fields = vec!["  260".to_string(), day.to_string(), format!("{:>4}", hour)];
        for column in &KNMI_COLUMNS[3..] {
            fields.push(if *column == "Q" {
                format!("{:>5}", q)
            } else {
                "    1".to_string()
            });
        }
        lines.push(fields.join(","));
    }
    let path = dir.join("uurgeg_260_2021-2030.txt");
    fs::write(&path, lines.join("\n"))?;
    Ok(path)
}

fn write_solcast(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("solcast.csv");
    fs::write(
        &path,
        "period_end,period,air_temp,ghi\n\
         2024-06-01T09:00:00+00:00,PT60M,14,410\n\
         2024-06-01T10:00:00+00:00,PT60M,15,480\n\
         not-a-time,PT60M,15,999\n\
         2024-06-01T13:00:00+02:00,PT60M,16,560\n\
         2024-06-01T12:00:00+00:00,PT60M,17,\n",
    )?;
    Ok(path)
}

#[test]
fn test_knmi_conversion_and_hour_24() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_knmi(
        dir.path(),
        &[("20240601", 9, "144"), ("20240601", 10, "180"), ("20240601", 24, "0"), ("20240601", 11, "")],
    )?;

    let knmi = load_knmi(&path, &KnmiOptions::default())?;
    assert_eq!(knmi.len(), 3);
    assert_eq!(knmi.table.columns().len(), KNMI_COLUMNS.len() + 2);
    assert_eq!(knmi.table.cell(0, KNMI_IRRADIANCE_COLUMN), Some("400"));
    assert_eq!(knmi.table.cell(1, "Q"), Some("180"));
    assert_eq!(knmi.table.cell(2, KNMI_IRRADIANCE_COLUMN), Some(""));
    assert_eq!(knmi.times[0], Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
    assert_eq!(
        knmi.table.cell(1, DATETIME_COLUMN),
        Some("2024-06-01T10:00:00+00:00")
    );
    Ok(())
}

#[test]
fn test_solcast_offsets_are_normalised() -> Result<()> {
    let dir = TempDir::new()?;
    let solcast = load_solcast(write_solcast(dir.path())?)?;
    assert_eq!(solcast.len(), 4);
    assert_eq!(solcast.times[2], Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap());
    Ok(())
}

#[test]
fn test_comparison_joins_on_time() -> Result<()> {
    let dir = TempDir::new()?;
    let knmi = load_knmi(
        write_knmi(
            dir.path(),
            &[("20240601", 9, "144"), ("20240601", 10, "180"), ("20240601", 11, "198"), ("20240601", 12, "200")],
        )?,
        &KnmiOptions::default(),
    )?;
    let solcast = load_solcast(write_solcast(dir.path())?)?;

    let comparison = compare(
        &knmi,
        &solcast,
        parse_bound("start", "2024-06-01")?,
        parse_bound("end", "2024-06-02")?,
    )?;

    // 12:00 has no Solcast GHI and is excluded
    let hours: Vec<u32> = comparison.points.iter().map(|p| p.datetime.hour()).collect();
    assert_eq!(hours, vec![9, 10, 11]);

    let stats = comparison.stats;
    assert_eq!(stats.count, 3);
    // knmi 400, 500, 550; solcast 410, 480, 560
    assert!((stats.mean_knmi - 483.333_333).abs() < 1e-3);
    assert!(stats.mean_bias.abs() < 1e-9);
    assert!((stats.rmse - (600.0f64 / 3.0).sqrt()).abs() < 1e-9);

    let table = comparison.to_table()?;
    assert_eq!(table.columns(), [DATETIME_COLUMN, KNMI_IRRADIANCE_COLUMN, "ghi"]);
    assert!(comparison.figure().title.contains("(2024-06-01 to 2024-06-02)"));
    Ok(())
}

#[test]
fn test_empty_window() -> Result<()> {
    let dir = TempDir::new()?;
    let knmi = load_knmi(write_knmi(dir.path(), &[("20240601", 9, "144")])?, &KnmiOptions::default())?;
    let solcast = load_solcast(write_solcast(dir.path())?)?;

    let comparison = compare(
        &knmi,
        &solcast,
        parse_bound("start", "2025-01-01")?,
        parse_bound("end", "2025-01-02")?,
    )?;
    assert!(comparison.points.is_empty());
    assert_eq!(comparison.stats.count, 0);
    assert!(parse_bound("start", "first of june").is_err());
    Ok(())
}
