//! Memoised set of uploaded CSV files for the browse-and-plot front end.

use crate::core::weather::parse_timestamp;
use crate::domain::model::{parse_number, Table};
use crate::utils::plot::{Figure, Series};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub status: String,
    pub options: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    data: BTreeMap<String, Table>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load each file into the cache under its file name, replacing earlier
    /// uploads with the same name.
    pub fn upload<P: AsRef<Path>>(&mut self, paths: &[P]) -> UploadReport {
        let mut report = UploadReport::default();
        if paths.is_empty() {
            return report;
        }

        let mut uploaded = 0usize;
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            match Table::from_path(path) {
                Ok(table) => {
                    tracing::debug!("Cached {} ({} rows)", name, table.len());
                    self.data.insert(name, table);
                    uploaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Could not load {}: {}", path.display(), e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report.status = format!("Uploaded {} files successfully!", uploaded);
        report.options = self.options();
        report
    }

    pub fn options(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.data.get(name)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First column against second column, the dashboard's default view.
    pub fn default_figure(&self, name: Option<&str>) -> Option<Figure> {
        let table = self.data.get(name?)?;
        let columns = table.columns();
        if columns.len() < 2 {
            return None;
        }
        let (x_name, y_name) = (&columns[0], &columns[1]);
        let rows = table.rows();

        let x_cells: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        let (xs, x_label) = x_axis(&x_cells, x_name);
        let points = xs
            .into_iter()
            .zip(rows.iter())
            .filter_map(|(x, r)| parse_number(&r[1]).map(|y| (x, y)))
            .collect();

        Some(
            Figure::new(
                format!("Visualization for {}", name?),
                x_label,
                y_name.clone(),
            )
            .with_series(Series::new(y_name.clone(), points)),
        )
    }
}

/// Numeric x values when every cell is a number, hours since the first
/// timestamp when every cell is a timestamp, row index otherwise.
fn x_axis(cells: &[&str], name: &str) -> (Vec<f64>, String) {
    let numeric: Option<Vec<f64>> = cells.iter().map(|c| parse_number(c)).collect();
    if let Some(xs) = numeric {
        return (xs, name.to_string());
    }

    let times: Option<Vec<_>> = cells.iter().map(|c| parse_timestamp(c)).collect();
    if let Some(times) = times {
        if let Some(&first) = times.first() {
            let xs = times
                .iter()
                .map(|t| (*t - first).num_seconds() as f64 / 3600.0)
                .collect();
            return (xs, format!("hours since {}", first.format("%Y-%m-%d %H:%M UTC")));
        }
    }

    ((0..cells.len()).map(|i| i as f64).collect(), format!("{} (row)", name))
}
