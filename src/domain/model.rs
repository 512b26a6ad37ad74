use crate::utils::error::{PvError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// Tabular records read from a CSV export.
///
/// Cells are kept verbatim as strings; numeric access parses on demand so that
/// mixed-type sensor columns survive loading untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Parse a headed CSV. Rows shorter than the header are padded with empty
    /// cells, longer rows are truncated. Repeated header names get `.1`, `.2`
    /// suffixes.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = dedup_columns(rdr.headers()?.iter().map(str::to_string).collect());
        let width = columns.len();
        let mut table = Self::new(columns);

        for result in rdr.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            row.resize(width, String::new());
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PvError::ProcessingError {
                message: format!(
                    "Row has {} cells but table has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Numeric view of a column; blank or unparsable cells become `None`.
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| parse_number(&row[idx])).collect())
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Set `name` to `value` on every row, appending the column if needed.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
        self
    }

    pub fn with_column(mut self, name: &str, values: Vec<String>) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(PvError::ProcessingError {
                message: format!(
                    "Column '{}' has {} values for {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            });
        }
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(self)
    }

    pub fn rename_columns<F: Fn(&str) -> String>(mut self, f: F) -> Self {
        self.columns = self.columns.iter().map(|c| f(c)).collect();
        self
    }

    /// Keep the rows whose index satisfies `keep`.
    pub fn select_rows<F: Fn(usize) -> bool>(mut self, keep: F) -> Self {
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, r)| r)
            .collect();
        self
    }

    /// Vertical union. Columns are taken in first-seen order; cells a table
    /// does not provide are left empty.
    pub fn concat<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for column in &table.columns {
                if !positions.contains_key(column) {
                    positions.insert(column.clone(), columns.len());
                    columns.push(column.clone());
                }
            }
        }

        let mut result = Self::new(columns);
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in &table.rows {
                let mut merged = vec![String::new(); result.columns.len()];
                for (cell, &target) in row.iter().zip(&mapping) {
                    merged[target] = cell.clone();
                }
                result.rows.push(merged);
            }
        }
        result
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| PvError::ProcessingError {
            message: format!("CSV output is not UTF-8: {}", e),
        })
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| PvError::ColumnNotFound {
            column: name.to_string(),
        })
    }
}

/// Rename repeated names to `name.1`, `name.2` and so on, skipping suffixes
/// that are already taken.
fn dedup_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        let mut candidate = name.clone();
        while out.contains(&candidate) {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{}.{}", name, count);
        }
        out.push(candidate);
    }
    out
}

pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}
