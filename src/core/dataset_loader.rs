//! Hierarchical loader for solar-field measurement exports.
//!
//! Exports are laid out as `<root>/<YYYY>_V3/<YYYY>_<MM>/<Type>-<YYYY>_<MM>.csv`.
//! A request names the months and data types of interest; the loader finds
//! whichever files exist, tags every row with `Source`, `Year` and `Month`, and
//! returns them nested by year and month or flattened into one table.

use crate::domain::model::Table;
use crate::utils::error::{PvError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SOURCE_COLUMN: &str = "Source";
pub const YEAR_COLUMN: &str = "Year";
pub const MONTH_COLUMN: &str = "Month";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: String,
    pub month: String,
}

impl MonthKey {
    pub fn year_folder(&self) -> String {
        format!("{}_V3", self.year)
    }

    pub fn month_folder(&self) -> String {
        format!("{}_{}", self.year, self.month)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = PvError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PvError::InvalidMonthKey {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('_').ok_or_else(invalid)?;
        let numeric = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !numeric(year) || !numeric(month) {
            return Err(invalid());
        }
        Ok(Self {
            year: year.to_string(),
            month: month.to_string(),
        })
    }
}

/// Candidate file names for a data type within a month folder.
#[derive(Debug, Clone)]
pub struct FileNaming {
    /// Types whose exports sometimes carry a space after the dash.
    pub tolerant_types: Vec<String>,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            tolerant_types: vec!["LightSpectra".to_string()],
        }
    }
}

impl FileNaming {
    pub fn candidates(&self, data_type: &str, key: &MonthKey) -> Vec<String> {
        let folder = key.month_folder();
        let exact = format!("{}-{}.csv", data_type, folder);
        if self.tolerant_types.iter().any(|t| t == data_type) {
            vec![format!("{}- {}.csv", data_type, folder), exact]
        } else {
            vec![exact]
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub root: PathBuf,
    pub months: Vec<MonthKey>,
    pub types: Vec<String>,
}

impl DatasetRequest {
    pub fn new<P: Into<PathBuf>>(root: P, months: Vec<MonthKey>, types: Vec<String>) -> Self {
        Self {
            root: root.into(),
            months,
            types,
        }
    }

    /// Build a request from `YYYY_MM` strings.
    pub fn parse<P: Into<PathBuf>, S: AsRef<str>>(
        root: P,
        months: &[S],
        types: &[S],
    ) -> Result<Self> {
        let months = months
            .iter()
            .map(|m| m.as_ref().parse())
            .collect::<Result<Vec<MonthKey>>>()?;
        let types = types.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(Self::new(root, months, types))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    pub key: MonthKey,
    pub source: String,
    pub path: PathBuf,
}

/// Result of walking the folder tree without reading any file.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Requested months whose folder exists, in request order.
    pub months: Vec<MonthKey>,
    pub entries: Vec<DatasetEntry>,
}

/// year → `YYYY_MM` → data type → table
pub type NestedDataset = BTreeMap<String, BTreeMap<String, BTreeMap<String, Table>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnLayout {
    /// One row per measurement, types told apart by the `Source` column.
    #[default]
    Long,
    /// Types side by side per month, columns prefixed with the type name.
    Wide,
}

impl FromStr for ColumnLayout {
    type Err = PvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(ColumnLayout::Long),
            "wide" => Ok(ColumnLayout::Wide),
            other => Err(PvError::InvalidConfigValueError {
                field: "layout".to_string(),
                value: other.to_string(),
                reason: "Valid layouts: long, wide".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetLoader {
    request: DatasetRequest,
    naming: FileNaming,
}

impl DatasetLoader {
    pub fn new(request: DatasetRequest) -> Self {
        Self {
            request,
            naming: FileNaming::default(),
        }
    }

    pub fn with_naming(mut self, naming: FileNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn request(&self) -> &DatasetRequest {
        &self.request
    }

    pub fn discover(&self) -> Result<Discovery> {
        let root = &self.request.root;
        let root_exists = root.is_dir();
        tracing::debug!(
            "Master folder exists: {}: {}",
            root.display(),
            if root_exists { "Yes" } else { "No" }
        );
        if !root_exists {
            return Err(PvError::DatasetRootMissing {
                path: root.display().to_string(),
            });
        }

        let mut discovery = Discovery::default();
        for key in &self.request.months {
            let month_path = root.join(key.year_folder()).join(key.month_folder());
            tracing::debug!("Checking directory: {}", month_path.display());
            if !month_path.is_dir() {
                tracing::debug!("Directory does not exist: {}", month_path.display());
                continue;
            }
            discovery.months.push(key.clone());

            for data_type in &self.request.types {
                match self.locate(&month_path, data_type, key) {
                    Some(path) => {
                        tracing::debug!("Found file: {}", path.display());
                        discovery.entries.push(DatasetEntry {
                            key: key.clone(),
                            source: data_type.clone(),
                            path,
                        });
                    }
                    None => tracing::debug!(
                        "No {} file for {} in {}",
                        data_type,
                        key,
                        month_path.display()
                    ),
                }
            }
        }
        Ok(discovery)
    }

    fn locate(&self, month_path: &Path, data_type: &str, key: &MonthKey) -> Option<PathBuf> {
        self.naming
            .candidates(data_type, key)
            .into_iter()
            .map(|name| month_path.join(name))
            .find(|path| path.is_file())
    }

    /// Read every located file into a nested dataset.
    pub fn load(&self) -> Result<NestedDataset> {
        let discovery = self.discover()?;
        let mut data = NestedDataset::new();

        for key in &discovery.months {
            data.entry(key.year.clone())
                .or_default()
                .entry(key.to_string())
                .or_default();
        }

        for entry in &discovery.entries {
            let Some(table) = read_tagged(entry) else {
                continue;
            };
            data.entry(entry.key.year.clone())
                .or_default()
                .entry(entry.key.to_string())
                .or_default()
                .insert(entry.source.clone(), table);
        }

        Ok(data)
    }

    pub fn load_lazy(&self) -> Result<LazyDataset> {
        Ok(LazyDataset::new(self.discover()?))
    }
}

/// Parse one export and add provenance columns. Parse failures are logged and
/// yield `None` so that one corrupt file does not abort the whole request.
fn read_tagged(entry: &DatasetEntry) -> Option<Table> {
    tracing::debug!("Loading file: {}", entry.path.display());
    match Table::from_path(&entry.path) {
        Ok(table) => {
            tracing::debug!(
                "Successfully loaded {} rows from {}",
                table.len(),
                entry.path.display()
            );
            Some(
                table
                    .with_constant_column(SOURCE_COLUMN, &entry.source)
                    .with_constant_column(YEAR_COLUMN, &entry.key.year)
                    .with_constant_column(MONTH_COLUMN, &entry.key.month),
            )
        }
        Err(e) => {
            tracing::warn!("Error loading file {}: {}", entry.path.display(), e);
            None
        }
    }
}

/// Assemble a nested dataset into a single table.
pub fn flatten(data: &NestedDataset, layout: ColumnLayout) -> Result<Table> {
    match layout {
        ColumnLayout::Long => Ok(Table::concat(
            data.values()
                .flat_map(|months| months.values())
                .flat_map(|types| types.values()),
        )),
        ColumnLayout::Wide => {
            let months = data
                .values()
                .flat_map(|months| months.iter())
                .filter(|(_, types)| !types.is_empty())
                .map(|(key, types)| -> Result<Table> { widen_month(&key.parse::<MonthKey>()?, types) })
                .collect::<Result<Vec<Table>>>()?;
            Ok(Table::concat(months.iter()))
        }
    }
}

fn widen_month(key: &MonthKey, types: &BTreeMap<String, Table>) -> Result<Table> {
    let rows = types.values().map(Table::len).max().unwrap_or(0);

    let mut columns = vec![YEAR_COLUMN.to_string(), MONTH_COLUMN.to_string()];
    let mut sources: Vec<(&Table, Vec<usize>)> = Vec::new();
    for (source, table) in types {
        let keep: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| ![SOURCE_COLUMN, YEAR_COLUMN, MONTH_COLUMN].contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();
        columns.extend(
            keep.iter()
                .map(|&i| format!("{}_{}", source, table.columns()[i])),
        );
        sources.push((table, keep));
    }

    let mut wide = Table::new(columns);
    for r in 0..rows {
        let mut row = vec![key.year.clone(), key.month.clone()];
        for (table, keep) in &sources {
            let cells = table.rows().get(r);
            row.extend(keep.iter().map(|&i| {
                cells
                    .map(|cells| cells[i].clone())
                    .unwrap_or_default()
            }));
        }
        wide.push_row(row)?;
    }
    Ok(wide)
}

/// Row counts per year, month and type, for reporting.
pub fn summarize(data: &NestedDataset) -> BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>> {
    data.iter()
        .map(|(year, months)| {
            let months = months
                .iter()
                .map(|(month, types)| {
                    let counts = types.iter().map(|(t, table)| (t.clone(), table.len())).collect();
                    (month.clone(), counts)
                })
                .collect();
            (year.clone(), months)
        })
        .collect()
}

/// Located files that are parsed on first access and memoised afterwards.
pub struct LazyDataset {
    months: Vec<MonthKey>,
    entries: Vec<DatasetEntry>,
    cache: HashMap<usize, Option<Table>>,
}

impl LazyDataset {
    pub fn new(discovery: Discovery) -> Self {
        Self {
            months: discovery.months,
            entries: discovery.entries,
            cache: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.values().filter(|t| t.is_some()).count()
    }

    /// Table for `source` in `key`, or `None` when no such file was located
    /// or it failed to parse.
    pub fn get(&mut self, key: &MonthKey, source: &str) -> Option<&Table> {
        let idx = self
            .entries
            .iter()
            .position(|e| &e.key == key && e.source == source)?;
        let entries = &self.entries;
        self.cache
            .entry(idx)
            .or_insert_with(|| read_tagged(&entries[idx]))
            .as_ref()
    }

    /// Read everything not read yet and assemble the nested form.
    pub fn materialize(mut self) -> NestedDataset {
        let mut data = NestedDataset::new();
        for key in &self.months {
            data.entry(key.year.clone())
                .or_default()
                .entry(key.to_string())
                .or_default();
        }
        for idx in 0..self.entries.len() {
            let entry = &self.entries[idx];
            let table = match self.cache.remove(&idx) {
                Some(cached) => cached,
                None => read_tagged(entry),
            };
            let months = data.entry(entry.key.year.clone()).or_default();
            let types = months.entry(entry.key.to_string()).or_default();
            if let Some(table) = table {
                types.insert(entry.source.clone(), table);
            }
        }
        data
    }
}
