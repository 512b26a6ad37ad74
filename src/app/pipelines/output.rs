use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Named output files produced by one pipeline run.
#[derive(Debug, Default)]
pub struct OutputBundle {
    files: Vec<(String, Vec<u8>)>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.push((name.into(), data.into()));
    }

    pub fn add_json<T: Serialize + ?Sized>(&mut self, name: impl Into<String>, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.add(name, json);
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn to_zip(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in &self.files {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    /// Write every file to `storage`, or a single archive when `zip` names
    /// one. Returns the user-facing output location.
    pub async fn write_to<S: Storage>(&self, storage: &S, zip: Option<&str>) -> Result<String> {
        if let Some(archive) = zip {
            let data = self.to_zip()?;
            tracing::debug!(
                "Writing ZIP file with {} files ({} bytes) to storage",
                self.len(),
                data.len()
            );
            storage.write_file(archive, &data).await?;
            return Ok(storage.display_path(archive));
        }

        for (name, data) in &self.files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            storage.write_file(name, data).await?;
        }
        Ok(storage.display_path(""))
    }
}

/// File-name friendly form of a label: lowercase ASCII letters, digits and
/// underscores.
pub fn file_stem(label: &str) -> String {
    let stem: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}
