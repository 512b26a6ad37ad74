use crate::app::pipelines::{blocking, OutputBundle};
use crate::core::dataset_loader::{flatten, summarize, ColumnLayout, DatasetLoader, NestedDataset};
use crate::domain::model::Table;
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const FLATTENED_FILE: &str = "flattened.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Year → month → data type → row count.
pub type DatasetSummary = BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>>;

pub struct DatasetOutput {
    pub table: Table,
    pub summary: DatasetSummary,
}

/// Loads a slice of a measurement archive and writes it as one CSV plus a
/// JSON overview of what was found.
pub struct DatasetPipeline<S: Storage> {
    storage: S,
    loader: DatasetLoader,
    layout: ColumnLayout,
    lazy: bool,
    zip: Option<String>,
}

impl<S: Storage> DatasetPipeline<S> {
    pub fn new(storage: S, loader: DatasetLoader, layout: ColumnLayout) -> Self {
        Self {
            storage,
            loader,
            layout,
            lazy: false,
            zip: None,
        }
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_zip(mut self, zip: Option<String>) -> Self {
        self.zip = zip;
        self
    }
}

#[async_trait]
impl<S: Storage> Pipeline for DatasetPipeline<S> {
    type Extracted = NestedDataset;
    type Transformed = DatasetOutput;

    fn name(&self) -> &str {
        "dataset"
    }

    async fn extract(&self) -> Result<NestedDataset> {
        let loader = self.loader.clone();
        let lazy = self.lazy;
        let data = blocking(move || {
            if lazy {
                let mut dataset = loader.load_lazy()?;
                let entries = dataset.entries().to_vec();
                for entry in &entries {
                    dataset.get(&entry.key, &entry.source);
                }
                tracing::debug!("Lazily loaded {} of {} files", dataset.loaded_count(), entries.len());
                Ok(dataset.materialize())
            } else {
                loader.load()
            }
        })
        .await?;

        let files: usize = data.values().flat_map(|m| m.values()).map(|t| t.len()).sum();
        tracing::info!("Loaded {} files across {} years", files, data.len());
        Ok(data)
    }

    async fn transform(&self, data: NestedDataset) -> Result<DatasetOutput> {
        let table = flatten(&data, self.layout)?;
        tracing::info!(
            "Flattened to {} rows x {} columns ({:?} layout)",
            table.len(),
            table.columns().len(),
            self.layout
        );
        Ok(DatasetOutput {
            table,
            summary: summarize(&data),
        })
    }

    async fn load(&self, result: DatasetOutput) -> Result<String> {
        let mut bundle = OutputBundle::new();
        bundle.add(FLATTENED_FILE, result.table.to_csv_string()?);
        bundle.add_json(SUMMARY_FILE, &result.summary)?;
        bundle.write_to(&self.storage, self.zip.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::testing::MockStorage;
    use crate::core::dataset_loader::DatasetRequest;
    use crate::core::etl::EtlEngine;
    use std::fs;
    use tempfile::TempDir;

    fn archive() -> TempDir {
        let dir = TempDir::new().unwrap();
        let month = dir.path().join("2024_V3").join("2024_01");
        fs::create_dir_all(&month).unwrap();
        fs::write(month.join("Irradiance-2024_01.csv"), "t,ghi\n0,10\n1,20\n").unwrap();
        fs::write(month.join("LightSpectra- 2024_01.csv"), "t,nm500\n0,0.4\n").unwrap();
        dir
    }

    fn loader(dir: &TempDir) -> DatasetLoader {
        DatasetLoader::new(
            DatasetRequest::parse(dir.path(), &["2024_01", "2024_02"], &["Irradiance", "LightSpectra"]).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_long_layout_run() {
        let dir = archive();
        let storage = MockStorage::new();
        let pipeline = DatasetPipeline::new(storage.clone(), loader(&dir), ColumnLayout::Long);

        EtlEngine::new(pipeline).run().await.unwrap();

        let csv = String::from_utf8(storage.get_file(FLATTENED_FILE).await.unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.starts_with("t,ghi,Source,Year,Month,nm500"));

        let summary: DatasetSummary =
            serde_json::from_slice(&storage.get_file(SUMMARY_FILE).await.unwrap()).unwrap();
        assert_eq!(summary["2024"]["2024_01"]["Irradiance"], 2);
        assert_eq!(summary["2024"]["2024_01"]["LightSpectra"], 1);
        assert!(!summary["2024"].contains_key("2024_02"));
    }

    #[tokio::test]
    async fn test_lazy_and_eager_agree() {
        let dir = archive();
        let eager = DatasetPipeline::new(MockStorage::new(), loader(&dir), ColumnLayout::Wide);
        let lazy = DatasetPipeline::new(MockStorage::new(), loader(&dir), ColumnLayout::Wide).with_lazy(true);

        let a = eager.transform(eager.extract().await.unwrap()).await.unwrap();
        let b = lazy.transform(lazy.extract().await.unwrap()).await.unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.summary, b.summary);
    }

    #[tokio::test]
    async fn test_missing_root_fails_extract() {
        let dir = TempDir::new().unwrap();
        let request = DatasetRequest::parse(dir.path().join("absent"), &["2024_01"], &["Irradiance"]).unwrap();
        let pipeline = DatasetPipeline::new(MockStorage::new(), DatasetLoader::new(request), ColumnLayout::Long);
        assert!(pipeline.extract().await.is_err());
    }
}
