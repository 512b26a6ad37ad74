use crate::app::pipelines::{blocking, OutputBundle};
use crate::core::weather::{compare, load_knmi, load_solcast, Comparison, KnmiOptions, TimedTable};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::Result;
use crate::utils::plot::render_svg;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub const COMPARISON_FILE: &str = "comparison.csv";
pub const STATS_FILE: &str = "comparison_stats.json";
pub const CHART_FILE: &str = "comparison.svg";

pub struct WeatherSources {
    pub knmi: TimedTable,
    pub solcast: TimedTable,
}

/// KNMI station radiation against Solcast satellite GHI over a time window.
pub struct WeatherPipeline<S: Storage> {
    storage: S,
    knmi_path: PathBuf,
    solcast_path: PathBuf,
    knmi_options: KnmiOptions,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    zip: Option<String>,
}

impl<S: Storage> WeatherPipeline<S> {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        storage: S,
        knmi_path: P,
        solcast_path: Q,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            storage,
            knmi_path: knmi_path.into(),
            solcast_path: solcast_path.into(),
            knmi_options: KnmiOptions::default(),
            start,
            end,
            zip: None,
        }
    }

    pub fn with_knmi_options(mut self, options: KnmiOptions) -> Self {
        self.knmi_options = options;
        self
    }

    pub fn with_zip(mut self, zip: Option<String>) -> Self {
        self.zip = zip;
        self
    }
}

#[async_trait]
impl<S: Storage> Pipeline for WeatherPipeline<S> {
    type Extracted = WeatherSources;
    type Transformed = Comparison;

    fn name(&self) -> &str {
        "weather"
    }

    async fn extract(&self) -> Result<WeatherSources> {
        let knmi_path = self.knmi_path.clone();
        let solcast_path = self.solcast_path.clone();
        let options = self.knmi_options.clone();
        blocking(move || {
            Ok(WeatherSources {
                knmi: load_knmi(&knmi_path, &options)?,
                solcast: load_solcast(&solcast_path)?,
            })
        })
        .await
    }

    async fn transform(&self, data: WeatherSources) -> Result<Comparison> {
        let comparison = compare(&data.knmi, &data.solcast, self.start, self.end)?;
        let stats = &comparison.stats;
        tracing::info!(
            "Matched {} hours: mean KNMI {:.1} W/m², mean Solcast {:.1} W/m², bias {:.1}, RMSE {:.1}",
            stats.count,
            stats.mean_knmi,
            stats.mean_solcast,
            stats.mean_bias,
            stats.rmse
        );
        if stats.count == 0 {
            tracing::warn!("No overlapping timestamps between {} and {}", self.start, self.end);
        }
        Ok(comparison)
    }

    async fn load(&self, result: Comparison) -> Result<String> {
        let mut bundle = OutputBundle::new();
        bundle.add(COMPARISON_FILE, result.to_table()?.to_csv_string()?);
        bundle.add_json(STATS_FILE, &result.stats)?;
        bundle.add(CHART_FILE, render_svg(&[result.figure()], 1200, 500)?);
        bundle.write_to(&self.storage, self.zip.as_deref()).await
    }
}
