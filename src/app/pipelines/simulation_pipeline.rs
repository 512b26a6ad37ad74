use crate::app::pipelines::output::file_stem;
use crate::app::pipelines::{blocking, OutputBundle};
use crate::config::scenario::ScenarioConfig;
use crate::domain::ports::{Pipeline, Storage};
use crate::solar::modelchain::{clear_sky_weather, comparison_figures, ModelChain, ModelChainResults, WeatherRecord};
use crate::solar::{Location, PvSystem};
use crate::utils::error::Result;
use crate::utils::plot::render_svg;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;

pub const SUMMARY_FILE: &str = "energy_summary.json";
pub const CHART_FILE: &str = "simulation.svg";

/// Everything needed to run the chain at one site.
pub struct SiteRun {
    pub location: Location,
    pub system: PvSystem,
    pub weather: Vec<WeatherRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySummary {
    pub site: String,
    pub steps: usize,
    pub energy_kwh: f64,
    pub peak_ac_w: f64,
}

impl EnergySummary {
    pub fn from_results(results: &ModelChainResults) -> Self {
        Self {
            site: results.location.clone(),
            steps: results.steps.len(),
            energy_kwh: results.energy_kwh(),
            peak_ac_w: results.peak_ac(),
        }
    }
}

/// Plain-text yield report, one line per site.
pub fn energy_report(summaries: &[EnergySummary]) -> String {
    summaries
        .iter()
        .map(|s| format!("Total energy yield for {}: {:.2} kWh", s.site, s.energy_kwh))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clear-sky simulation of one system design at every site of a scenario.
pub struct SimulationPipeline<S: Storage> {
    storage: S,
    config: ScenarioConfig,
    zip: Option<String>,
    summaries: Mutex<Vec<EnergySummary>>,
}

impl<S: Storage> SimulationPipeline<S> {
    pub fn new(storage: S, config: ScenarioConfig) -> Self {
        let zip = config.compression().map(|c| c.filename.clone());
        Self {
            storage,
            config,
            zip,
            summaries: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the scenario's own compression setting when `Some`.
    pub fn with_zip(mut self, zip: Option<String>) -> Self {
        if zip.is_some() {
            self.zip = zip;
        }
        self
    }

    /// Per-site totals of the last completed run.
    pub fn summaries(&self) -> Vec<EnergySummary> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl<S: Storage> Pipeline for SimulationPipeline<S> {
    type Extracted = Vec<SiteRun>;
    type Transformed = Vec<ModelChainResults>;

    fn name(&self) -> &str {
        "simulation"
    }

    async fn extract(&self) -> Result<Vec<SiteRun>> {
        let config = self.config.clone();
        blocking(move || {
            let turbidity = config.turbidity();
            config
                .sites
                .iter()
                .map(|site| -> Result<SiteRun> {
                    let location = config.location(site)?;
                    let times = config.times_for(&location)?;
                    tracing::debug!("{}: {} time steps", location.name, times.len());
                    let weather = clear_sky_weather(&location, &times, site.temp_air, site.wind_speed, &turbidity);
                    Ok(SiteRun {
                        system: config.pv_system(site)?,
                        location,
                        weather,
                    })
                })
                .collect()
        })
        .await
    }

    async fn transform(&self, data: Vec<SiteRun>) -> Result<Vec<ModelChainResults>> {
        blocking(move || {
            Ok(data
                .into_iter()
                .map(|run| ModelChain::new(run.system, run.location).run(&run.weather))
                .collect())
        })
        .await
    }

    async fn load(&self, result: Vec<ModelChainResults>) -> Result<String> {
        let summaries: Vec<EnergySummary> = result.iter().map(EnergySummary::from_results).collect();
        for line in energy_report(&summaries).lines() {
            tracing::info!("{}", line);
        }

        let mut bundle = OutputBundle::new();
        if self.config.wants("csv") {
            for run in &result {
                bundle.add(format!("{}_results.csv", file_stem(&run.location)), run.to_table()?.to_csv_string()?);
            }
        }
        if self.config.wants("json") {
            bundle.add_json(SUMMARY_FILE, &summaries)?;
        }
        if self.config.wants("svg") {
            bundle.add(CHART_FILE, render_svg(&comparison_figures(&result), 1200, 450)?);
        }
        let location = bundle.write_to(&self.storage, self.zip.as_deref()).await?;
        if let Ok(mut last) = self.summaries.lock() {
            *last = summaries;
        }
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::testing::MockStorage;
    use crate::core::etl::EtlEngine;

    const TWO_SITES: &str = r#"
[scenario]
name = "two-sites"

[simulation]
start = "2023-06-21T00:00:00Z"
end = "2023-06-21T23:00:00Z"

[[sites]]
name = "Amsterdam"
latitude = 52.3676
longitude = 4.9041
surface_tilt = 30.0
surface_azimuth = 180.0
temp_air = 15.0
wind_speed = 2.0

[[sites]]
name = "McMurdo"
latitude = -77.8419
longitude = 166.6863
surface_tilt = 10.0
surface_azimuth = 0.0
temp_air = -20.0
wind_speed = 5.0

[output]
path = "./out"
"#;

    #[tokio::test]
    async fn test_run_writes_results_summary_and_chart() {
        let config = ScenarioConfig::from_toml_str(TWO_SITES).unwrap();
        let storage = MockStorage::new();
        EtlEngine::new(SimulationPipeline::new(storage.clone(), config))
            .run()
            .await
            .unwrap();

        assert_eq!(
            storage.names().await,
            vec!["amsterdam_results.csv", SUMMARY_FILE, "mcmurdo_results.csv", CHART_FILE]
        );
        let summaries: Vec<serde_json::Value> =
            serde_json::from_slice(&storage.get_file(SUMMARY_FILE).await.unwrap()).unwrap();
        assert_eq!(summaries[0]["steps"], 24);
        assert!(summaries[0]["energy_kwh"].as_f64().unwrap() > 1.0);
        // polar night: only the inverter's night tare
        let mcmurdo = summaries[1]["energy_kwh"].as_f64().unwrap();
        assert!((mcmurdo + 24.0 * 0.075 / 1000.0).abs() < 1e-9, "{}", mcmurdo);
    }

    #[tokio::test]
    async fn test_summaries_kept_for_report() {
        let config = ScenarioConfig::from_toml_str(TWO_SITES).unwrap();
        let engine = EtlEngine::new(SimulationPipeline::new(MockStorage::new(), config));
        assert!(engine.pipeline().summaries().is_empty());

        engine.run().await.unwrap();
        let summaries = engine.pipeline().summaries();
        let report = energy_report(&summaries);
        assert_eq!(report.lines().count(), 2);
        assert!(report.starts_with("Total energy yield for Amsterdam: "));
        assert!(report.contains("Total energy yield for McMurdo: -0.00 kWh"));
    }

    #[tokio::test]
    async fn test_formats_and_zip() {
        let content = TWO_SITES.replace(
            "path = \"./out\"",
            "path = \"./out\"\nformats = [\"json\"]\ncompression = { enabled = true, filename = \"sim.zip\" }",
        );
        let config = ScenarioConfig::from_toml_str(&content).unwrap();
        let storage = MockStorage::new();
        let location = EtlEngine::new(SimulationPipeline::new(storage.clone(), config))
            .run()
            .await
            .unwrap();

        assert_eq!(location, "mock://sim.zip");
        let data = storage.get_file("sim.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec![SUMMARY_FILE]);
    }

    #[test]
    fn test_energy_report() {
        let report = energy_report(&[EnergySummary {
            site: "Sydney".to_string(),
            steps: 8785,
            energy_kwh: 412.346,
            peak_ac_w: 250.0,
        }]);
        assert_eq!(report, "Total energy yield for Sydney: 412.35 kWh");
    }
}
