pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod solar;
pub mod utils;

pub use app::pipelines::{DatasetPipeline, SimulationPipeline, WeatherPipeline};
pub use config::cli::LocalStorage;
pub use config::scenario::ScenarioConfig;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use core::{dataset_cache::DatasetCache, etl::EtlEngine};
pub use domain::model::Table;
pub use utils::error::{PvError, Result};
