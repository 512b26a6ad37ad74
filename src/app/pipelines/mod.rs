pub mod dataset_pipeline;
pub mod output;
pub mod simulation_pipeline;
pub mod weather_pipeline;

pub use dataset_pipeline::DatasetPipeline;
pub use output::OutputBundle;
pub use simulation_pipeline::SimulationPipeline;
pub use weather_pipeline::WeatherPipeline;

use crate::utils::error::{PvError, Result};

/// Run CPU-bound or blocking file work off the async executor.
pub(crate) async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PvError::ProcessingError {
            message: format!("Background task failed: {}", e),
        })?
}
