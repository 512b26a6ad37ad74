use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// Drives a pipeline through extract, transform and load.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Returns where the output ended up.
    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        let started = Instant::now();
        tracing::info!("Starting {} pipeline", name);

        tracing::debug!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;

        tracing::debug!("Transforming data...");
        let transformed = self.pipeline.transform(raw_data).await?;

        tracing::debug!("Loading data...");
        let output_path = self.pipeline.load(transformed).await?;

        tracing::info!(
            "{} pipeline finished in {:.2}s, output saved to: {}",
            name,
            started.elapsed().as_secs_f64(),
            output_path
        );
        Ok(output_path)
    }
}
