use anyhow::Context;
use clap::Parser;
use pv_explore::app::pipelines::simulation_pipeline::energy_report;
use pv_explore::config::{Command, LoadArgs, PlotArgs, SimulateArgs, WeatherArgs};
use pv_explore::core::dataset_loader::{ColumnLayout, DatasetLoader, DatasetRequest};
use pv_explore::core::weather::{parse_bound, KnmiOptions};
use pv_explore::domain::ports::Storage;
use pv_explore::utils::error::{ErrorSeverity, PvError};
use pv_explore::utils::plot::render_svg;
use pv_explore::utils::{logger, validation::Validate};
use pv_explore::{
    CliConfig, DatasetCache, DatasetPipeline, EtlEngine, LocalStorage, ScenarioConfig, SimulationPipeline,
    WeatherPipeline,
};

const PLOT_FILE: &str = "plot.svg";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pv-explore {}", config.command_name());
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let outcome = match &config.command {
        Command::Load(args) => run_load(storage, args, config.zip.clone()).await,
        Command::Weather(args) => run_weather(storage, args, config.zip.clone()).await,
        Command::Simulate(args) => run_simulate(storage, args, config.zip.clone()).await,
        Command::Plot(args) => return run_plot(storage, args).await,
    };

    match outcome {
        Ok(output_path) => {
            tracing::info!("✅ {} completed successfully!", config.command_name());
            println!("✅ {} completed successfully!", config.command_name());
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn run_load(storage: LocalStorage, args: &LoadArgs, zip: Option<String>) -> Result<String, PvError> {
    let request = DatasetRequest::parse(args.root.as_str(), &args.months, &args.types)?;
    let layout: ColumnLayout = args.layout.parse()?;
    let pipeline = DatasetPipeline::new(storage, DatasetLoader::new(request), layout)
        .with_lazy(args.lazy)
        .with_zip(zip);
    EtlEngine::new(pipeline).run().await
}

async fn run_weather(storage: LocalStorage, args: &WeatherArgs, zip: Option<String>) -> Result<String, PvError> {
    let start = parse_bound("start", &args.start)?;
    let end = parse_bound("end", &args.end)?;
    let pipeline = WeatherPipeline::new(storage, args.knmi.as_str(), args.solcast.as_str(), start, end)
        .with_knmi_options(KnmiOptions {
            skip_rows: args.knmi_skip_rows,
        })
        .with_zip(zip);
    EtlEngine::new(pipeline).run().await
}

async fn run_simulate(storage: LocalStorage, args: &SimulateArgs, zip: Option<String>) -> Result<String, PvError> {
    let scenario = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::preset(&args.preset)?,
    };
    scenario.validate()?;
    tracing::info!(
        "Simulating '{}' at {} site(s)",
        scenario.scenario.name,
        scenario.sites.len()
    );
    let engine = EtlEngine::new(SimulationPipeline::new(storage, scenario).with_zip(zip));
    let output_path = engine.run().await?;
    println!("{}", energy_report(&engine.pipeline().summaries()));
    Ok(output_path)
}

/// Upload the files, list what was cached and draw the selected one.
async fn run_plot(storage: LocalStorage, args: &PlotArgs) -> anyhow::Result<()> {
    let mut cache = DatasetCache::new();
    let report = cache.upload(&args.files);
    for (name, reason) in &report.failed {
        eprintln!("⚠️ {}: {}", name, reason);
    }
    if report.options.is_empty() {
        eprintln!("❌ No file could be loaded");
        std::process::exit(1);
    }
    println!("{}", report.status);
    for option in &report.options {
        println!("  {}", option);
    }

    let selected = args
        .dataset
        .clone()
        .or_else(|| report.options.first().cloned());
    let Some(figure) = cache.default_figure(selected.as_deref()) else {
        eprintln!(
            "❌ Nothing to plot for {}: it needs at least two columns",
            selected.as_deref().unwrap_or("(none)")
        );
        std::process::exit(1);
    };

    let svg = render_svg(&[figure], 1200, 600)?;
    storage
        .write_file(PLOT_FILE, svg.as_bytes())
        .await
        .with_context(|| format!("writing {}", storage.display_path(PLOT_FILE)))?;
    println!("📁 Plot saved to: {}", storage.display_path(PLOT_FILE));
    Ok(())
}

fn exit_with(e: &PvError) {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
