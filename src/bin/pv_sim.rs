use clap::Parser;
use pv_explore::app::pipelines::simulation_pipeline::energy_report;
use pv_explore::config::scenario::{ScenarioConfig, PRESET_NAMES};
use pv_explore::solar::presets;
use pv_explore::utils::error::ErrorSeverity;
use pv_explore::utils::{logger, validation::Validate};
use pv_explore::{EtlEngine, LocalStorage, SimulationPipeline};

#[derive(Parser)]
#[command(name = "pv-sim")]
#[command(about = "PV simulation driven by a TOML scenario file")]
struct Args {
    /// Path to TOML scenario file
    #[arg(short, long, default_value = "scenario.toml")]
    config: String,

    /// Use a built-in scenario instead of a file
    #[arg(long)]
    preset: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the output directory from the scenario
    #[arg(long)]
    output_path: Option<String>,

    /// Dry run - show what would be simulated without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let loaded = match &args.preset {
        Some(name) => {
            tracing::info!("🚀 Using built-in scenario: {}", name);
            ScenarioConfig::preset(name)
        }
        None => {
            tracing::info!("📁 Loading scenario from: {}", args.config);
            ScenarioConfig::from_file(&args.config)
        }
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load scenario: {}", e);
            eprintln!(
                "💡 Make sure the file exists and is valid TOML, or pick a preset ({})",
                PRESET_NAMES.join(", ")
            );
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.output_path {
        config.output.path = path.clone();
        tracing::info!("🔧 Output path overridden to: {}", path);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Scenario loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No simulation will run");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let engine = EtlEngine::new(SimulationPipeline::new(storage, config));

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Simulation completed successfully!");
            println!("✅ Simulation completed successfully!");
            println!("{}", energy_report(&engine.pipeline().summaries()));
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Simulation failed: {} (Category: {:?}, Severity: {:?})",
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
    }

    Ok(())
}

fn display_config_summary(config: &ScenarioConfig, args: &Args) {
    println!("📋 Scenario Summary:");
    println!("  Scenario: {}", config.scenario.name);
    if let Some(description) = &config.scenario.description {
        println!("  Description: {}", description);
    }
    println!(
        "  Period: {} .. {} every {}",
        config.simulation.start, config.simulation.end, config.simulation.freq
    );
    println!("  Module: {}", config.module_name());
    println!("  Inverter: {}", config.inverter_name());
    println!("  Sites: {}", config.sites.len());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output.formats.join(", "));
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run(config: &ScenarioConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("🔆 System:");
    let module = presets::module(config.module_name())?;
    let inverter = presets::inverter(config.inverter_name())?;
    let temperature = config.temperature_params()?;
    println!("  Module: {} cells, {:.1} m²", module.cells_in_series, module.area);
    println!("  Inverter rating: {:.0} W AC", inverter.paco);
    println!(
        "  Cell temperature model: a={} b={} ΔT={}",
        temperature.a, temperature.b, temperature.delta_t
    );
    println!("  Linke turbidity: {:?}", config.turbidity().values());

    println!();
    println!("📍 Sites:");
    for site in &config.sites {
        let location = config.location(site)?;
        let times = config.times_for(&location)?;
        let system = config.pv_system(site)?;
        println!(
            "  {} ({:.4}, {:.4}) tilt {}° azimuth {}°, {}x{} modules, {} steps from {}",
            location.name,
            location.latitude,
            location.longitude,
            system.surface_tilt,
            system.surface_azimuth,
            system.modules_per_string,
            system.strings_per_inverter,
            times.len(),
            times.first().map(|t| t.to_rfc3339()).unwrap_or_default()
        );
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    if let Some(compression) = config.compression() {
        println!("  Compression: {} (ZIP)", compression.filename);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    Ok(())
}
