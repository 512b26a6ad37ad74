use crate::core::dataset_loader::{ColumnLayout, MonthKey};
use crate::core::weather::parse_bound;
use crate::utils::error::{PvError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "pv-explore")]
#[command(about = "Load PV measurement archives, compare irradiance sources and simulate PV output")]
pub struct CliConfig {
    #[arg(long, global = true, default_value = "./output")]
    pub output_path: String,

    /// Bundle every output file into this zip archive instead
    #[arg(long, global = true)]
    pub zip: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines on stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load selected months and data types from a measurement archive
    Load(LoadArgs),
    /// Compare KNMI station radiation with Solcast satellite irradiance
    Weather(WeatherArgs),
    /// Run the PV model chain for a scenario file or a built-in preset
    Simulate(SimulateArgs),
    /// Load CSV files and plot the first column against the second
    Plot(PlotArgs),
}

#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Archive root holding <YYYY>_V3/<YYYY>_<MM>/ folders
    #[arg(long)]
    pub root: String,

    /// Months as YYYY_MM
    #[arg(long, value_delimiter = ',', required = true)]
    pub months: Vec<String>,

    /// Data types such as Irradiance,LightSpectra
    #[arg(long, value_delimiter = ',', required = true)]
    pub types: Vec<String>,

    /// long or wide
    #[arg(long, default_value = "long")]
    pub layout: String,

    /// Read files on first access instead of up front
    #[arg(long)]
    pub lazy: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WeatherArgs {
    #[arg(long)]
    pub knmi: String,

    #[arg(long)]
    pub solcast: String,

    /// Inclusive start, date or date-time (UTC unless an offset is given)
    #[arg(long)]
    pub start: String,

    /// Exclusive end
    #[arg(long)]
    pub end: String,

    #[arg(long, default_value_t = crate::core::weather::KNMI_PREAMBLE_LINES)]
    pub knmi_skip_rows: usize,
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    /// Scenario TOML file; overrides --preset
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, default_value = "three-sites")]
    pub preset: String,
}

#[derive(Debug, Clone, Args)]
pub struct PlotArgs {
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Dataset to plot; the first uploaded file when omitted
    #[arg(long)]
    pub dataset: Option<String>,
}

impl CliConfig {
    pub fn command_name(&self) -> &'static str {
        match self.command {
            Command::Load(_) => "load",
            Command::Weather(_) => "weather",
            Command::Simulate(_) => "simulate",
            Command::Plot(_) => "plot",
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("output_path", &self.output_path)?;
        if let Some(zip) = &self.zip {
            validation::validate_non_empty_string("zip", zip)?;
        }

        match &self.command {
            Command::Load(args) => {
                validation::validate_path("root", &args.root)?;
                for month in &args.months {
                    month.parse::<MonthKey>()?;
                }
                for data_type in &args.types {
                    validation::validate_non_empty_string("types", data_type)?;
                }
                args.layout.parse::<ColumnLayout>()?;
            }
            Command::Weather(args) => {
                validation::validate_path("knmi", &args.knmi)?;
                validation::validate_path("solcast", &args.solcast)?;
                let start = parse_bound("start", &args.start)?;
                let end = parse_bound("end", &args.end)?;
                if end <= start {
                    return Err(PvError::ConfigValidationError {
                        field: "end".to_string(),
                        message: "The comparison window is empty".to_string(),
                    });
                }
            }
            Command::Simulate(args) => {
                if let Some(config) = &args.config {
                    validation::validate_path("config", config)?;
                } else {
                    validation::validate_non_empty_string("preset", &args.preset)?;
                }
            }
            Command::Plot(args) => {
                for file in &args.files {
                    validation::validate_path("files", file)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_arguments() {
        let config = CliConfig::parse_from([
            "pv-explore",
            "load",
            "--root",
            "/data",
            "--months",
            "2024_01,2024_02",
            "--types",
            "Irradiance,LightSpectra",
            "--layout",
            "wide",
        ]);
        assert_eq!(config.command_name(), "load");
        assert_eq!(config.output_path, "./output");
        match &config.command {
            Command::Load(args) => {
                assert_eq!(args.months, vec!["2024_01", "2024_02"]);
                assert_eq!(args.types.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_month_fails_validation() {
        let config = CliConfig::parse_from([
            "pv-explore", "load", "--root", "/data", "--months", "2024-01", "--types", "Irradiance",
        ]);
        assert!(matches!(config.validate(), Err(PvError::InvalidMonthKey { .. })));
    }

    #[test]
    fn test_weather_window_must_be_ordered() {
        let config = CliConfig::parse_from([
            "pv-explore", "weather", "--knmi", "k.txt", "--solcast", "s.csv", "--start", "2024-06-02",
            "--end", "2024-06-01",
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = CliConfig::parse_from(["pv-explore", "simulate", "--preset", "amolf", "--verbose", "--zip", "run.zip"]);
        assert!(config.verbose);
        assert_eq!(config.zip.as_deref(), Some("run.zip"));
        config.validate().unwrap();
    }
}
