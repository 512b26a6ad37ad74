use crate::core::weather::{parse_naive_timestamp, parse_zoned_timestamp};
use crate::solar::clearsky::LinkeTurbidity;
use crate::solar::irradiance::{TranspositionModel, DEFAULT_ALBEDO};
use crate::solar::location::{parse_utc_offset, Location};
use crate::solar::modelchain::PvSystem;
use crate::solar::presets;
use crate::solar::temperature::SapmTemperature;
use crate::solar::times::{date_range, parse_freq};
use crate::utils::error::{PvError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const OUTPUT_FORMATS: [&str; 3] = ["csv", "json", "svg"];
pub const PRESET_NAMES: [&str; 2] = ["three-sites", "amolf"];
const DEFAULT_TEMPERATURE_MODEL: &str = "open_rack_glass_polymer";

static ENV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid"));

/// A simulation scenario: one PV system design evaluated at one or more sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario: ScenarioInfo,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub system: SystemConfig,
    pub sites: Vec<SiteConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Date or date-time. Without an offset it is read in each site's
    /// local time.
    pub start: String,
    pub end: String,
    #[serde(default = "default_freq")]
    pub freq: String,
    pub linke_turbidity: Option<LinkeTurbidity>,
}

fn default_freq() -> String {
    "1H".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub module: Option<String>,
    pub inverter: Option<String>,
    /// Named SAPM temperature preset; wins over `racking_model`/`module_type`.
    pub temperature_model: Option<String>,
    pub racking_model: Option<String>,
    pub module_type: Option<String>,
    pub modules_per_string: Option<u32>,
    pub strings_per_inverter: Option<u32>,
    pub albedo: Option<f64>,
    pub transposition: Option<TranspositionModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub utc_offset: Option<String>,
    pub surface_tilt: f64,
    pub surface_azimuth: f64,
    pub temp_air: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

fn default_formats() -> Vec<String> {
    OUTPUT_FORMATS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

const THREE_SITES: &str = r#"
[scenario]
name = "three-sites"
description = "Clear-sky year at Amsterdam, Sydney and McMurdo"

[simulation]
start = "2023-06-01T00:00:00Z"
end = "2024-06-01T00:00:00Z"
freq = "1H"

[system]
module = "Canadian_Solar_CS5P_220M___2009_"
inverter = "ABB__MICRO_0_25_I_OUTD_US_208__208V_"
racking_model = "open_rack"
module_type = "glass_polymer"

[[sites]]
name = "Amsterdam"
latitude = 52.3676
longitude = 4.9041
surface_tilt = 30.0
surface_azimuth = 180.0
temp_air = 15.0
wind_speed = 2.0

[[sites]]
name = "Sydney"
latitude = -33.8688
longitude = 151.2093
surface_tilt = 0.0
surface_azimuth = 0.0
temp_air = 20.0
wind_speed = 3.0

[[sites]]
name = "McMurdo"
latitude = -77.8419
longitude = 166.6863
surface_tilt = 10.0
surface_azimuth = 0.0
temp_air = -20.0
wind_speed = 5.0

[output]
path = "./output"
"#;

const AMOLF: &str = r#"
[scenario]
name = "amolf"
description = "One week of one-minute clear-sky output for a four-module string"

[simulation]
start = "2021-07-01"
end = "2021-07-07"
freq = "1min"

[system]
module = "Canadian_Solar_CS5P_220M___2009_"
inverter = "ABB__MICRO_0_25_I_OUTD_US_208__208V_"
temperature_model = "open_rack_glass_glass"
modules_per_string = 4
strings_per_inverter = 1

[[sites]]
name = "amolf"
latitude = 52.3676
longitude = 4.9041
utc_offset = "+02:00"
surface_tilt = 45.0
surface_azimuth = 180.0
temp_air = 20.0
wind_speed = 0.0

[output]
path = "./output"
"#;

impl ScenarioConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PvError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| PvError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Built-in scenario by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "three-sites" => Self::from_toml_str(THREE_SITES),
            "amolf" => Self::from_toml_str(AMOLF),
            other => Err(PvError::InvalidConfigValueError {
                field: "preset".to_string(),
                value: other.to_string(),
                reason: format!("Known presets: {}", PRESET_NAMES.join(", ")),
            }),
        }
    }

    /// Replace `${VAR}` with the variable's value; unknown variables are left
    /// as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("scenario.name", &self.scenario.name)?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_positive_number("sites", self.sites.len(), 1)?;

        parse_freq(&self.simulation.freq)?;
        for (field, value) in [("simulation.start", &self.simulation.start), ("simulation.end", &self.simulation.end)] {
            if parse_zoned_timestamp(value).is_none() && parse_naive_timestamp(value).is_none() {
                return Err(PvError::InvalidTimestamp {
                    value: value.clone(),
                    reason: format!("{} must be a date (YYYY-MM-DD) or date-time", field),
                });
            }
        }
        if let Some(LinkeTurbidity::Constant(tl)) = &self.simulation.linke_turbidity {
            validation::validate_range("simulation.linke_turbidity", *tl, 1.0, 10.0)?;
        }

        for format in &self.output.formats {
            if !OUTPUT_FORMATS.contains(&format.as_str()) {
                return Err(PvError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!("Unsupported format. Valid formats: {}", OUTPUT_FORMATS.join(", ")),
                });
            }
        }
        if let Some(compression) = self.compression() {
            validation::validate_non_empty_string("output.compression.filename", &compression.filename)?;
        }

        presets::module(self.module_name())?;
        presets::inverter(self.inverter_name())?;
        self.temperature_params()?;
        if let Some(n) = self.system.modules_per_string {
            validation::validate_positive_number("system.modules_per_string", n as usize, 1)?;
        }
        if let Some(n) = self.system.strings_per_inverter {
            validation::validate_positive_number("system.strings_per_inverter", n as usize, 1)?;
        }
        if let Some(albedo) = self.system.albedo {
            validation::validate_range("system.albedo", albedo, 0.0, 1.0)?;
        }

        for site in &self.sites {
            validation::validate_non_empty_string("sites.name", &site.name)?;
            validation::validate_range("sites.latitude", site.latitude, -90.0, 90.0)?;
            validation::validate_range("sites.longitude", site.longitude, -180.0, 180.0)?;
            validation::validate_range("sites.surface_tilt", site.surface_tilt, 0.0, 90.0)?;
            validation::validate_range("sites.surface_azimuth", site.surface_azimuth, 0.0, 360.0)?;
            validation::validate_range("sites.wind_speed", site.wind_speed, 0.0, 100.0)?;
            let location = self.location(site)?;
            let (start, end) = self.bounds(&location)?;
            if end < start {
                return Err(PvError::ConfigValidationError {
                    field: "simulation.end".to_string(),
                    message: format!("{} ends before it starts", site.name),
                });
            }
        }

        Ok(())
    }

    pub fn module_name(&self) -> &str {
        self.system
            .module
            .as_deref()
            .unwrap_or(presets::CANADIAN_SOLAR_CS5P_220M)
    }

    pub fn inverter_name(&self) -> &str {
        self.system
            .inverter
            .as_deref()
            .unwrap_or(presets::ABB_MICRO_0_25)
    }

    pub fn temperature_params(&self) -> Result<SapmTemperature> {
        match (
            &self.system.temperature_model,
            &self.system.racking_model,
            &self.system.module_type,
        ) {
            (Some(name), _, _) => SapmTemperature::preset(name),
            (None, Some(racking), Some(module_type)) => SapmTemperature::for_mounting(racking, module_type),
            (None, Some(_), None) => Err(PvError::MissingConfigError {
                field: "system.module_type".to_string(),
            }),
            (None, None, Some(_)) => Err(PvError::MissingConfigError {
                field: "system.racking_model".to_string(),
            }),
            (None, None, None) => SapmTemperature::preset(DEFAULT_TEMPERATURE_MODEL),
        }
    }

    pub fn turbidity(&self) -> LinkeTurbidity {
        self.simulation.linke_turbidity.clone().unwrap_or_default()
    }

    pub fn location(&self, site: &SiteConfig) -> Result<Location> {
        let mut location = Location::new(site.name.clone(), site.latitude, site.longitude)
            .with_altitude(site.altitude.unwrap_or(0.0));
        if let Some(offset) = &site.utc_offset {
            location = location.with_utc_offset(parse_utc_offset(offset)?);
        }
        Ok(location)
    }

    pub fn pv_system(&self, site: &SiteConfig) -> Result<PvSystem> {
        let system = PvSystem::new(
            site.surface_tilt,
            site.surface_azimuth,
            presets::module(self.module_name())?,
            presets::inverter(self.inverter_name())?,
            self.temperature_params()?,
        )
        .with_strings(
            self.system.modules_per_string.unwrap_or(1),
            self.system.strings_per_inverter.unwrap_or(1),
        )
        .with_albedo(self.system.albedo.unwrap_or(DEFAULT_ALBEDO))
        .with_transposition(self.system.transposition.unwrap_or_default());
        Ok(system)
    }

    fn bounds(&self, location: &Location) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let resolve = |value: &str| -> Result<DateTime<Utc>> {
            if let Some(t) = parse_zoned_timestamp(value) {
                return Ok(t);
            }
            match parse_naive_timestamp(value) {
                Some(naive) => location.localize(naive),
                None => Err(PvError::InvalidTimestamp {
                    value: value.to_string(),
                    reason: "expected a date (YYYY-MM-DD) or date-time".to_string(),
                }),
            }
        };
        Ok((resolve(&self.simulation.start)?, resolve(&self.simulation.end)?))
    }

    /// Simulation time stamps for a site, both ends included.
    pub fn times_for(&self, location: &Location) -> Result<Vec<DateTime<Utc>>> {
        let (start, end) = self.bounds(location)?;
        Ok(date_range(start, end, parse_freq(&self.simulation.freq)?))
    }

    pub fn output_path(&self) -> &str {
        &self.output.path
    }

    pub fn wants(&self, format: &str) -> bool {
        self.output.formats.iter().any(|f| f == format)
    }

    /// Zip settings, only when enabled.
    pub fn compression(&self) -> Option<&CompressionConfig> {
        self.output.compression.as_ref().filter(|c| c.enabled)
    }
}

impl Validate for ScenarioConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[scenario]
name = "test"

[simulation]
start = "2023-06-21"
end = "2023-06-22"

[[sites]]
name = "Delft"
latitude = 52.0
longitude = 4.36
surface_tilt = 35.0
surface_azimuth = 180.0
temp_air = 18.0
wind_speed = 1.5

[output]
path = "./out"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.simulation.freq, "1H");
        assert_eq!(config.output.formats, vec!["csv", "json", "svg"]);
        assert_eq!(config.module_name(), presets::CANADIAN_SOLAR_CS5P_220M);
        assert_eq!(config.temperature_params().unwrap().a, -3.56);
        assert_eq!(config.turbidity(), LinkeTurbidity::Constant(3.0));
        assert!(config.compression().is_none());

        let location = config.location(&config.sites[0]).unwrap();
        assert_eq!(config.times_for(&location).unwrap().len(), 25);
    }

    #[test]
    fn test_presets_validate() {
        for name in PRESET_NAMES {
            let config = ScenarioConfig::preset(name).unwrap();
            config.validate().unwrap();
        }
        assert!(ScenarioConfig::preset("mars").is_err());
    }

    #[test]
    fn test_three_sites_hourly_year() {
        let config = ScenarioConfig::preset("three-sites").unwrap();
        assert_eq!(config.sites.len(), 3);
        let location = config.location(&config.sites[2]).unwrap();
        assert_eq!(location.name, "McMurdo");
        assert_eq!(config.times_for(&location).unwrap().len(), 366 * 24 + 1);
        assert_eq!(config.pv_system(&config.sites[0]).unwrap().surface_tilt, 30.0);
    }

    #[test]
    fn test_amolf_times_are_local() {
        let config = ScenarioConfig::preset("amolf").unwrap();
        let location = config.location(&config.sites[0]).unwrap();
        let times = config.times_for(&location).unwrap();
        assert_eq!(times[0].to_rfc3339(), "2021-06-30T22:00:00+00:00");
        assert_eq!(times.len(), 6 * 24 * 60 + 1);

        let system = config.pv_system(&config.sites[0]).unwrap();
        assert_eq!(system.modules_per_string, 4);
        assert_eq!(system.temperature.a, -3.47);
        // clear-sky weather without measured temperature or wind
        assert_eq!(config.sites[0].temp_air, 20.0);
        assert_eq!(config.sites[0].wind_speed, 0.0);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PV_EXPLORE_TEST_OUT", "/tmp/pv-out");
        let content = MINIMAL.replace("./out", "${PV_EXPLORE_TEST_OUT}");
        let config = ScenarioConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.output_path(), "/tmp/pv-out");
        std::env::remove_var("PV_EXPLORE_TEST_OUT");
    }

    #[test]
    fn test_monthly_turbidity() {
        let content = MINIMAL.replace(
            "end = \"2023-06-22\"",
            "end = \"2023-06-22\"\nlinke_turbidity = [2.0, 2.0, 3.0, 3.0, 3.0, 3.5, 3.5, 3.5, 3.0, 3.0, 2.0, 2.0]",
        );
        let config = ScenarioConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.turbidity().for_month(6), 3.5);
    }

    #[test]
    fn test_validation_failures() {
        let bad_format = MINIMAL.replace("path = \"./out\"", "path = \"./out\"\nformats = [\"xlsx\"]");
        assert!(ScenarioConfig::from_toml_str(&bad_format).unwrap().validate().is_err());

        let bad_latitude = MINIMAL.replace("latitude = 52.0", "latitude = 152.0");
        assert!(ScenarioConfig::from_toml_str(&bad_latitude).unwrap().validate().is_err());

        let reversed = MINIMAL.replace("end = \"2023-06-22\"", "end = \"2023-06-01\"");
        assert!(ScenarioConfig::from_toml_str(&reversed).unwrap().validate().is_err());

        let half_mounting = MINIMAL.replace("[[sites]]", "[system]\nracking_model = \"open_rack\"\n\n[[sites]]");
        let err = ScenarioConfig::from_toml_str(&half_mounting)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(matches!(err, PvError::MissingConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = ScenarioConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scenario.name, "test");
    }
}
