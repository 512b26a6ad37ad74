//! End-to-end modelling chain: weather in, AC power out.

use crate::domain::model::Table;
use crate::solar::atmosphere::{absolute_airmass, altitude_to_pressure, relative_airmass};
use crate::solar::clearsky::{ineichen, LinkeTurbidity};
use crate::solar::inverter::SandiaInverter;
use crate::solar::irradiance::{self, extra_radiation, poa_components, PoaComponents, PoaInput, TranspositionModel};
use crate::solar::location::Location;
use crate::solar::position::{solar_position, SolarPosition};
use crate::solar::sapm::{DcOutput, SapmModule};
use crate::solar::temperature::SapmTemperature;
use crate::utils::error::Result;
use crate::utils::plot::{Figure, Series};
use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvSystem {
    pub surface_tilt: f64,
    pub surface_azimuth: f64,
    pub module: SapmModule,
    pub inverter: SandiaInverter,
    pub temperature: SapmTemperature,
    pub modules_per_string: u32,
    pub strings_per_inverter: u32,
    pub albedo: f64,
    pub transposition: TranspositionModel,
}

impl PvSystem {
    /// One module on one inverter, default albedo and transposition.
    pub fn new(
        surface_tilt: f64,
        surface_azimuth: f64,
        module: SapmModule,
        inverter: SandiaInverter,
        temperature: SapmTemperature,
    ) -> Self {
        Self {
            surface_tilt,
            surface_azimuth,
            module,
            inverter,
            temperature,
            modules_per_string: 1,
            strings_per_inverter: 1,
            albedo: irradiance::DEFAULT_ALBEDO,
            transposition: TranspositionModel::default(),
        }
    }

    pub fn with_strings(mut self, modules_per_string: u32, strings_per_inverter: u32) -> Self {
        self.modules_per_string = modules_per_string;
        self.strings_per_inverter = strings_per_inverter;
        self
    }

    pub fn with_albedo(mut self, albedo: f64) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn with_transposition(mut self, transposition: TranspositionModel) -> Self {
        self.transposition = transposition;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub time: DateTime<Utc>,
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
    pub temp_air: f64,
    pub wind_speed: f64,
}

/// Everything the chain computed for one weather record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelChainStep {
    pub time: DateTime<Utc>,
    pub solar_position: SolarPosition,
    pub airmass_relative: Option<f64>,
    pub airmass_absolute: Option<f64>,
    pub aoi: f64,
    pub poa: PoaComponents,
    pub effective_irradiance: f64,
    pub cell_temperature: f64,
    pub dc: DcOutput,
    pub ac: f64,
}

pub struct ModelChain {
    system: PvSystem,
    location: Location,
}

impl ModelChain {
    pub fn new(system: PvSystem, location: Location) -> Self {
        Self { system, location }
    }

    pub fn system(&self) -> &PvSystem {
        &self.system
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn run(&self, weather: &[WeatherRecord]) -> ModelChainResults {
        let pressure = altitude_to_pressure(self.location.altitude);
        let steps = weather
            .iter()
            .map(|record| self.step(record, pressure))
            .collect();
        tracing::debug!(
            "Model chain for {} ran {} steps",
            self.location.name,
            weather.len()
        );
        ModelChainResults {
            location: self.location.name.clone(),
            steps,
        }
    }

    fn step(&self, record: &WeatherRecord, pressure: f64) -> ModelChainStep {
        let system = &self.system;
        let position = solar_position(&self.location, record.time);
        let airmass_relative = relative_airmass(position.apparent_zenith);
        let airmass_absolute = airmass_relative.map(|am| absolute_airmass(am, pressure));
        let dni_extra = extra_radiation(record.time.ordinal());

        let aoi = irradiance::aoi(
            system.surface_tilt,
            system.surface_azimuth,
            position.apparent_zenith,
            position.azimuth,
        );
        let poa = poa_components(
            &PoaInput {
                surface_tilt: system.surface_tilt,
                surface_azimuth: system.surface_azimuth,
                solar_zenith: position.apparent_zenith,
                solar_azimuth: position.azimuth,
                dni: record.dni,
                ghi: record.ghi,
                dhi: record.dhi,
                dni_extra,
                albedo: system.albedo,
            },
            system.transposition,
        );

        let effective_irradiance =
            system
                .module
                .effective_irradiance(poa.poa_direct, poa.poa_diffuse, airmass_absolute, aoi);
        let cell_temperature =
            system
                .temperature
                .cell_temperature(poa.poa_global, record.temp_air, record.wind_speed);
        let dc = system
            .module
            .dc_output(effective_irradiance, cell_temperature)
            .scaled(system.modules_per_string, system.strings_per_inverter);
        let ac = system.inverter.ac_power(dc.v_mp, dc.p_mp);

        ModelChainStep {
            time: record.time,
            solar_position: position,
            airmass_relative,
            airmass_absolute,
            aoi,
            poa,
            effective_irradiance,
            cell_temperature,
            dc,
            ac,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelChainResults {
    pub location: String,
    pub steps: Vec<ModelChainStep>,
}

impl ModelChainResults {
    pub fn ac(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.ac).collect()
    }

    /// Length of each step in hours. The last step repeats the previous
    /// spacing; a single record counts as one hour.
    pub fn step_hours(&self) -> Vec<f64> {
        let gaps: Vec<f64> = self
            .steps
            .windows(2)
            .map(|w| hours(w[1].time - w[0].time))
            .collect();
        let last = gaps.last().copied().unwrap_or(1.0);
        gaps.into_iter()
            .chain(std::iter::once(last))
            .take(self.steps.len())
            .collect()
    }

    /// Energy delivered over the run in kWh, night tare included.
    pub fn energy_kwh(&self) -> f64 {
        self.cumulative_energy_kwh().last().copied().unwrap_or(0.0)
    }

    pub fn cumulative_energy_kwh(&self) -> Vec<f64> {
        let mut total = 0.0;
        self.steps
            .iter()
            .zip(self.step_hours())
            .map(|(step, h)| {
                total += step.ac * h / 1_000.0;
                total
            })
            .collect()
    }

    pub fn peak_ac(&self) -> f64 {
        self.steps.iter().map(|s| s.ac).fold(0.0, f64::max)
    }

    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(
            [
                "time",
                "apparent_zenith",
                "azimuth",
                "airmass_absolute",
                "aoi",
                "poa_global",
                "effective_irradiance",
                "cell_temperature",
                "v_mp",
                "p_mp",
                "ac",
                "energy_kwh",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        );
        for (step, energy) in self.steps.iter().zip(self.cumulative_energy_kwh()) {
            table.push_row(vec![
                step.time.to_rfc3339(),
                format!("{:.4}", step.solar_position.apparent_zenith),
                format!("{:.4}", step.solar_position.azimuth),
                step.airmass_absolute
                    .map(|am| format!("{:.4}", am))
                    .unwrap_or_default(),
                format!("{:.4}", step.aoi),
                format!("{:.3}", step.poa.poa_global),
                format!("{:.3}", step.effective_irradiance),
                format!("{:.3}", step.cell_temperature),
                format!("{:.3}", step.dc.v_mp),
                format!("{:.3}", step.dc.p_mp),
                format!("{:.3}", step.ac),
                format!("{:.6}", energy),
            ])?;
        }
        Ok(table)
    }

    /// AC power and cumulative energy against hours since the first step.
    pub fn figures(&self) -> (Series, Series) {
        let start = self.steps.first().map(|s| s.time);
        let x = |t: DateTime<Utc>| start.map(|s| hours(t - s)).unwrap_or(0.0);
        let power = self.steps.iter().map(|s| (x(s.time), s.ac)).collect();
        let energy = self
            .steps
            .iter()
            .zip(self.cumulative_energy_kwh())
            .map(|(s, e)| (x(s.time), e))
            .collect();
        (
            Series::new(self.location.clone(), power),
            Series::new(self.location.clone(), energy),
        )
    }
}

/// Overlay several runs: one AC-power panel and one cumulative-energy panel.
pub fn comparison_figures(results: &[ModelChainResults]) -> Vec<Figure> {
    let mut power = Figure::new("AC power", "hours since start", "AC power (W)");
    let mut energy = Figure::new("Cumulative energy", "hours since start", "Energy (kWh)");
    for run in results {
        let (p, e) = run.figures();
        power = power.with_series(p);
        energy = energy.with_series(e);
    }
    vec![power, energy]
}

fn hours(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 / 3_600.0
}

/// Ineichen clear-sky weather at `location` with constant air temperature
/// and wind speed.
pub fn clear_sky_weather(
    location: &Location,
    times: &[DateTime<Utc>],
    temp_air: f64,
    wind_speed: f64,
    turbidity: &LinkeTurbidity,
) -> Vec<WeatherRecord> {
    let pressure = altitude_to_pressure(location.altitude);
    times
        .iter()
        .map(|&time| {
            let position = solar_position(location, time);
            let airmass = relative_airmass(position.apparent_zenith)
                .map(|am| absolute_airmass(am, pressure));
            let sky = ineichen(
                position.apparent_zenith,
                airmass,
                turbidity.for_month(time.month()),
                location.altitude,
                extra_radiation(time.ordinal()),
            );
            WeatherRecord {
                time,
                ghi: sky.ghi,
                dni: sky.dni,
                dhi: sky.dhi,
                temp_air,
                wind_speed,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solar::presets;
    use crate::solar::times::date_range;
    use chrono::TimeZone;

    fn system(tilt: f64, azimuth: f64) -> PvSystem {
        PvSystem::new(
            tilt,
            azimuth,
            presets::module(presets::CANADIAN_SOLAR_CS5P_220M).unwrap(),
            presets::inverter(presets::ABB_MICRO_0_25).unwrap(),
            SapmTemperature::preset("open_rack_glass_polymer").unwrap(),
        )
    }

    fn amsterdam() -> Location {
        Location::new("Amsterdam", 52.3676, 4.9041)
    }

    fn summer_day() -> Vec<DateTime<Utc>> {
        date_range(
            Utc.with_ymd_and_hms(2023, 6, 21, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 21, 23, 0, 0).unwrap(),
            TimeDelta::hours(1),
        )
    }

    #[test]
    fn test_clear_sky_weather_is_dark_at_night() {
        let weather = clear_sky_weather(&amsterdam(), &summer_day(), 15.0, 2.0, &LinkeTurbidity::default());
        assert_eq!(weather.len(), 24);
        assert_eq!(weather[0].ghi, 0.0);
        assert!(weather[12].ghi > 600.0, "{:?}", weather[12]);
        assert!(weather.iter().all(|w| w.temp_air == 15.0 && w.wind_speed == 2.0));
    }

    #[test]
    fn test_night_draws_tare_and_noon_produces() {
        let location = amsterdam();
        let weather = clear_sky_weather(&location, &summer_day(), 15.0, 2.0, &LinkeTurbidity::default());
        let results = ModelChain::new(system(30.0, 180.0), location).run(&weather);

        assert_eq!(results.steps[0].ac, -0.075);
        let noon = &results.steps[12];
        assert!(noon.ac > 150.0 && noon.ac <= 250.0, "{}", noon.ac);
        assert!(noon.aoi < 30.0);
        assert!(results.peak_ac() <= 250.0);
    }

    #[test]
    fn test_hourly_energy_is_sum_over_thousand() {
        let location = amsterdam();
        let weather = clear_sky_weather(&location, &summer_day(), 15.0, 2.0, &LinkeTurbidity::default());
        let results = ModelChain::new(system(30.0, 180.0), location).run(&weather);

        let sum: f64 = results.ac().iter().sum();
        assert!((results.energy_kwh() - sum / 1000.0).abs() < 1e-9);
        assert!(results.energy_kwh() > 1.0 && results.energy_kwh() < 2.5);

        let cumulative = results.cumulative_energy_kwh();
        assert_eq!(cumulative.len(), 24);
        assert_eq!(cumulative.last().copied(), Some(results.energy_kwh()));
    }

    #[test]
    fn test_sub_hourly_steps_are_weighted() {
        let location = amsterdam();
        let times = date_range(
            Utc.with_ymd_and_hms(2023, 6, 21, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 21, 11, 59, 0).unwrap(),
            TimeDelta::minutes(1),
        );
        let weather = clear_sky_weather(&location, &times, 15.0, 2.0, &LinkeTurbidity::default());
        let results = ModelChain::new(system(30.0, 180.0), location).run(&weather);

        assert!(results.step_hours().iter().all(|h| (h - 1.0 / 60.0).abs() < 1e-12));
        let mean: f64 = results.ac().iter().sum::<f64>() / 60.0;
        assert!((results.energy_kwh() - mean / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_more_modules_clip_at_inverter_rating() {
        let location = amsterdam();
        let weather = clear_sky_weather(&location, &summer_day(), 15.0, 2.0, &LinkeTurbidity::default());
        let results = ModelChain::new(system(45.0, 180.0).with_strings(4, 1), location).run(&weather);
        assert_eq!(results.peak_ac(), 250.0);
    }

    #[test]
    fn test_empty_weather() {
        let results = ModelChain::new(system(0.0, 0.0), amsterdam()).run(&[]);
        assert_eq!(results.energy_kwh(), 0.0);
        assert!(results.to_table().unwrap().is_empty());
    }

    #[test]
    fn test_table_and_figures() {
        let location = amsterdam();
        let weather = clear_sky_weather(&location, &summer_day(), 15.0, 2.0, &LinkeTurbidity::default());
        let results = ModelChain::new(system(30.0, 180.0), location).run(&weather);

        let table = results.to_table().unwrap();
        assert_eq!(table.len(), 24);
        assert_eq!(table.cell(0, "airmass_absolute"), Some(""));

        let figures = comparison_figures(std::slice::from_ref(&results));
        assert_eq!(figures.len(), 2);
        assert_eq!(figures[0].series[0].label, "Amsterdam");
        assert_eq!(figures[1].series[0].points[23].0, 23.0);
    }
}
