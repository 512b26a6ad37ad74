use crate::utils::error::{PvError, Result};
use serde::{Deserialize, Serialize};

/// Sandia Array Performance Model cell-temperature coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SapmTemperature {
    pub a: f64,
    pub b: f64,
    pub delta_t: f64,
}

pub const PRESET_NAMES: [&str; 4] = [
    "open_rack_glass_glass",
    "close_mount_glass_glass",
    "open_rack_glass_polymer",
    "insulated_back_glass_polymer",
];

impl SapmTemperature {
    pub fn preset(name: &str) -> Result<Self> {
        let (a, b, delta_t) = match name {
            "open_rack_glass_glass" => (-3.47, -0.0594, 3.0),
            "close_mount_glass_glass" => (-2.98, -0.0471, 1.0),
            "open_rack_glass_polymer" => (-3.56, -0.0750, 3.0),
            "insulated_back_glass_polymer" => (-2.81, -0.0455, 0.0),
            other => {
                return Err(PvError::InvalidConfigValueError {
                    field: "temperature_model".to_string(),
                    value: other.to_string(),
                    reason: format!("Known presets: {}", PRESET_NAMES.join(", ")),
                })
            }
        };
        Ok(Self { a, b, delta_t })
    }

    /// Preset for a mounting style and module construction, for example
    /// `("open_rack", "glass_polymer")`.
    pub fn for_mounting(racking_model: &str, module_type: &str) -> Result<Self> {
        Self::preset(&format!("{}_{}", racking_model, module_type))
    }

    /// Module back-surface temperature in °C.
    pub fn module_temperature(&self, poa_global: f64, temp_air: f64, wind_speed: f64) -> f64 {
        poa_global * (self.a + self.b * wind_speed).exp() + temp_air
    }

    /// Cell temperature in °C.
    pub fn cell_temperature(&self, poa_global: f64, temp_air: f64, wind_speed: f64) -> f64 {
        self.module_temperature(poa_global, temp_air, wind_speed) + poa_global / 1_000.0 * self.delta_t
    }
}

/// SAPM cell temperature in °C.
pub fn sapm_cell(poa_global: f64, temp_air: f64, wind_speed: f64, params: &SapmTemperature) -> f64 {
    params.cell_temperature(poa_global, temp_air, wind_speed)
}
