use crate::utils::error::{PvError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

pub const SOLAR_CONSTANT: f64 = 1_366.1;
pub const DEFAULT_ALBEDO: f64 = 0.25;

/// Extraterrestrial normal irradiance in W/m² (Spencer 1971).
pub fn extra_radiation(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - 1.0) / 365.0;
    let rover_r0_sqrd = 1.000_11
        + 0.034_221 * b.cos()
        + 0.001_28 * b.sin()
        + 0.000_719 * (2.0 * b).cos()
        + 0.000_077 * (2.0 * b).sin();
    SOLAR_CONSTANT * rover_r0_sqrd
}

/// Cosine of the angle of incidence between the sun and the panel normal,
/// clamped to [-1, 1].
pub fn aoi_projection(surface_tilt: f64, surface_azimuth: f64, zenith: f64, azimuth: f64) -> f64 {
    let (st, sa, z, a) = (
        surface_tilt.to_radians(),
        surface_azimuth.to_radians(),
        zenith.to_radians(),
        azimuth.to_radians(),
    );
    (st.cos() * z.cos() + st.sin() * z.sin() * (a - sa).cos()).clamp(-1.0, 1.0)
}

/// Angle of incidence in degrees.
pub fn aoi(surface_tilt: f64, surface_azimuth: f64, zenith: f64, azimuth: f64) -> f64 {
    aoi_projection(surface_tilt, surface_azimuth, zenith, azimuth)
        .acos()
        .to_degrees()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranspositionModel {
    Isotropic,
    #[default]
    HayDavies,
}

impl FromStr for TranspositionModel {
    type Err = PvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "isotropic" => Ok(TranspositionModel::Isotropic),
            "haydavies" => Ok(TranspositionModel::HayDavies),
            _ => Err(PvError::InvalidConfigValueError {
                field: "transposition".to_string(),
                value: s.to_string(),
                reason: "Valid models: isotropic, hay_davies".to_string(),
            }),
        }
    }
}

/// Plane-of-array irradiance in W/m².
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PoaComponents {
    pub poa_global: f64,
    pub poa_direct: f64,
    pub poa_diffuse: f64,
    pub poa_sky_diffuse: f64,
    pub poa_ground_diffuse: f64,
}

pub struct PoaInput {
    pub surface_tilt: f64,
    pub surface_azimuth: f64,
    pub solar_zenith: f64,
    pub solar_azimuth: f64,
    pub dni: f64,
    pub ghi: f64,
    pub dhi: f64,
    pub dni_extra: f64,
    pub albedo: f64,
}

pub fn poa_components(input: &PoaInput, model: TranspositionModel) -> PoaComponents {
    let projection = aoi_projection(
        input.surface_tilt,
        input.surface_azimuth,
        input.solar_zenith,
        input.solar_azimuth,
    );
    let tilt_cos = input.surface_tilt.to_radians().cos();

    let poa_direct = (input.dni * projection).max(0.0);
    let poa_ground_diffuse = input.ghi * input.albedo * (1.0 - tilt_cos) * 0.5;
    let sky_view = (1.0 + tilt_cos) * 0.5;

    let poa_sky_diffuse = match model {
        TranspositionModel::Isotropic => input.dhi * sky_view,
        TranspositionModel::HayDavies => {
            let cos_zenith = input.solar_zenith.to_radians().cos().max(0.017_45);
            let rb = projection.max(0.0) / cos_zenith;
            let anisotropy = if input.dni_extra > 0.0 {
                input.dni / input.dni_extra
            } else {
                0.0
            };
            (input.dhi * (anisotropy * rb + (1.0 - anisotropy) * sky_view)).max(0.0)
        }
    };

    let poa_diffuse = poa_sky_diffuse + poa_ground_diffuse;
    PoaComponents {
        poa_global: poa_direct + poa_diffuse,
        poa_direct,
        poa_diffuse,
        poa_sky_diffuse,
        poa_ground_diffuse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(tilt: f64, zenith: f64, azimuth: f64) -> PoaInput {
        PoaInput {
            surface_tilt: tilt,
            surface_azimuth: 180.0,
            solar_zenith: zenith,
            solar_azimuth: azimuth,
            dni: 800.0,
            ghi: 600.0,
            dhi: 100.0,
            dni_extra: 1367.0,
            albedo: DEFAULT_ALBEDO,
        }
    }

    #[test]
    fn test_extra_radiation_peaks_in_january() {
        let january = extra_radiation(3);
        let july = extra_radiation(185);
        assert!(january > 1400.0 && january < 1420.0, "{}", january);
        assert!(july > 1315.0 && july < 1330.0, "{}", july);
    }

    #[test]
    fn test_aoi_facing_the_sun_is_zero() {
        assert!(aoi(30.0, 180.0, 30.0, 180.0).abs() < 1e-6);
        assert!((aoi(0.0, 180.0, 40.0, 90.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizontal_surface_sees_horizontal_irradiance() {
        let poa = poa_components(&input(0.0, 40.0, 150.0), TranspositionModel::Isotropic);
        assert!((poa.poa_direct - 800.0 * 40f64.to_radians().cos()).abs() < 1e-9);
        assert!((poa.poa_sky_diffuse - 100.0).abs() < 1e-9);
        assert_eq!(poa.poa_ground_diffuse, 0.0);
    }

    #[test]
    fn test_sun_behind_panel_has_no_beam() {
        let poa = poa_components(&input(60.0, 70.0, 0.0), TranspositionModel::HayDavies);
        assert_eq!(poa.poa_direct, 0.0);
        assert!(poa.poa_diffuse > 0.0);
    }

    #[test]
    fn test_hay_davies_boosts_circumsolar_diffuse() {
        let iso = poa_components(&input(30.0, 30.0, 180.0), TranspositionModel::Isotropic);
        let hay = poa_components(&input(30.0, 30.0, 180.0), TranspositionModel::HayDavies);
        assert!(hay.poa_sky_diffuse > iso.poa_sky_diffuse);
    }

    #[test]
    fn test_model_names() {
        assert_eq!(
            "hay_davies".parse::<TranspositionModel>().unwrap(),
            TranspositionModel::HayDavies
        );
        assert!("perez".parse::<TranspositionModel>().is_err());
    }
}
