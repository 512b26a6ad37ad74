//! Solar position from the NOAA solar calculator equations.
//!
//! Accurate to well under a tenth of a degree between 1900 and 2100, which is
//! far below the resolution of any irradiance model downstream.

use crate::solar::location::Location;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarPosition {
    pub zenith: f64,
    /// Zenith corrected for atmospheric refraction.
    pub apparent_zenith: f64,
    pub elevation: f64,
    pub apparent_elevation: f64,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Minutes.
    pub equation_of_time: f64,
    pub declination: f64,
}

fn julian_day(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    seconds / 86_400.0 + 2_440_587.5
}

pub fn solar_position(location: &Location, time: DateTime<Utc>) -> SolarPosition {
    let jc = (julian_day(time) - 2_451_545.0) / 36_525.0;

    let mean_long = (280.46646 + jc * (36_000.769_83 + jc * 0.000_303_2)).rem_euclid(360.0);
    let mean_anom = 357.529_11 + jc * (35_999.050_29 - 0.000_153_7 * jc);
    let eccent = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);

    let m = mean_anom.to_radians();
    let center = m.sin() * (1.914_602 - jc * (0.004_817 + 0.000_014 * jc))
        + (2.0 * m).sin() * (0.019_993 - 0.000_101 * jc)
        + (3.0 * m).sin() * 0.000_289;
    let true_long = mean_long + center;
    let omega = (125.04 - 1_934.136 * jc).to_radians();
    let apparent_long = true_long - 0.005_69 - 0.004_78 * omega.sin();

    let mean_obliq = 23.0
        + (26.0 + (21.448 - jc * (46.815 + jc * (0.000_59 - jc * 0.001_813))) / 60.0) / 60.0;
    let obliq = (mean_obliq + 0.002_56 * omega.cos()).to_radians();

    let declination = (obliq.sin() * apparent_long.to_radians().sin()).asin();

    let y = (obliq / 2.0).tan().powi(2);
    let l0 = mean_long.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccent * m.sin()
            + 4.0 * eccent * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccent * eccent * (2.0 * m).sin())
        .to_degrees();

    let minutes = time.hour() as f64 * 60.0
        + time.minute() as f64
        + (time.second() as f64 + time.nanosecond() as f64 * 1e-9) / 60.0;
    let true_solar_time = (minutes + equation_of_time + 4.0 * location.longitude).rem_euclid(1440.0);
    let hour_angle = true_solar_time / 4.0 - 180.0;

    let lat = location.latitude.to_radians();
    let cos_zenith = (lat.sin() * declination.sin()
        + lat.cos() * declination.cos() * hour_angle.to_radians().cos())
    .clamp(-1.0, 1.0);
    let zenith_rad = cos_zenith.acos();
    let zenith = zenith_rad.to_degrees();
    let elevation = 90.0 - zenith;

    let refraction = refraction_correction(elevation);
    let apparent_elevation = elevation + refraction;

    let denom = lat.cos() * zenith_rad.sin();
    let cos_az = if denom.abs() < 1e-12 {
        // sun at zenith or observer at a pole: azimuth is degenerate
        1.0
    } else {
        ((lat.sin() * cos_zenith - declination.sin()) / denom).clamp(-1.0, 1.0)
    };
    let az = cos_az.acos().to_degrees();
    let azimuth = if hour_angle > 0.0 {
        (az + 180.0).rem_euclid(360.0)
    } else {
        (540.0 - az).rem_euclid(360.0)
    };

    SolarPosition {
        zenith,
        apparent_zenith: 90.0 - apparent_elevation,
        elevation,
        apparent_elevation,
        azimuth,
        equation_of_time,
        declination: declination.to_degrees(),
    }
}

/// Atmospheric refraction in degrees for a geometric elevation in degrees.
fn refraction_correction(elevation: f64) -> f64 {
    let arcsec = if elevation > 85.0 {
        0.0
    } else if elevation > 5.0 {
        let t = elevation.to_radians().tan();
        58.1 / t - 0.07 / t.powi(3) + 0.000_086 / t.powi(5)
    } else if elevation > -0.575 {
        1_735.0
            + elevation * (-518.2 + elevation * (103.4 + elevation * (-12.79 + elevation * 0.711)))
    } else {
        -20.772 / elevation.to_radians().tan()
    };
    arcsec / 3_600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn amsterdam() -> Location {
        Location::new("Amsterdam", 52.3676, 4.9041)
    }

    #[test]
    fn test_summer_solstice_noon_amsterdam() {
        // Solar noon is near 11:40 UTC; elevation ≈ 90 − 52.37 + 23.44.
        let t = Utc.with_ymd_and_hms(2023, 6, 21, 11, 40, 0).unwrap();
        let pos = solar_position(&amsterdam(), t);
        assert!((pos.elevation - 61.07).abs() < 0.3, "{}", pos.elevation);
        assert!((pos.azimuth - 180.0).abs() < 3.0, "{}", pos.azimuth);
        assert!((pos.declination - 23.44).abs() < 0.05);
    }

    #[test]
    fn test_morning_sun_is_in_the_east() {
        let t = Utc.with_ymd_and_hms(2023, 6, 21, 6, 0, 0).unwrap();
        let pos = solar_position(&amsterdam(), t);
        assert!(pos.azimuth > 45.0 && pos.azimuth < 135.0, "{}", pos.azimuth);
        assert!(pos.elevation > 0.0);
    }

    #[test]
    fn test_midnight_sun_below_horizon() {
        let t = Utc.with_ymd_and_hms(2023, 12, 21, 0, 0, 0).unwrap();
        let pos = solar_position(&amsterdam(), t);
        assert!(pos.elevation < -50.0);
        assert!(pos.apparent_zenith > 90.0);
    }

    #[test]
    fn test_refraction_lifts_sun_near_horizon() {
        assert!(refraction_correction(0.0) > 0.4);
        assert_eq!(refraction_correction(89.0), 0.0);
        assert!(refraction_correction(30.0) < 0.05);
    }

    #[test]
    fn test_sydney_noon_sun_is_north() {
        let sydney = Location::new("Sydney", -33.8688, 151.2093);
        // Local solar noon is close to 02:00 UTC.
        let t = Utc.with_ymd_and_hms(2023, 6, 21, 1, 55, 0).unwrap();
        let pos = solar_position(&sydney, t);
        assert!(pos.azimuth < 10.0 || pos.azimuth > 350.0, "{}", pos.azimuth);
        assert!((pos.elevation - 32.7).abs() < 0.5, "{}", pos.elevation);
    }
}
