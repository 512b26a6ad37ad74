/// Standard sea-level pressure in Pa.
pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0;

/// Kasten & Young (1989) relative optical airmass. `None` once the sun is
/// below the horizon.
pub fn relative_airmass(zenith: f64) -> Option<f64> {
    if !(0.0..=90.0).contains(&zenith) {
        return None;
    }
    let am = 1.0 / (zenith.to_radians().cos() + 0.505_72 * (6.079_95 + (90.0 - zenith)).powf(-1.636_4));
    Some(am)
}

/// Standard-atmosphere pressure in Pa at `altitude` metres.
pub fn altitude_to_pressure(altitude: f64) -> f64 {
    100.0 * ((44_331.514 - altitude) / 11_880.516).powf(1.0 / 0.190_263_2)
}

pub fn absolute_airmass(relative: f64, pressure: f64) -> f64 {
    relative * pressure / SEA_LEVEL_PRESSURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airmass_overhead_is_one() {
        assert!((relative_airmass(0.0).unwrap() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_airmass_at_sixty_degrees_is_about_two() {
        assert!((relative_airmass(60.0).unwrap() - 1.99).abs() < 0.02);
    }

    #[test]
    fn test_airmass_below_horizon() {
        assert!(relative_airmass(90.5).is_none());
        assert!(relative_airmass(f64::NAN).is_none());
        assert!(relative_airmass(90.0).unwrap() > 35.0);
    }

    #[test]
    fn test_pressure_at_sea_level() {
        assert!((altitude_to_pressure(0.0) - SEA_LEVEL_PRESSURE).abs() < 50.0);
        assert!(altitude_to_pressure(1000.0) < 90_000.0);
    }
}
