//! Ineichen–Perez clear-sky model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClearSky {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

/// Linke turbidity: one value for the whole year or one per calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkeTurbidity {
    Constant(f64),
    Monthly([f64; 12]),
}

impl Default for LinkeTurbidity {
    fn default() -> Self {
        LinkeTurbidity::Constant(3.0)
    }
}

impl LinkeTurbidity {
    /// `month` is 1-based.
    pub fn for_month(&self, month: u32) -> f64 {
        match self {
            LinkeTurbidity::Constant(tl) => *tl,
            LinkeTurbidity::Monthly(values) => values[(month.clamp(1, 12) - 1) as usize],
        }
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            LinkeTurbidity::Constant(tl) => vec![*tl],
            LinkeTurbidity::Monthly(values) => values.to_vec(),
        }
    }
}

/// Clear-sky irradiance for one instant.
///
/// `airmass_absolute` is `None` when the sun is down, in which case all
/// components are zero.
pub fn ineichen(
    apparent_zenith: f64,
    airmass_absolute: Option<f64>,
    linke_turbidity: f64,
    altitude: f64,
    dni_extra: f64,
) -> ClearSky {
    let Some(am) = airmass_absolute else {
        return ClearSky::default();
    };
    let cos_zenith = apparent_zenith.to_radians().cos().max(0.0);
    if cos_zenith <= 0.0 || !am.is_finite() {
        return ClearSky::default();
    }

    let tl = linke_turbidity;
    let fh1 = (-altitude / 8_000.0).exp();
    let fh2 = (-altitude / 1_250.0).exp();
    let cg1 = 5.09e-5 * altitude + 0.868;
    let cg2 = 3.92e-5 * altitude + 0.0387;

    let ghi = (-cg2 * am * (fh1 + fh2 * (tl - 1.0))).exp().max(0.0);
    let ghi = cg1 * dni_extra * cos_zenith * ghi;

    let b = 0.664 + 0.163 / fh1;
    let bnci = dni_extra * (b * (-0.09 * am * (tl - 1.0)).exp()).max(0.0);

    let bnci_2 = (1.0 - (0.1 - 0.2 * (-tl).exp()) / (0.1 + 0.882 / fh1)) / cos_zenith;
    let bnci_2 = ghi * bnci_2.clamp(0.0, 1e20);

    let dni = bnci.min(bnci_2);
    let dhi = ghi - dni * cos_zenith;

    ClearSky { ghi, dni, dhi }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_night_is_dark() {
        assert_eq!(ineichen(95.0, None, 3.0, 0.0, 1366.0), ClearSky::default());
    }

    #[test]
    fn test_overhead_sun_clear_sky() {
        let sky = ineichen(0.0, Some(1.0), 3.0, 0.0, 1366.1);
        assert!(sky.ghi > 950.0 && sky.ghi < 1100.0, "{:?}", sky);
        assert!(sky.dni > 850.0 && sky.dni < 1000.0, "{:?}", sky);
        assert!(sky.dhi > 0.0 && sky.dhi < 150.0, "{:?}", sky);
        assert!((sky.ghi - (sky.dni + sky.dhi)).abs() < 1e-9);
    }

    #[test]
    fn test_turbidity_dims_the_beam() {
        let clear = ineichen(30.0, Some(1.15), 2.0, 0.0, 1366.1);
        let hazy = ineichen(30.0, Some(1.15), 6.0, 0.0, 1366.1);
        assert!(hazy.dni < clear.dni);
        assert!(hazy.ghi < clear.ghi);
    }

    #[test]
    fn test_monthly_turbidity_lookup() {
        let mut values = [3.0; 12];
        values[6] = 4.5;
        let tl = LinkeTurbidity::Monthly(values);
        assert_eq!(tl.for_month(7), 4.5);
        assert_eq!(tl.for_month(1), 3.0);
        assert_eq!(LinkeTurbidity::default().for_month(7), 3.0);
    }
}
