use serde::{Deserialize, Serialize};

/// Sandia grid-connected inverter model coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandiaInverter {
    /// Rated AC output in W.
    #[serde(rename = "Paco")]
    pub paco: f64,
    /// DC input at which `paco` is reached, in W.
    #[serde(rename = "Pdco")]
    pub pdco: f64,
    /// DC voltage at which the other coefficients were fitted, in V.
    #[serde(rename = "Vdco")]
    pub vdco: f64,
    /// Self-consumption: DC power needed to start the inversion process.
    #[serde(rename = "Pso")]
    pub pso: f64,
    #[serde(rename = "C0")]
    pub c0: f64,
    #[serde(rename = "C1")]
    pub c1: f64,
    #[serde(rename = "C2")]
    pub c2: f64,
    #[serde(rename = "C3")]
    pub c3: f64,
    /// AC power drawn at night.
    #[serde(rename = "Pnt")]
    pub pnt: f64,
    #[serde(rename = "Vdcmax")]
    pub vdcmax: f64,
    #[serde(rename = "Idcmax")]
    pub idcmax: f64,
    #[serde(rename = "Mppt_low")]
    pub mppt_low: f64,
    #[serde(rename = "Mppt_high")]
    pub mppt_high: f64,
}

impl SandiaInverter {
    /// AC output in W for a DC operating point. Output is clipped at `paco`;
    /// below the start-up threshold the inverter draws its night tare.
    pub fn ac_power(&self, v_dc: f64, p_dc: f64) -> f64 {
        if p_dc < self.pso {
            return -self.pnt.abs();
        }
        let dv = v_dc - self.vdco;
        let a = self.pdco * (1.0 + self.c1 * dv);
        let b = self.pso * (1.0 + self.c2 * dv);
        let c = self.c0 * (1.0 + self.c3 * dv);

        let ac = (self.paco / (a - b) - c * (a - b)) * (p_dc - b) + c * (p_dc - b).powi(2);
        ac.min(self.paco)
    }

    pub fn in_mppt_window(&self, v_dc: f64) -> bool {
        v_dc >= self.mppt_low && v_dc <= self.mppt_high
    }
}

pub fn sandia(v_dc: f64, p_dc: f64, params: &SandiaInverter) -> f64 {
    params.ac_power(v_dc, p_dc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solar::presets;

    fn inverter() -> SandiaInverter {
        presets::inverter(presets::ABB_MICRO_0_25).unwrap()
    }

    #[test]
    fn test_rated_point_gives_rated_output() {
        let inv = inverter();
        let ac = inv.ac_power(inv.vdco, inv.pdco);
        assert!((ac - inv.paco).abs() < 1e-9, "{}", ac);
    }

    #[test]
    fn test_clipping() {
        let inv = inverter();
        assert_eq!(inv.ac_power(inv.vdco, 400.0), inv.paco);
    }

    #[test]
    fn test_night_tare() {
        let inv = inverter();
        assert_eq!(inv.ac_power(40.0, 0.0), -0.075);
        assert_eq!(inv.ac_power(40.0, 2.0), -0.075);
    }

    #[test]
    fn test_part_load_efficiency() {
        let inv = inverter();
        let ac = inv.ac_power(40.0, 100.0);
        assert!(ac > 90.0 && ac < 100.0, "{}", ac);
        assert!(inv.in_mppt_window(40.0));
        assert!(!inv.in_mppt_window(25.0));
        assert!(!inv.in_mppt_window(55.0));
    }
}
