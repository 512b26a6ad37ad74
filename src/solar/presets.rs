//! Module and inverter parameters shipped with the tool, taken from the
//! Sandia module and CEC inverter databases.

use crate::solar::inverter::SandiaInverter;
use crate::solar::sapm::SapmModule;
use crate::utils::error::{PvError, Result};

pub const CANADIAN_SOLAR_CS5P_220M: &str = "Canadian_Solar_CS5P_220M___2009_";
pub const ABB_MICRO_0_25: &str = "ABB__MICRO_0_25_I_OUTD_US_208__208V_";

pub fn module_names() -> Vec<&'static str> {
    vec![CANADIAN_SOLAR_CS5P_220M]
}

pub fn inverter_names() -> Vec<&'static str> {
    vec![ABB_MICRO_0_25]
}

pub fn module(name: &str) -> Result<SapmModule> {
    match name {
        CANADIAN_SOLAR_CS5P_220M => Ok(SapmModule {
            area: 1.701,
            cells_in_series: 96,
            parallel_strings: 1,
            isco: 5.09115,
            voco: 59.2608,
            impo: 4.54629,
            vmpo: 48.3156,
            aisc: 0.000397,
            aimp: 0.000181,
            c0: 1.01284,
            c1: -0.0128398,
            bvoco: -0.21696,
            mbvoc: 0.0,
            bvmpo: -0.235488,
            mbvmp: 0.0,
            n: 1.4032,
            c2: 0.279317,
            c3: -7.24463,
            a0: 0.928385,
            a1: 0.068093,
            a2: -0.0157738,
            a3: 0.0016606,
            a4: -6.93e-05,
            b0: 1.0,
            b1: -0.002438,
            b2: 0.0003103,
            b3: -1.246e-05,
            b4: 2.11e-07,
            b5: -1.36e-09,
            dtc: 3.0,
            fd: 1.0,
            a: -3.40641,
            b: -0.0842075,
            c4: 0.996446,
            c5: 0.003554,
            ixo: 4.97599,
            ixxo: 3.18803,
            c6: 1.15535,
            c7: -0.155353,
        }),
        other => Err(unknown("module", other, &module_names())),
    }
}

pub fn inverter(name: &str) -> Result<SandiaInverter> {
    match name {
        ABB_MICRO_0_25 => Ok(SandiaInverter {
            paco: 250.0,
            pdco: 259.588593,
            vdco: 40.0,
            pso: 2.089607,
            c0: -4.1e-05,
            c1: -9.1e-05,
            c2: 0.000494,
            c3: -0.013171,
            pnt: 0.075,
            vdcmax: 50.0,
            idcmax: 6.489715,
            mppt_low: 30.0,
            mppt_high: 50.0,
        }),
        other => Err(unknown("inverter", other, &inverter_names())),
    }
}

fn unknown(field: &str, value: &str, known: &[&str]) -> PvError {
    PvError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("Not in the built-in library ({})", known.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(module(CANADIAN_SOLAR_CS5P_220M).unwrap().cells_in_series, 96);
        let abb = inverter(ABB_MICRO_0_25).unwrap();
        assert_eq!(abb.paco, 250.0);
        assert_eq!(abb.pso, 2.089607);
        assert_eq!(abb.pnt, 0.075);
        assert!(module("Unknown_Module").is_err());
    }
}
