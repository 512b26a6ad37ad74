//! Sandia Array Performance Model for a single module.

use crate::solar::temperature::SapmTemperature;
use serde::{Deserialize, Serialize};

const BOLTZMANN: f64 = 1.380_66e-23;
const ELEMENTARY_CHARGE: f64 = 1.602_18e-19;
const T_REF: f64 = 25.0;
const IRRAD_REF: f64 = 1_000.0;

/// Module coefficients, named as in the Sandia module database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SapmModule {
    #[serde(rename = "Area")]
    pub area: f64,
    #[serde(rename = "Cells_in_Series")]
    pub cells_in_series: u32,
    #[serde(rename = "Parallel_Strings")]
    pub parallel_strings: u32,
    #[serde(rename = "Isco")]
    pub isco: f64,
    #[serde(rename = "Voco")]
    pub voco: f64,
    #[serde(rename = "Impo")]
    pub impo: f64,
    #[serde(rename = "Vmpo")]
    pub vmpo: f64,
    #[serde(rename = "Aisc")]
    pub aisc: f64,
    #[serde(rename = "Aimp")]
    pub aimp: f64,
    #[serde(rename = "C0")]
    pub c0: f64,
    #[serde(rename = "C1")]
    pub c1: f64,
    #[serde(rename = "Bvoco")]
    pub bvoco: f64,
    #[serde(rename = "Mbvoc")]
    pub mbvoc: f64,
    #[serde(rename = "Bvmpo")]
    pub bvmpo: f64,
    #[serde(rename = "Mbvmp")]
    pub mbvmp: f64,
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "C2")]
    pub c2: f64,
    #[serde(rename = "C3")]
    pub c3: f64,
    #[serde(rename = "A0")]
    pub a0: f64,
    #[serde(rename = "A1")]
    pub a1: f64,
    #[serde(rename = "A2")]
    pub a2: f64,
    #[serde(rename = "A3")]
    pub a3: f64,
    #[serde(rename = "A4")]
    pub a4: f64,
    #[serde(rename = "B0")]
    pub b0: f64,
    #[serde(rename = "B1")]
    pub b1: f64,
    #[serde(rename = "B2")]
    pub b2: f64,
    #[serde(rename = "B3")]
    pub b3: f64,
    #[serde(rename = "B4")]
    pub b4: f64,
    #[serde(rename = "B5")]
    pub b5: f64,
    #[serde(rename = "DTC")]
    pub dtc: f64,
    #[serde(rename = "FD")]
    pub fd: f64,
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C4")]
    pub c4: f64,
    #[serde(rename = "C5")]
    pub c5: f64,
    #[serde(rename = "IXO")]
    pub ixo: f64,
    #[serde(rename = "IXXO")]
    pub ixxo: f64,
    #[serde(rename = "C6")]
    pub c6: f64,
    #[serde(rename = "C7")]
    pub c7: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DcOutput {
    pub i_sc: f64,
    pub i_mp: f64,
    pub v_oc: f64,
    pub v_mp: f64,
    pub p_mp: f64,
    pub i_x: f64,
    pub i_xx: f64,
}

impl DcOutput {
    /// Scale one module's output to a string/array layout.
    pub fn scaled(self, modules_per_string: u32, strings: u32) -> Self {
        let v = modules_per_string as f64;
        let i = strings as f64;
        Self {
            i_sc: self.i_sc * i,
            i_mp: self.i_mp * i,
            v_oc: self.v_oc * v,
            v_mp: self.v_mp * v,
            p_mp: self.p_mp * v * i,
            i_x: self.i_x * i,
            i_xx: self.i_xx * i,
        }
    }
}

impl SapmModule {
    /// The temperature coefficients measured with this module.
    pub fn temperature_params(&self) -> SapmTemperature {
        SapmTemperature {
            a: self.a,
            b: self.b,
            delta_t: self.dtc,
        }
    }

    /// Spectral mismatch factor f1 for an absolute airmass; zero when the sun
    /// is down.
    pub fn spectral_factor(&self, airmass_absolute: Option<f64>) -> f64 {
        let Some(am) = airmass_absolute.filter(|am| am.is_finite()) else {
            return 0.0;
        };
        let f1 = self.a0 + am * (self.a1 + am * (self.a2 + am * (self.a3 + am * self.a4)));
        f1.max(0.0)
    }

    /// Incidence-angle modifier f2 for `aoi` in degrees.
    pub fn aoi_factor(&self, aoi: f64) -> f64 {
        if !(0.0..=90.0).contains(&aoi) {
            return 0.0;
        }
        let f2 = self.b0
            + aoi * (self.b1 + aoi * (self.b2 + aoi * (self.b3 + aoi * (self.b4 + aoi * self.b5))));
        f2.max(0.0)
    }

    /// Irradiance in W/m² that the cells convert.
    pub fn effective_irradiance(
        &self,
        poa_direct: f64,
        poa_diffuse: f64,
        airmass_absolute: Option<f64>,
        aoi: f64,
    ) -> f64 {
        self.spectral_factor(airmass_absolute)
            * (poa_direct * self.aoi_factor(aoi) + self.fd * poa_diffuse)
    }

    /// DC output of one module.
    pub fn dc_output(&self, effective_irradiance: f64, temp_cell: f64) -> DcOutput {
        let ee = effective_irradiance / IRRAD_REF;
        let dt = temp_cell - T_REF;
        let ns = self.cells_in_series as f64;

        let bvmpo = self.bvmpo + self.mbvmp * (1.0 - ee);
        let bvoco = self.bvoco + self.mbvoc * (1.0 - ee);
        let delta = self.n * BOLTZMANN * (temp_cell + 273.15) / ELEMENTARY_CHARGE;
        let log_ee = if ee > 0.0 { ee.ln() } else { 0.0 };
        let ee = ee.max(0.0);

        let i_sc = self.isco * ee * (1.0 + self.aisc * dt);
        let i_mp = self.impo * (self.c0 * ee + self.c1 * ee * ee) * (1.0 + self.aimp * dt);
        let v_oc = (self.voco + ns * delta * log_ee + bvoco * dt).max(0.0);
        let v_mp = (self.vmpo
            + self.c2 * ns * delta * log_ee
            + self.c3 * ns * (delta * log_ee).powi(2)
            + bvmpo * dt)
            .max(0.0);
        let i_x = self.ixo * (self.c4 * ee + self.c5 * ee * ee) * (1.0 + self.aisc * dt);
        let i_xx = self.ixxo * (self.c6 * ee + self.c7 * ee * ee) * (1.0 + self.aimp * dt);

        DcOutput {
            i_sc,
            i_mp,
            v_oc,
            v_mp,
            p_mp: i_mp * v_mp,
            i_x,
            i_xx,
        }
    }
}
