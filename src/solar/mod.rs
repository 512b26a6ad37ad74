//! Photovoltaic modelling chain: where the sun is, how much light reaches the
//! array, and what the modules and inverter make of it.

pub mod atmosphere;
pub mod clearsky;
pub mod inverter;
pub mod irradiance;
pub mod location;
pub mod modelchain;
pub mod position;
pub mod presets;
pub mod sapm;
pub mod temperature;
pub mod times;

pub use clearsky::{ClearSky, LinkeTurbidity};
pub use inverter::SandiaInverter;
pub use irradiance::{PoaComponents, TranspositionModel};
pub use location::Location;
pub use modelchain::{ModelChain, ModelChainResults, PvSystem, WeatherRecord};
pub use position::SolarPosition;
pub use sapm::{DcOutput, SapmModule};
pub use temperature::SapmTemperature;
