#[cfg(feature = "cli")]
mod args;
pub mod cli;
pub mod scenario;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command, LoadArgs, PlotArgs, SimulateArgs, WeatherArgs};
