//! Run configuration for the exosphere radiative-transfer driver.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Missing sections and fields fall back to defaults, so old
//! files keep loading as new settings are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AtmosphereConfig, Config, DebugConfig, GridConfig, ObservationConfig, ParallelConfig,
    RayConfig, default_config_dir,
};
pub use error::ConfigError;
