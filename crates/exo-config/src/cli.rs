//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments. Values given here override `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "exo-rt",
    about = "Build a spherical exosphere grid and trace single-scattering columns"
)]
pub struct CliArgs {
    /// Radial boundary method id (0 = altitude, 1 = log density).
    #[arg(long)]
    pub radial_method: Option<u32>,

    /// SZA boundary method id (0 = uniform, 1 = uniform in cos).
    #[arg(long)]
    pub sza_method: Option<u32>,

    /// Number of radial boundaries.
    #[arg(long)]
    pub n_radial: Option<usize>,

    /// Number of SZA boundaries.
    #[arg(long)]
    pub n_sza: Option<usize>,

    /// Number of polar ray angles.
    #[arg(long)]
    pub n_theta: Option<usize>,

    /// Number of azimuthal ray angles.
    #[arg(long)]
    pub n_phi: Option<usize>,

    /// Exobase temperature in K.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(m) = args.radial_method {
            self.grid.radial_method = m;
        }
        if let Some(m) = args.sza_method {
            self.grid.sza_method = m;
        }
        if let Some(n) = args.n_radial {
            self.grid.n_radial_boundaries = n;
        }
        if let Some(n) = args.n_sza {
            self.grid.n_sza_boundaries = n;
        }
        if let Some(n) = args.n_theta {
            self.rays.n_theta = n;
        }
        if let Some(n) = args.n_phi {
            self.rays.n_phi = n;
        }
        if let Some(t) = args.temperature {
            self.atmosphere.temperature_k = t;
        }
        if let Some(threads) = args.threads {
            self.parallel.threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
