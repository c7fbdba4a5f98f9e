//! Demo binary that builds a Mars hydrogen corona grid, traces the sunward
//! single-scattering columns in parallel, and integrates a line of sight and a
//! synthetic image.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p exo-demo -- --n-radial 60 --threads 4`.

mod observation;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use exo_config::{CliArgs, Config, ConfigError, default_config_dir};
use exo_grid::{
    AtmosphereBounds, BarometricAtmosphere, CO2_LYMAN_ALPHA_SIGMA, CO2_LYMAN_BETA_SIGMA,
    ColumnWorkers, Emission, GeometryError, Grid, GridError, GridSpec, LYMAN_BETA_BRANCHING_RATIO,
    Quantity, RadialMethod, RaySet, SzaMethod, single_scattering,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::observation::{FakeObservation, Sampling};

const KM_TO_CM: f64 = 1e5;

#[derive(Debug, Error)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("grid: {0}")]
    Grid(#[from] GridError),
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("failed to start column workers: {0}")]
    Workers(#[source] std::io::Error),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone() {
        Some(dir) => dir,
        None => default_config_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    exo_log::init_logging(
        Some(&config_dir.join("logs")),
        config.debug.json_log,
        Some(&config),
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn atmosphere_from_config(config: &Config) -> BarometricAtmosphere {
    let atm = &config.atmosphere;
    let r_planet = atm.planet_radius_km * KM_TO_CM;
    BarometricAtmosphere::hydrogen_co2(
        AtmosphereBounds {
            rmin: r_planet + atm.rmin_altitude_km * KM_TO_CM,
            rexo: r_planet + atm.rexo_altitude_km * KM_TO_CM,
            rmax: r_planet + atm.rmax_altitude_km * KM_TO_CM,
        },
        atm.temperature_k,
        atm.h_exobase_density,
        atm.co2_exobase_density,
    )
}

fn grid_spec_from_config(config: &Config) -> Result<GridSpec, GridError> {
    Ok(GridSpec {
        radial_method: RadialMethod::try_from(config.grid.radial_method)?,
        sza_method: SzaMethod::try_from(config.grid.sza_method)?,
        n_radial_boundaries: config.grid.n_radial_boundaries,
        n_sza_boundaries: config.grid.n_sza_boundaries,
    })
}

/// Lyman alpha and Lyman beta for the given atmosphere.
fn hydrogen_emissions(atmosphere: &BarometricAtmosphere, grid: &Grid) -> Vec<Emission> {
    let lines = [
        ("lyman alpha", 1.0, atmosphere.lyman_alpha_sigma(), CO2_LYMAN_ALPHA_SIGMA),
        (
            "lyman beta",
            LYMAN_BETA_BRANCHING_RATIO,
            atmosphere.lyman_beta_sigma(),
            CO2_LYMAN_BETA_SIGMA,
        ),
    ];
    lines
        .into_iter()
        .map(|(name, branching_ratio, species_sigma, absorber_sigma)| {
            let mut emission = Emission::new(name, branching_ratio);
            emission.define(&atmosphere.line(species_sigma, absorber_sigma), grid.voxels());
            emission
        })
        .collect()
}

fn run(config: &Config) -> Result<(), DemoError> {
    config.validate()?;

    let atmosphere = atmosphere_from_config(config);
    let spec = grid_spec_from_config(config)?;
    let grid = Arc::new(Grid::build(&spec, &atmosphere)?);
    let rays = RaySet::build(config.rays.n_theta, config.rays.n_phi)?;
    let total_omega: f64 = rays.iter().map(|ray| ray.omega()).sum();
    info!(
        "Ray set: {} rays ({} x {}), solid angle sum {:.6}",
        rays.len(),
        rays.n_theta(),
        rays.n_phi(),
        total_omega
    );

    let mut emissions = hydrogen_emissions(&atmosphere, &grid);

    let workers = if config.parallel.threads == 0 {
        ColumnWorkers::with_defaults(Arc::clone(&grid))
    } else {
        let threads = config.parallel.threads;
        ColumnWorkers::new(Arc::clone(&grid), threads, threads * 16)
    }
    .map_err(DemoError::Workers)?;
    let paths = workers.run(0..grid.n_voxels())?;
    drop(workers);

    for emission in &mut emissions {
        single_scattering(&paths, emission)?;
        // Optically thin source function: scattered sunlight only.
        let sourcefn = emission
            .singlescat
            .iter()
            .map(|s| emission.branching_ratio * s)
            .collect();
        emission.set_source_function(sourcefn)?;
    }
    let shadowed = paths.iter().filter(|p| p.shadowed).count();
    info!("{shadowed} of {} voxel anchors are in the planet's shadow", paths.len());

    log_profiles(&grid, &emissions);

    let max_crossings = observation::trace_ray_set(&grid, &rays)?;
    info!("Longest traversal from the sample voxel: {max_crossings} crossings");

    let sightline = observation::Sightline::from_config(config);
    let brightness =
        observation::integrate(&grid, &emissions, &sightline, Sampling::Interpolated)?;
    for (emission, b) in emissions.iter().zip(&brightness) {
        info!(
            "{}: line-of-sight optical depth {:.4e} (absorber {:.4e}), brightness {:.4e}",
            emission.name, b.tau_species, b.tau_absorber, b.brightness
        );
    }
    if brightness.iter().all(|b| b.tau_species == 0.0) {
        warn!("Sample line of sight does not cross the grid");
    }

    if config.observation.image_size > 0 {
        let image = FakeObservation::from_config(config);
        let interpolated = image.brightness(&grid, &emissions, Sampling::Interpolated)?;
        let voxel_average = image.brightness(&grid, &emissions, Sampling::VoxelAverage)?;
        for (i, emission) in emissions.iter().enumerate() {
            let mut sum = [0.0; 2];
            let mut max_rel_diff = 0.0_f64;
            for (a, b) in interpolated.iter().zip(&voxel_average) {
                let (a, b) = (a[i].brightness, b[i].brightness);
                sum[0] += a;
                sum[1] += b;
                if a > 0.0 {
                    max_rel_diff = max_rel_diff.max((a - b).abs() / a);
                }
            }
            let n = interpolated.len() as f64;
            info!(
                "{}: {}x{} image mean brightness {:.4e} interpolated, {:.4e} voxel averages (max relative difference {:.3})",
                emission.name,
                image.size(),
                image.size(),
                sum[0] / n,
                sum[1] / n,
                max_rel_diff
            );
        }
    }

    Ok(())
}

fn log_profiles(grid: &Grid, emissions: &[Emission]) {
    let n_sza = grid.n_sza_cells();
    let samples = [0, n_sza / 2, n_sza - 1];
    for emission in emissions {
        for &i_sza in &samples {
            let density = emission.sza_slice(grid, Quantity::SpeciesDensity, i_sza);
            let singlescat = emission.sza_slice(grid, Quantity::SingleScattering, i_sza);
            let (Some(bottom), Some(top)) = (density.first(), density.last()) else {
                continue;
            };
            info!(
                "{} at SZA {:.1} deg: density {:.3e} .. {:.3e}, bottom illumination {:.3e}",
                emission.name,
                grid.pts_sza()[i_sza].to_degrees(),
                bottom,
                top,
                singlescat.first().copied().unwrap_or(0.0)
            );
        }
    }
}
