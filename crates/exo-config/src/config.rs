//! Configuration structs with defaults matching the Mars hydrogen corona
//! reference run, plus RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Voxel grid layout.
    pub grid: GridConfig,
    /// Discrete ray set.
    pub rays: RayConfig,
    /// Reference atmosphere.
    pub atmosphere: AtmosphereConfig,
    /// Sample observation geometry.
    pub observation: ObservationConfig,
    /// Worker pool sizing.
    pub parallel: ParallelConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Grid layout. Method ids: radial 0 = altitude, 1 = log density;
/// SZA 0 = uniform, 1 = uniform in cos(SZA).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub radial_method: u32,
    pub sza_method: u32,
    pub n_radial_boundaries: usize,
    pub n_sza_boundaries: usize,
}

/// Ray set dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RayConfig {
    /// Number of Gauss–Legendre polar angles.
    pub n_theta: usize,
    /// Number of azimuths.
    pub n_phi: usize,
}

/// Isothermal two-species atmosphere. Altitudes are above `planet_radius_km`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub planet_radius_km: f64,
    /// Lower boundary of the grid.
    pub rmin_altitude_km: f64,
    /// Exobase altitude.
    pub rexo_altitude_km: f64,
    /// Upper boundary of the grid.
    pub rmax_altitude_km: f64,
    /// Exobase temperature in K.
    pub temperature_k: f64,
    /// Hydrogen density at the exobase, cm⁻³.
    pub h_exobase_density: f64,
    /// CO2 density at the exobase, cm⁻³.
    pub co2_exobase_density: f64,
}

/// Where the sample line of sight starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservationConfig {
    /// Spacecraft distance from the planet center, in planet radii.
    pub distance_planet_radii: f64,
    /// Spacecraft solar zenith angle in degrees.
    pub sza_deg: f64,
    /// Full width of the synthetic image in degrees.
    pub field_of_view_deg: f64,
    /// Synthetic image pixels per side; 0 skips the image.
    pub image_size: usize,
}

/// Worker pool sizing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads; 0 picks one per CPU core.
    pub threads: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write a JSON log file next to the config.
    pub json_log: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            radial_method: 1,
            sza_method: 1,
            n_radial_boundaries: 40,
            n_sza_boundaries: 20,
        }
    }
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            n_theta: 12,
            n_phi: 6,
        }
    }
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            planet_radius_km: 3395.0,
            rmin_altitude_km: 80.0,
            rexo_altitude_km: 200.0,
            rmax_altitude_km: 50_000.0,
            temperature_k: 200.0,
            h_exobase_density: 5e5,
            co2_exobase_density: 2e8,
        }
    }
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            distance_planet_radii: 30.0,
            sza_deg: 60.0,
            field_of_view_deg: 30.0,
            image_size: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_log: cfg!(debug_assertions),
        }
    }
}

/// Platform config directory for this tool, e.g. `~/.config/exo-rt` on Linux.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("exo-rt"))
        .ok_or(ConfigError::NoConfigDir)
}

fn is_positive(x: f64) -> bool {
    x > 0.0
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// --- Validation ---

impl Config {
    /// Reject settings no run could use.
    ///
    /// Method ids are checked where they are interpreted, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.n_radial_boundaries < 2 {
            return Err(invalid("grid.n_radial_boundaries", "must be at least 2"));
        }
        if self.grid.n_sza_boundaries < 3 {
            return Err(invalid("grid.n_sza_boundaries", "must be at least 3"));
        }
        if self.rays.n_theta == 0 || self.rays.n_phi == 0 {
            return Err(invalid("rays", "n_theta and n_phi must be positive"));
        }

        let atm = &self.atmosphere;
        if !is_positive(atm.planet_radius_km) {
            return Err(invalid("atmosphere.planet_radius_km", "must be positive"));
        }
        let ordered = 0.0 <= atm.rmin_altitude_km
            && atm.rmin_altitude_km < atm.rexo_altitude_km
            && atm.rexo_altitude_km < atm.rmax_altitude_km;
        if !ordered {
            return Err(invalid(
                "atmosphere",
                format!(
                    "altitudes must satisfy 0 <= rmin < rexo < rmax, got {} / {} / {}",
                    atm.rmin_altitude_km, atm.rexo_altitude_km, atm.rmax_altitude_km
                ),
            ));
        }
        if !is_positive(atm.temperature_k) {
            return Err(invalid("atmosphere.temperature_k", "must be positive"));
        }
        let densities_ok = is_positive(atm.h_exobase_density) && atm.co2_exobase_density >= 0.0;
        if !densities_ok {
            return Err(invalid(
                "atmosphere",
                "hydrogen density must be positive and CO2 non-negative",
            ));
        }
        if !is_positive(self.observation.distance_planet_radii) {
            return Err(invalid("observation.distance_planet_radii", "must be positive"));
        }
        let fov = self.observation.field_of_view_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(invalid("observation.field_of_view_deg", "must be in (0, 180)"));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Re-read the file: `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}
