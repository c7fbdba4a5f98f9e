//! Radial and SZA boundary placement policies.

use std::cmp::Ordering;
use std::f64::consts::PI;

use crate::atmosphere::Atmosphere;
use crate::error::GridError;

/// Share of radial intervals placed linearly below the exobase by
/// [`RadialMethod::Altitude`].
const LINEAR_ALTITUDE_FRACTION: f64 = 1.0 / 3.0;

/// How radial boundaries are placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RadialMethod {
    /// Linear in altitude up to the exobase, evenly log-spaced in altitude above it.
    #[default]
    Altitude,
    /// Evenly spaced in the log of the scatterer density.
    LogDensity,
}

impl RadialMethod {
    /// Numeric id used in configuration files.
    pub fn id(self) -> u32 {
        match self {
            Self::Altitude => 0,
            Self::LogDensity => 1,
        }
    }
}

impl TryFrom<u32> for RadialMethod {
    type Error = GridError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Altitude),
            1 => Ok(Self::LogDensity),
            other => Err(GridError::UnknownRadialMethod(other)),
        }
    }
}

/// How SZA boundaries are placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SzaMethod {
    /// Uniform in angle, with half-width cells at both poles.
    #[default]
    Uniform,
    /// Uniform in cos(SZA), giving cells of equal solid angle.
    UniformCos,
}

impl SzaMethod {
    /// Numeric id used in configuration files.
    pub fn id(self) -> u32 {
        match self {
            Self::Uniform => 0,
            Self::UniformCos => 1,
        }
    }
}

impl TryFrom<u32> for SzaMethod {
    type Error = GridError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Uniform),
            1 => Ok(Self::UniformCos),
            other => Err(GridError::UnknownSzaMethod(other)),
        }
    }
}

/// Radial boundaries for `n` boundaries over the atmosphere's extent.
pub fn radial_boundaries(
    method: RadialMethod,
    n: usize,
    atm: &dyn Atmosphere,
) -> Result<Vec<f64>, GridError> {
    if n < 2 {
        return Err(GridError::TooFewRadialBoundaries(n));
    }
    let bounds = atm.bounds();
    let finite = bounds.rmin.is_finite() && bounds.rexo.is_finite() && bounds.rmax.is_finite();
    let ordered = match method {
        RadialMethod::Altitude => {
            0.0 < bounds.rmin && bounds.rmin < bounds.rexo && bounds.rexo < bounds.rmax
        }
        RadialMethod::LogDensity => 0.0 < bounds.rmin && bounds.rmin < bounds.rmax,
    };
    if !finite || !ordered {
        return Err(GridError::InvalidBounds {
            rmin: bounds.rmin,
            rexo: bounds.rexo,
            rmax: bounds.rmax,
        });
    }

    let boundaries = match method {
        RadialMethod::Altitude => altitude_boundaries(n, bounds.rmin, bounds.rexo, bounds.rmax),
        RadialMethod::LogDensity => log_density_boundaries(n, atm),
    };
    check_increasing(&boundaries, "radial")?;
    Ok(boundaries)
}

fn altitude_boundaries(n: usize, rmin: f64, rexo: f64, rmax: f64) -> Vec<f64> {
    let intervals = n - 1;
    if intervals == 1 {
        return vec![rmin, rmax];
    }
    let n_linear =
        ((intervals as f64 * LINEAR_ALTITUDE_FRACTION).round() as usize).clamp(1, intervals - 1);
    let n_log = intervals - n_linear;

    let mut boundaries = Vec::with_capacity(n);
    let linear_step = (rexo - rmin) / n_linear as f64;
    for i in 0..n_linear {
        boundaries.push(rmin + i as f64 * linear_step);
    }

    let log_alt_exo = (rexo - rmin).ln();
    let log_alt_max = (rmax - rmin).ln();
    let log_step = (log_alt_max - log_alt_exo) / n_log as f64;
    boundaries.push(rexo);
    for j in 1..n_log {
        boundaries.push(rmin + (log_alt_exo + j as f64 * log_step).exp());
    }
    boundaries.push(rmax);
    boundaries
}

fn log_density_boundaries(n: usize, atm: &dyn Atmosphere) -> Vec<f64> {
    let bounds = atm.bounds();
    let log_n_max = atm.n_species(bounds.rmin).ln();
    let log_n_min = atm.n_species(bounds.rmax).ln();
    let step = (log_n_max - log_n_min) / (n as f64 - 1.0);

    let mut boundaries: Vec<f64> = (0..n)
        .map(|i| atm.r_from_n_species((log_n_max - i as f64 * step).exp()))
        .collect();
    // Pin the ends so the grid spans exactly the requested extent.
    boundaries[0] = bounds.rmin;
    boundaries[n - 1] = bounds.rmax;
    boundaries
}

/// SZA boundaries for `n` boundaries.
///
/// The first boundary is negative and the last exceeds π, so the first and
/// last cells straddle the poles and the point grid covers `[0, π]`.
pub fn sza_boundaries(method: SzaMethod, n: usize) -> Result<Vec<f64>, GridError> {
    if n < 3 {
        return Err(GridError::TooFewSzaBoundaries(n));
    }
    let cells = n as f64 - 2.0;
    let boundaries: Vec<f64> = match method {
        SzaMethod::Uniform => {
            let spacing = PI / cells;
            (0..n).map(|i| (i as f64 - 0.5) * spacing).collect()
        }
        SzaMethod::UniformCos => {
            let cos_spacing = 2.0 / cells;
            let cap = (1.0 - 0.5 * cos_spacing).acos();
            let mut b = Vec::with_capacity(n);
            b.push(-cap);
            for i in 1..n - 1 {
                b.push((1.0 - (i as f64 - 0.5) * cos_spacing).clamp(-1.0, 1.0).acos());
            }
            b.push(PI + cap);
            b
        }
    };
    check_increasing(&boundaries, "SZA")?;
    Ok(boundaries)
}

fn check_increasing(boundaries: &[f64], axis: &'static str) -> Result<(), GridError> {
    for (i, pair) in boundaries.windows(2).enumerate() {
        if pair[0].partial_cmp(&pair[1]) != Some(Ordering::Less) || !pair[1].is_finite() {
            return Err(GridError::NonMonotonicBoundaries { axis, index: i + 1 });
        }
    }
    Ok(())
}
