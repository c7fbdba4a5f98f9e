//! Atmosphere interfaces consumed by the grid and the emission container,
//! plus a reference barometric model.
//!
//! The grid only needs the radial extent of the atmosphere and, for the
//! log-density radial discretization, the species density profile and its
//! inverse. Emissions need per-voxel samples of densities and cross
//! sections; any model implementing [`EmissionModel`] can supply them.

use crate::grid::AtmoVoxel;

/// Gravitational constant (cgs).
pub const G_CGS: f64 = 6.674_30e-8;
/// Mass of Mars in grams.
pub const M_MARS_G: f64 = 6.4171e26;
/// Mean radius of Mars in cm.
pub const R_MARS_CM: f64 = 3395e5;
/// Boltzmann constant (cgs).
pub const K_B_CGS: f64 = 1.380_649e-16;
/// Atomic mass unit in grams.
pub const AMU_G: f64 = 1.660_539e-24;
/// Line-center Lyman-alpha cross section coefficient; divide by `sqrt(T)`.
pub const LYMAN_ALPHA_SIGMA_COEF: f64 = 5.96e-12;
/// Line-center Lyman-beta cross section coefficient; divide by `sqrt(T)`.
pub const LYMAN_BETA_SIGMA_COEF: f64 = 8.33e-13;
/// CO2 absorption cross section at Lyman alpha (cm²).
pub const CO2_LYMAN_ALPHA_SIGMA: f64 = 6.3e-20;
/// CO2 absorption cross section at Lyman beta (cm²).
pub const CO2_LYMAN_BETA_SIGMA: f64 = 3.53e-17;
/// Fraction of Lyman-beta excitations that re-emit Lyman beta.
pub const LYMAN_BETA_BRANCHING_RATIO: f64 = 0.8819;

/// Number of Simpson intervals used for voxel averages.
const AVERAGE_INTERVALS: usize = 16;

/// Radial extent of the atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphereBounds {
    /// Lower boundary radius.
    pub rmin: f64,
    /// Exobase radius.
    pub rexo: f64,
    /// Upper boundary radius.
    pub rmax: f64,
}

/// An atmosphere profile the grid builder can discretize against.
pub trait Atmosphere {
    /// Radial extent.
    fn bounds(&self) -> AtmosphereBounds;

    /// Scattering species density at radius `r`.
    fn n_species(&self, r: f64) -> f64;

    /// Inverse of [`Atmosphere::n_species`]: the radius where the density is `n`.
    ///
    /// The profile must be strictly decreasing with radius.
    fn r_from_n_species(&self, n: f64) -> f64;
}

/// Voxel-averaged and anchor-point values of a quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoxelSample {
    /// Volume average over the voxel.
    pub avg: f64,
    /// Value at the voxel's anchor point.
    pub pt: f64,
}

/// Per-voxel densities and cross sections for one emission.
pub trait EmissionModel {
    /// Scatterer density.
    fn species_density(&self, voxel: &AtmoVoxel) -> VoxelSample;
    /// Scatterer cross section.
    fn species_sigma(&self, voxel: &AtmoVoxel) -> VoxelSample;
    /// Absorber density.
    fn absorber_density(&self, voxel: &AtmoVoxel) -> VoxelSample;
    /// Absorber cross section.
    fn absorber_sigma(&self, voxel: &AtmoVoxel) -> VoxelSample;
}

/// Two-species isothermal atmosphere in hydrostatic equilibrium.
///
/// Each species follows the barometric law with `1/r` gravity,
/// `n(r) = n_exo exp(λ(r) - λ(r_exo))` where `λ(r) = G M m / (k T r)`.
#[derive(Clone, Debug, PartialEq)]
pub struct BarometricAtmosphere {
    bounds: AtmosphereBounds,
    temperature: f64,
    species_exobase_density: f64,
    species_mass: f64,
    absorber_exobase_density: f64,
    absorber_mass: f64,
}

impl BarometricAtmosphere {
    /// Hydrogen scattering against a CO2 absorber at temperature `temperature` (K).
    pub fn hydrogen_co2(
        bounds: AtmosphereBounds,
        temperature: f64,
        h_exobase_density: f64,
        co2_exobase_density: f64,
    ) -> Self {
        Self {
            bounds,
            temperature,
            species_exobase_density: h_exobase_density,
            species_mass: 1.007_94 * AMU_G,
            absorber_exobase_density: co2_exobase_density,
            absorber_mass: 44.0095 * AMU_G,
        }
    }

    /// Isothermal temperature (K).
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    fn jeans_coefficient(&self, mass: f64) -> f64 {
        G_CGS * M_MARS_G * mass / (K_B_CGS * self.temperature)
    }

    fn density(&self, n_exo: f64, mass: f64, r: f64) -> f64 {
        let lambda = self.jeans_coefficient(mass);
        n_exo * (lambda * (1.0 / r - 1.0 / self.bounds.rexo)).exp()
    }

    /// Absorber density at radius `r`.
    pub fn n_absorber(&self, r: f64) -> f64 {
        self.density(self.absorber_exobase_density, self.absorber_mass, r)
    }

    /// Line-center Lyman-alpha cross section of the scatterer.
    pub fn lyman_alpha_sigma(&self) -> f64 {
        LYMAN_ALPHA_SIGMA_COEF / self.temperature.sqrt()
    }

    /// Line-center Lyman-beta cross section of the scatterer.
    pub fn lyman_beta_sigma(&self) -> f64 {
        LYMAN_BETA_SIGMA_COEF / self.temperature.sqrt()
    }

    /// View of this atmosphere with the cross sections of one emission line.
    pub fn line(&self, species_sigma: f64, absorber_sigma: f64) -> LineModel<'_> {
        LineModel {
            atmosphere: self,
            species_sigma,
            absorber_sigma,
        }
    }

    /// Volume-weighted radial average of `f` over `[r0, r1]`.
    ///
    /// Density depends on radius only, so the angular part of the voxel volume
    /// cancels and the weight is `r²`.
    fn shell_average(&self, r0: f64, r1: f64, f: impl Fn(f64) -> f64) -> f64 {
        let n = AVERAGE_INTERVALS;
        let h = (r1 - r0) / n as f64;
        let (mut num, mut den) = (0.0, 0.0);
        for i in 0..=n {
            let r = r0 + h * i as f64;
            let coef = if i == 0 || i == n {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            num += coef * f(r) * r * r;
            den += coef * r * r;
        }
        num / den
    }
}

impl Atmosphere for BarometricAtmosphere {
    fn bounds(&self) -> AtmosphereBounds {
        self.bounds
    }

    fn n_species(&self, r: f64) -> f64 {
        self.density(self.species_exobase_density, self.species_mass, r)
    }

    fn r_from_n_species(&self, n: f64) -> f64 {
        let lambda = self.jeans_coefficient(self.species_mass);
        let inv_r = 1.0 / self.bounds.rexo + (n / self.species_exobase_density).ln() / lambda;
        1.0 / inv_r
    }
}

/// A [`BarometricAtmosphere`] paired with constant line cross sections.
#[derive(Clone, Copy, Debug)]
pub struct LineModel<'a> {
    atmosphere: &'a BarometricAtmosphere,
    species_sigma: f64,
    absorber_sigma: f64,
}

impl EmissionModel for LineModel<'_> {
    fn species_density(&self, voxel: &AtmoVoxel) -> VoxelSample {
        let atm = self.atmosphere;
        VoxelSample {
            avg: atm.shell_average(voxel.r_bounds[0], voxel.r_bounds[1], |r| atm.n_species(r)),
            pt: atm.n_species(voxel.pt.r),
        }
    }

    fn species_sigma(&self, _voxel: &AtmoVoxel) -> VoxelSample {
        VoxelSample {
            avg: self.species_sigma,
            pt: self.species_sigma,
        }
    }

    fn absorber_density(&self, voxel: &AtmoVoxel) -> VoxelSample {
        let atm = self.atmosphere;
        VoxelSample {
            avg: atm.shell_average(voxel.r_bounds[0], voxel.r_bounds[1], |r| atm.n_absorber(r)),
            pt: atm.n_absorber(voxel.pt.r),
        }
    }

    fn absorber_sigma(&self, _voxel: &AtmoVoxel) -> VoxelSample {
        VoxelSample {
            avg: self.absorber_sigma,
            pt: self.absorber_sigma,
        }
    }
}
