//! Per-voxel optical properties of one emission line.
//!
//! An [`Emission`] holds, for every voxel, the densities and cross sections
//! supplied by an [`EmissionModel`], the differential optical depths derived
//! from them, their logarithms (which is what the interpolator reads), and
//! the single-scattering and source-function results computed later.

use tracing::{debug, warn};

use crate::atmosphere::EmissionModel;
use crate::error::GeometryError;
use crate::grid::{AtmoVoxel, Grid};

/// Stand-in for `ln 0` in the log-space arrays.
pub const LOG_ZERO: f64 = -1e5;

fn log_or_floor(x: f64) -> f64 {
    if x == 0.0 { LOG_ZERO } else { x.ln() }
}

/// Per-voxel arrays that can be extracted as a radial profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    SpeciesDensity,
    SpeciesSigma,
    AbsorberDensity,
    AbsorberSigma,
    SpeciesSingleScatteringTau,
    AbsorberSingleScatteringTau,
    SingleScattering,
    SourceFunction,
}

/// One emission line on a grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emission {
    pub name: String,
    pub branching_ratio: f64,
    /// Set once [`Emission::define`] has filled the optical arrays.
    pub init: bool,
    /// Set once a source function has been stored.
    pub solved: bool,

    pub species_density: Vec<f64>,
    pub species_density_pt: Vec<f64>,
    pub absorber_density: Vec<f64>,
    pub absorber_density_pt: Vec<f64>,
    pub species_sigma: Vec<f64>,
    pub species_sigma_pt: Vec<f64>,
    pub absorber_sigma: Vec<f64>,
    pub absorber_sigma_pt: Vec<f64>,

    pub dtau_species: Vec<f64>,
    pub dtau_species_pt: Vec<f64>,
    pub log_dtau_species: Vec<f64>,
    pub log_dtau_species_pt: Vec<f64>,
    pub dtau_absorber: Vec<f64>,
    pub dtau_absorber_pt: Vec<f64>,
    pub log_dtau_absorber: Vec<f64>,
    pub log_dtau_absorber_pt: Vec<f64>,
    /// Ratio of absorber to scatterer optical depth.
    pub abs: Vec<f64>,
    pub abs_pt: Vec<f64>,
    pub log_abs: Vec<f64>,
    pub log_abs_pt: Vec<f64>,

    /// Scatterer optical depth from each anchor to the Sun.
    pub tau_species_single_scattering: Vec<f64>,
    /// Absorber optical depth from each anchor to the Sun.
    pub tau_absorber_single_scattering: Vec<f64>,
    /// Attenuated solar illumination at each anchor.
    pub singlescat: Vec<f64>,

    pub sourcefn: Vec<f64>,
    pub log_sourcefn: Vec<f64>,
}

impl Emission {
    /// An empty emission; call [`Emission::define`] before use.
    pub fn new(name: impl Into<String>, branching_ratio: f64) -> Self {
        Self {
            name: name.into(),
            branching_ratio,
            ..Self::default()
        }
    }

    /// Number of voxels the arrays are sized for.
    pub fn n_voxels(&self) -> usize {
        self.species_density.len()
    }

    /// Fill the optical arrays by sampling `model` on every voxel.
    ///
    /// Resets any previous single-scattering and source-function results.
    pub fn define(&mut self, model: &dyn EmissionModel, voxels: &[AtmoVoxel]) {
        let n = voxels.len();
        self.species_density = Vec::with_capacity(n);
        self.species_density_pt = Vec::with_capacity(n);
        self.species_sigma = Vec::with_capacity(n);
        self.species_sigma_pt = Vec::with_capacity(n);
        self.absorber_density = Vec::with_capacity(n);
        self.absorber_density_pt = Vec::with_capacity(n);
        self.absorber_sigma = Vec::with_capacity(n);
        self.absorber_sigma_pt = Vec::with_capacity(n);

        for voxel in voxels {
            let nd = model.species_density(voxel);
            let ns = model.species_sigma(voxel);
            let ad = model.absorber_density(voxel);
            let asg = model.absorber_sigma(voxel);
            self.species_density.push(nd.avg);
            self.species_density_pt.push(nd.pt);
            self.species_sigma.push(ns.avg);
            self.species_sigma_pt.push(ns.pt);
            self.absorber_density.push(ad.avg);
            self.absorber_density_pt.push(ad.pt);
            self.absorber_sigma.push(asg.avg);
            self.absorber_sigma_pt.push(asg.pt);
        }

        self.dtau_species = product(&self.species_density, &self.species_sigma);
        self.dtau_species_pt = product(&self.species_density_pt, &self.species_sigma_pt);
        self.dtau_absorber = product(&self.absorber_density, &self.absorber_sigma);
        self.dtau_absorber_pt = product(&self.absorber_density_pt, &self.absorber_sigma_pt);
        self.abs = ratio(&self.dtau_absorber, &self.dtau_species);
        self.abs_pt = ratio(&self.dtau_absorber_pt, &self.dtau_species_pt);

        self.log_dtau_species = self.dtau_species.iter().map(|&x| log_or_floor(x)).collect();
        self.log_dtau_species_pt = self.dtau_species_pt.iter().map(|&x| log_or_floor(x)).collect();
        self.log_dtau_absorber = self.dtau_absorber.iter().map(|&x| log_or_floor(x)).collect();
        self.log_dtau_absorber_pt = self.dtau_absorber_pt.iter().map(|&x| log_or_floor(x)).collect();
        self.log_abs = self.abs.iter().map(|&x| log_or_floor(x)).collect();
        self.log_abs_pt = self.abs_pt.iter().map(|&x| log_or_floor(x)).collect();

        self.tau_species_single_scattering = vec![0.0; n];
        self.tau_absorber_single_scattering = vec![0.0; n];
        self.singlescat = vec![0.0; n];
        self.sourcefn = vec![0.0; n];
        self.log_sourcefn = vec![LOG_ZERO; n];
        self.init = true;
        self.solved = false;

        let floored = self.dtau_species.iter().filter(|&&x| x <= 0.0).count();
        if floored > 0 {
            warn!(
                "Emission {}: {floored} of {n} voxels have no scatterer extinction",
                self.name
            );
        }
        debug!("Defined emission {} on {n} voxels", self.name);
    }

    /// Store single-scattering optical depths toward the Sun.
    ///
    /// Infinite depths (anchors in the planet's shadow) give zero illumination.
    pub fn set_single_scattering(
        &mut self,
        tau_species: Vec<f64>,
        tau_absorber: Vec<f64>,
    ) -> Result<(), GeometryError> {
        self.check_len(&tau_species)?;
        self.check_len(&tau_absorber)?;
        self.singlescat = tau_species
            .iter()
            .zip(&tau_absorber)
            .map(|(ts, ta)| (-(ts + ta)).exp())
            .collect();
        self.tau_species_single_scattering = tau_species;
        self.tau_absorber_single_scattering = tau_absorber;
        Ok(())
    }

    /// Store a solved source function and its logarithm.
    pub fn set_source_function(&mut self, sourcefn: Vec<f64>) -> Result<(), GeometryError> {
        self.check_len(&sourcefn)?;
        self.log_sourcefn = sourcefn.iter().map(|&x| log_or_floor(x)).collect();
        self.sourcefn = sourcefn;
        self.solved = true;
        Ok(())
    }

    /// Borrow one per-voxel array.
    pub fn quantity(&self, quantity: Quantity) -> &[f64] {
        match quantity {
            Quantity::SpeciesDensity => &self.species_density,
            Quantity::SpeciesSigma => &self.species_sigma,
            Quantity::AbsorberDensity => &self.absorber_density,
            Quantity::AbsorberSigma => &self.absorber_sigma,
            Quantity::SpeciesSingleScatteringTau => &self.tau_species_single_scattering,
            Quantity::AbsorberSingleScatteringTau => &self.tau_absorber_single_scattering,
            Quantity::SingleScattering => &self.singlescat,
            Quantity::SourceFunction => &self.sourcefn,
        }
    }

    /// Radial profile of `quantity` at SZA bin `i_sza`.
    pub fn sza_slice(&self, grid: &Grid, quantity: Quantity, i_sza: usize) -> Vec<f64> {
        grid.sza_slice(self.quantity(quantity), i_sza)
    }

    fn check_len(&self, values: &[f64]) -> Result<(), GeometryError> {
        if values.len() == self.n_voxels() {
            Ok(())
        } else {
            Err(GeometryError::QuantityLength {
                got: values.len(),
                expected: self.n_voxels(),
            })
        }
    }
}

fn product(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

fn ratio(num: &[f64], den: &[f64]) -> Vec<f64> {
    num.iter()
        .zip(den)
        .map(|(&n, &d)| if d == 0.0 { 0.0 } else { n / d })
        .collect()
}
