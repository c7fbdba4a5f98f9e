//! Discrete ray directions used to sample the sky from each voxel.
//!
//! Polar angles are Gauss–Legendre nodes over `[0, π]` and azimuths are
//! evenly spaced cell centers over `[0, 2π)`. Angles are relative to the
//! local frame of whatever point the ray is launched from (see
//! [`AtmoVector::from_ray`](crate::coords::AtmoVector::from_ray)).

use std::f64::consts::{PI, TAU};

use glam::DVec3;
use tracing::debug;

use crate::error::GridError;
use crate::quadrature::gauss_legendre;

/// One discrete direction with its quadrature weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Linear index `theta_idx * n_phi + phi_idx`.
    pub index: usize,
    /// Polar angle from the local vertical.
    pub theta: f64,
    /// Azimuth from the local direction of increasing SZA.
    pub phi: f64,
    /// Gauss–Legendre weight of `theta`.
    pub theta_weight: f64,
    /// Azimuthal spacing.
    pub phi_weight: f64,
}

impl Ray {
    /// Create a ray from its angles and weights.
    pub fn new(index: usize, theta: f64, phi: f64, theta_weight: f64, phi_weight: f64) -> Self {
        Self {
            index,
            theta,
            phi,
            theta_weight,
            phi_weight,
        }
    }

    /// Fraction of the full sphere this ray represents.
    pub fn omega(&self) -> f64 {
        self.theta.sin() * self.theta_weight * self.phi_weight / (4.0 * PI)
    }

    /// Unit direction in the local (SZA, azimuth, vertical) basis.
    pub fn local_direction(&self) -> DVec3 {
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        DVec3::new(st * cp, st * sp, ct)
    }
}

/// The full set of `n_theta × n_phi` rays.
#[derive(Clone, Debug)]
pub struct RaySet {
    rays: Vec<Ray>,
    theta: Vec<f64>,
    theta_weights: Vec<f64>,
    phi: Vec<f64>,
}

impl RaySet {
    /// Build the ray set. Both counts must be at least 1.
    pub fn build(n_theta: usize, n_phi: usize) -> Result<Self, GridError> {
        if n_theta == 0 || n_phi == 0 {
            return Err(GridError::EmptyRaySet { n_theta, n_phi });
        }

        let (theta, theta_weights) = gauss_legendre(0.0, PI, n_theta);
        let phi_weight = TAU / n_phi as f64;
        let phi: Vec<f64> = (0..n_phi).map(|i| (i as f64 + 0.5) * phi_weight).collect();

        let mut rays = Vec::with_capacity(n_theta * n_phi);
        for (i, (&t, &wt)) in theta.iter().zip(&theta_weights).enumerate() {
            for (j, &p) in phi.iter().enumerate() {
                rays.push(Ray::new(i * n_phi + j, t, p, wt, phi_weight));
            }
        }

        debug!("Built {} rays ({n_theta} theta x {n_phi} phi)", rays.len());
        Ok(Self {
            rays,
            theta,
            theta_weights,
            phi,
        })
    }

    /// All rays, in linear index order.
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// Number of rays.
    pub fn len(&self) -> usize {
        self.rays.len()
    }

    /// Always false for a successfully built set.
    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    /// Number of polar angles.
    pub fn n_theta(&self) -> usize {
        self.theta.len()
    }

    /// Number of azimuths.
    pub fn n_phi(&self) -> usize {
        self.phi.len()
    }

    /// Polar angles, ascending.
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// Gauss–Legendre weights matching [`RaySet::theta`].
    pub fn theta_weights(&self) -> &[f64] {
        &self.theta_weights
    }

    /// Azimuths, ascending.
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Iterate the rays.
    pub fn iter(&self) -> std::slice::Iter<'_, Ray> {
        self.rays.iter()
    }
}

impl<'a> IntoIterator for &'a RaySet {
    type Item = &'a Ray;
    type IntoIter = std::slice::Iter<'a, Ray>;

    fn into_iter(self) -> Self::IntoIter {
        self.rays.iter()
    }
}
