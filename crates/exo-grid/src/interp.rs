//! Bilinear interpolation of per-voxel quantities in (ln r, SZA).
//!
//! Quantities live at voxel anchor points. A point inside voxel `(i, j)` is
//! interpolated from the four anchors surrounding it; which neighbors are used
//! depends on which side of the voxel's own anchor the point falls. Radially
//! the weights are clamped at the innermost and outermost anchors. In SZA the
//! anchors already span `[0, π]`, so no clamp is needed.

use crate::coords::AtmoPoint;
use crate::emission::Emission;
use crate::error::GeometryError;
use crate::grid::Grid;

/// Maximum deviation of the weight sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-5;

/// Relative slack allowed when checking that a point lies in its voxel.
const CONTAINMENT_TOLERANCE: f64 = 1e-9;

/// Four (voxel, weight) pairs whose weights sum to 1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InterpWeights {
    /// Voxels whose anchors contribute. May repeat when clamped.
    pub voxels: [usize; 4],
    /// Weight of each voxel.
    pub weights: [f64; 4],
}

impl InterpWeights {
    /// Iterate `(voxel, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.voxels.iter().copied().zip(self.weights.iter().copied())
    }

    /// Total weight assigned to `voxel`.
    pub fn weight_of(&self, voxel: usize) -> f64 {
        self.iter().filter(|&(v, _)| v == voxel).map(|(_, w)| w).sum()
    }
}

/// Weighted sum of `quantity` at the weighted voxels.
///
/// # Panics
///
/// Panics if a weighted voxel is out of bounds for `quantity`.
pub fn interpolate_array(weights: &InterpWeights, quantity: &[f64]) -> f64 {
    weights.iter().map(|(v, w)| w * quantity[v]).sum()
}

/// Interpolate a log-space quantity and return it in linear space.
///
/// # Panics
///
/// Panics if a weighted voxel is out of bounds for `log_quantity`.
pub fn interpolate_log(weights: &InterpWeights, log_quantity: &[f64]) -> f64 {
    interpolate_array(weights, log_quantity).exp()
}

/// Interpolated emission quantities at one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InterpolatedValues {
    /// Scatterer optical depth per unit length.
    pub dtau_species: f64,
    /// Absorber optical depth per unit length.
    pub dtau_absorber: f64,
    /// Ratio of absorber to scatterer optical depth.
    pub abs: f64,
    /// Source function.
    pub sourcefn: f64,
}

impl Grid {
    /// Interpolation weights for `pt`, which must lie inside `voxel`.
    pub fn interp_weights(
        &self,
        voxel: usize,
        pt: &AtmoPoint,
    ) -> Result<InterpWeights, GeometryError> {
        let mut weights = InterpWeights::default();
        self.interp_weights_into(voxel, pt, &mut weights)?;
        Ok(weights)
    }

    /// Interpolation weights for `pt` written into caller-owned storage.
    pub fn interp_weights_into(
        &self,
        voxel: usize,
        pt: &AtmoPoint,
        out: &mut InterpWeights,
    ) -> Result<(), GeometryError> {
        let vox = self.voxel(voxel).ok_or(GeometryError::InvalidVoxel(voxel))?;
        let outside = GeometryError::PointOutsideVoxel {
            voxel,
            r: pt.r,
            sza: pt.t,
        };
        let [r0, r1] = vox.r_bounds;
        if pt.r < r0 * (1.0 - CONTAINMENT_TOLERANCE) || pt.r > r1 * (1.0 + CONTAINMENT_TOLERANCE) {
            return Err(outside);
        }
        let [t0, t1] = vox.sza_bounds;
        if pt.t < t0 - CONTAINMENT_TOLERANCE || pt.t > t1 + CONTAINMENT_TOLERANCE {
            return Err(outside);
        }

        let (r_lo, r_hi, wr_lo) = self.radial_neighbors(vox.indices.r as usize, pt.r);
        let (s_lo, s_hi, ws_lo) = self.sza_neighbors(vox.indices.sza as usize, pt.t)?;
        let n_sza = self.n_sza_cells();
        let (wr_hi, ws_hi) = (1.0 - wr_lo, 1.0 - ws_lo);

        out.voxels = [
            r_lo * n_sza + s_lo,
            r_lo * n_sza + s_hi,
            r_hi * n_sza + s_lo,
            r_hi * n_sza + s_hi,
        ];
        out.weights = [wr_lo * ws_lo, wr_lo * ws_hi, wr_hi * ws_lo, wr_hi * ws_hi];

        let sum: f64 = out.weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(GeometryError::WeightSum(sum));
        }
        Ok(())
    }

    /// Lower anchor, upper anchor, and weight of the lower one, in ln r.
    fn radial_neighbors(&self, i: usize, r: f64) -> (usize, usize, f64) {
        let last = self.n_radial_cells() - 1;
        let (lo, hi) = if r < self.pts_radii()[i] {
            (i.checked_sub(1), i)
        } else {
            (Some(i), i + 1)
        };
        match lo {
            None => (0, 0, 1.0),
            Some(_) if hi > last => (last, last, 1.0),
            Some(lo) => {
                let log_r = self.log_pts_radii();
                let frac = (r.ln() - log_r[lo]) / (log_r[hi] - log_r[lo]);
                (lo, hi, 1.0 - frac.clamp(0.0, 1.0))
            }
        }
    }

    /// Lower anchor, upper anchor, and weight of the lower one, in SZA.
    fn sza_neighbors(&self, j: usize, t: f64) -> Result<(usize, usize, f64), GeometryError> {
        let pts = self.pts_sza();
        let last = pts.len() - 1;
        if t < pts[0] - CONTAINMENT_TOLERANCE || t > pts[last] + CONTAINMENT_TOLERANCE {
            return Err(GeometryError::SzaOutOfRange(t));
        }
        let (lo, hi) = if t < pts[j] && j > 0 {
            (j - 1, j)
        } else if j < last {
            (j, j + 1)
        } else {
            (j - 1, j)
        };
        let frac = (t - pts[lo]) / (pts[hi] - pts[lo]);
        Ok((lo, hi, 1.0 - frac.clamp(0.0, 1.0)))
    }

    /// Interpolate a per-voxel quantity at `pt`, which must lie inside `voxel`.
    pub fn interpolate(
        &self,
        voxel: usize,
        pt: &AtmoPoint,
        quantity: &[f64],
    ) -> Result<f64, GeometryError> {
        self.check_quantity(quantity)?;
        let weights = self.interp_weights(voxel, pt)?;
        Ok(interpolate_array(&weights, quantity))
    }

    /// Interpolate the log-space optical quantities of every emission at `pt`.
    pub fn grid_interp(
        &self,
        voxel: usize,
        pt: &AtmoPoint,
        emissions: &[Emission],
    ) -> Result<Vec<InterpolatedValues>, GeometryError> {
        let weights = self.interp_weights(voxel, pt)?;
        emissions
            .iter()
            .map(|em| {
                for log_values in [
                    &em.log_dtau_species,
                    &em.log_dtau_absorber,
                    &em.log_abs,
                    &em.log_sourcefn,
                ] {
                    self.check_quantity(log_values)?;
                }
                Ok(InterpolatedValues {
                    dtau_species: interpolate_log(&weights, &em.log_dtau_species),
                    dtau_absorber: interpolate_log(&weights, &em.log_dtau_absorber),
                    abs: interpolate_log(&weights, &em.log_abs),
                    sourcefn: interpolate_log(&weights, &em.log_sourcefn),
                })
            })
            .collect()
    }

    fn check_quantity(&self, quantity: &[f64]) -> Result<(), GeometryError> {
        if quantity.len() == self.n_voxels() {
            Ok(())
        } else {
            Err(GeometryError::QuantityLength {
                got: quantity.len(),
                expected: self.n_voxels(),
            })
        }
    }
}
