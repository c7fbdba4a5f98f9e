//! The radius × SZA voxel grid.
//!
//! A grid owns its boundary coordinates, the anchor points between them, the
//! analytic boundary surfaces, and the voxel table. All of it is built once
//! by [`Grid::build`] and is read-only afterwards, so a grid can be shared
//! across threads behind an `Arc`.

use tracing::{debug, info};

use crate::atmosphere::Atmosphere;
use crate::coords::AtmoPoint;
use crate::discretization::{RadialMethod, SzaMethod, radial_boundaries, sza_boundaries};
use crate::error::GridError;
use crate::surfaces::{Cone, Sphere};

/// Distances shorter than this fraction of the outer radius are treated as
/// coincident by the stepper.
pub const CROSSING_EPSILON: f64 = 1e-10;

/// Parameters that fully determine a grid (together with an atmosphere).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSpec {
    /// Radial boundary placement.
    pub radial_method: RadialMethod,
    /// SZA boundary placement.
    pub sza_method: SzaMethod,
    /// Number of radial boundaries (at least 2).
    pub n_radial_boundaries: usize,
    /// Number of SZA boundaries (at least 3).
    pub n_sza_boundaries: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            radial_method: RadialMethod::Altitude,
            sza_method: SzaMethod::Uniform,
            n_radial_boundaries: 40,
            n_sza_boundaries: 20,
        }
    }
}

/// Radial and SZA bin of a location. Either may be out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelIndices {
    /// Radial bin; `-1` below the grid, `n_radial_cells` above it.
    pub r: isize,
    /// SZA bin.
    pub sza: isize,
}

impl VoxelIndices {
    /// Create a pair of bin indices.
    pub const fn new(r: isize, sza: isize) -> Self {
        Self { r, sza }
    }
}

/// One grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmoVoxel {
    /// Linear voxel index.
    pub index: usize,
    /// Radial and SZA bin.
    pub indices: VoxelIndices,
    /// Inner and outer radius.
    pub r_bounds: [f64; 2],
    /// Lower and upper SZA.
    pub sza_bounds: [f64; 2],
    /// Anchor point where tabulated quantities live.
    pub pt: AtmoPoint,
}

/// Spherical grid with symmetry about the Sun–planet line.
#[derive(Clone, Debug)]
pub struct Grid {
    spec: GridSpec,
    rmin: f64,
    rmax: f64,

    radial_boundaries: Vec<f64>,
    pts_radii: Vec<f64>,
    log_pts_radii: Vec<f64>,
    radial_boundary_spheres: Vec<Sphere>,

    sza_boundaries: Vec<f64>,
    pts_sza: Vec<f64>,
    sza_boundary_cones: Vec<Cone>,

    voxels: Vec<AtmoVoxel>,
    tolerance: f64,
}

impl Grid {
    /// Build the grid for `spec` over the extent of `atm`.
    ///
    /// Fails without producing a grid if the spec or the atmosphere bounds
    /// are inconsistent.
    pub fn build(spec: &GridSpec, atm: &dyn Atmosphere) -> Result<Self, GridError> {
        let radial_boundaries =
            radial_boundaries(spec.radial_method, spec.n_radial_boundaries, atm)?;
        let sza_boundaries = sza_boundaries(spec.sza_method, spec.n_sza_boundaries)?;

        let pts_radii: Vec<f64> = radial_boundaries
            .windows(2)
            .map(|w| (w[0] * w[1]).sqrt())
            .collect();
        let log_pts_radii = pts_radii.iter().map(|r| r.ln()).collect();
        let radial_boundary_spheres = radial_boundaries.iter().map(|&r| Sphere::new(r)).collect();

        let pts_sza: Vec<f64> = sza_boundaries
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect();
        // The outermost SZA boundaries lie beyond the poles and have no surface.
        let sza_boundary_cones = sza_boundaries[1..sza_boundaries.len() - 1]
            .iter()
            .map(|&t| Cone::new(t))
            .collect();

        let n_sza_cells = pts_sza.len();
        let mut voxels = Vec::with_capacity(pts_radii.len() * n_sza_cells);
        for (i, &r) in pts_radii.iter().enumerate() {
            for (j, &t) in pts_sza.iter().enumerate() {
                let index = i * n_sza_cells + j;
                voxels.push(AtmoVoxel {
                    index,
                    indices: VoxelIndices::new(i as isize, j as isize),
                    r_bounds: [radial_boundaries[i], radial_boundaries[i + 1]],
                    sza_bounds: [sza_boundaries[j], sza_boundaries[j + 1]],
                    pt: AtmoPoint::from_rtp(r, t, 0.0).with_voxel(index),
                });
            }
        }

        let rmin = radial_boundaries[0];
        let rmax = radial_boundaries[radial_boundaries.len() - 1];
        let grid = Self {
            spec: *spec,
            rmin,
            rmax,
            radial_boundaries,
            pts_radii,
            log_pts_radii,
            radial_boundary_spheres,
            sza_boundaries,
            pts_sza,
            sza_boundary_cones,
            voxels,
            tolerance: CROSSING_EPSILON * rmax,
        };

        debug!(
            "radial boundaries {:?}, SZA boundaries {:?}",
            grid.radial_boundaries, grid.sza_boundaries
        );
        info!(
            "Built {:?}/{:?} grid: {} radial x {} SZA cells ({} voxels), r in [{:.4e}, {:.4e}]",
            spec.radial_method,
            spec.sza_method,
            grid.n_radial_cells(),
            grid.n_sza_cells(),
            grid.n_voxels(),
            rmin,
            rmax,
        );
        Ok(grid)
    }

    /// The parameters this grid was built from.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Inner radius.
    pub fn rmin(&self) -> f64 {
        self.rmin
    }

    /// Outer radius.
    pub fn rmax(&self) -> f64 {
        self.rmax
    }

    /// Distance below which two crossings are considered coincident.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Radial boundaries, strictly increasing.
    pub fn radial_boundaries(&self) -> &[f64] {
        &self.radial_boundaries
    }

    /// Geometric midpoints of consecutive radial boundaries.
    pub fn pts_radii(&self) -> &[f64] {
        &self.pts_radii
    }

    /// Natural log of [`Grid::pts_radii`].
    pub fn log_pts_radii(&self) -> &[f64] {
        &self.log_pts_radii
    }

    /// SZA boundaries, from below 0 to above π.
    pub fn sza_boundaries(&self) -> &[f64] {
        &self.sza_boundaries
    }

    /// Midpoints of consecutive SZA boundaries.
    pub fn pts_sza(&self) -> &[f64] {
        &self.pts_sza
    }

    /// One sphere per radial boundary.
    pub fn radial_boundary_spheres(&self) -> &[Sphere] {
        &self.radial_boundary_spheres
    }

    /// One cone per interior SZA boundary.
    pub fn sza_boundary_cones(&self) -> &[Cone] {
        &self.sza_boundary_cones
    }

    /// All voxels, in linear index order.
    pub fn voxels(&self) -> &[AtmoVoxel] {
        &self.voxels
    }

    /// The voxel with linear index `index`, if it exists.
    pub fn voxel(&self, index: usize) -> Option<&AtmoVoxel> {
        self.voxels.get(index)
    }

    /// Number of radial cells.
    pub fn n_radial_cells(&self) -> usize {
        self.pts_radii.len()
    }

    /// Number of SZA cells.
    pub fn n_sza_cells(&self) -> usize {
        self.pts_sza.len()
    }

    /// Total number of voxels.
    pub fn n_voxels(&self) -> usize {
        self.voxels.len()
    }

    /// Linear voxel index for a pair of bins, or `None` if either is out of range.
    pub fn indices_to_voxel(&self, indices: VoxelIndices) -> Option<usize> {
        let in_r = (0..self.n_radial_cells() as isize).contains(&indices.r);
        let in_sza = (0..self.n_sza_cells() as isize).contains(&indices.sza);
        if in_r && in_sza {
            Some(indices.r as usize * self.n_sza_cells() + indices.sza as usize)
        } else {
            None
        }
    }

    /// Bins of a linear voxel index, or `None` if it is out of range.
    pub fn voxel_to_indices(&self, voxel: usize) -> Option<VoxelIndices> {
        if voxel < self.n_voxels() {
            let n_sza = self.n_sza_cells();
            Some(VoxelIndices::new(
                (voxel / n_sza) as isize,
                (voxel % n_sza) as isize,
            ))
        } else {
            None
        }
    }

    /// Bins of a point, clamped to the grid.
    pub fn point_to_indices(&self, pt: &AtmoPoint) -> VoxelIndices {
        VoxelIndices::new(
            find_coordinate_index(pt.r, &self.radial_boundaries) as isize,
            find_coordinate_index(pt.t, &self.sza_boundaries) as isize,
        )
    }

    /// Bins of a point without radial clamping.
    ///
    /// A point below `rmin` gets radial bin `-1` and a point at or above
    /// `rmax` gets radial bin `n_radial_cells`, so a ray that starts outside
    /// the grid enters it at the right shell.
    pub fn point_to_raw_indices(&self, pt: &AtmoPoint) -> VoxelIndices {
        let r = if pt.r < self.rmin {
            -1
        } else if pt.r >= self.rmax {
            self.n_radial_cells() as isize
        } else {
            find_coordinate_index(pt.r, &self.radial_boundaries) as isize
        };
        VoxelIndices::new(r, find_coordinate_index(pt.t, &self.sza_boundaries) as isize)
    }

    /// Voxel containing `pt`, clamped to the nearest valid voxel.
    pub fn locate_voxel(&self, pt: &AtmoPoint) -> usize {
        let indices = self.point_to_indices(pt);
        indices.r as usize * self.n_sza_cells() + indices.sza as usize
    }

    /// Values of a per-voxel quantity along the radial column at SZA bin `i_sza`.
    pub fn sza_slice(&self, quantity: &[f64], i_sza: usize) -> Vec<f64> {
        (0..self.n_radial_cells())
            .filter_map(|i| self.indices_to_voxel(VoxelIndices::new(i as isize, i_sza as isize)))
            .filter_map(|v| quantity.get(v).copied())
            .collect()
    }
}

/// Bin of `coord` in the half-open intervals `[b[i], b[i+1])`.
///
/// Coordinates below the first boundary resolve to bin 0; coordinates at or
/// above the last boundary resolve to the last bin.
pub fn find_coordinate_index(coord: f64, boundaries: &[f64]) -> usize {
    let n_bins = boundaries.len().saturating_sub(1);
    if n_bins == 0 {
        return 0;
    }
    // Number of boundaries <= coord; the bin is one less.
    let above = boundaries.partition_point(|&b| b <= coord);
    above.saturating_sub(1).min(n_bins - 1)
}
