//! Radius × solar-zenith-angle voxel grid for azimuthally symmetric
//! radiative transfer: grid construction, discrete ray sets, exact
//! ray/boundary traversal, and log-space interpolation of voxel quantities.

mod atmosphere;
mod columns;
mod coords;
mod discretization;
mod emission;
mod error;
mod grid;
mod interp;
mod quadrature;
mod rays;
mod surfaces;
mod traversal;

pub use atmosphere::{
    AMU_G, Atmosphere, AtmosphereBounds, BarometricAtmosphere, CO2_LYMAN_ALPHA_SIGMA,
    CO2_LYMAN_BETA_SIGMA, EmissionModel, G_CGS, K_B_CGS, LYMAN_ALPHA_SIGMA_COEF,
    LYMAN_BETA_BRANCHING_RATIO, LYMAN_BETA_SIGMA_COEF, LineModel, M_MARS_G, R_MARS_CM,
    VoxelSample,
};
pub use columns::{ColumnPath, ColumnTask, ColumnWorkers, column_path, single_scattering};
pub use coords::{AtmoPoint, AtmoVector};
pub use discretization::{RadialMethod, SzaMethod, radial_boundaries, sza_boundaries};
pub use emission::{Emission, LOG_ZERO, Quantity};
pub use error::{GeometryError, GridError};
pub use grid::{AtmoVoxel, CROSSING_EPSILON, Grid, GridSpec, VoxelIndices, find_coordinate_index};
pub use interp::{
    InterpWeights, InterpolatedValues, WEIGHT_SUM_TOLERANCE, interpolate_array, interpolate_log,
};
pub use quadrature::gauss_legendre;
pub use rays::{Ray, RaySet};
pub use surfaces::{Cone, Hits, Sphere, SurfaceHit};
pub use traversal::{Axis, Crossing, Segment, TraceScratch, Traversal};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::atmosphere::{AtmosphereBounds, BarometricAtmosphere};
    use crate::discretization::{RadialMethod, SzaMethod};
    use crate::grid::{Grid, GridSpec};

    /// Mars hydrogen corona from 3390 km to 50000 km.
    pub fn mars() -> BarometricAtmosphere {
        BarometricAtmosphere::hydrogen_co2(
            AtmosphereBounds {
                rmin: 3390e5,
                rexo: 3590e5,
                rmax: 50_000e5,
            },
            200.0,
            5e5,
            2e8,
        )
    }

    /// 40 radial × 20 SZA boundaries, altitude and uniform-cos spacing.
    pub fn reference_grid() -> Grid {
        let spec = GridSpec {
            radial_method: RadialMethod::Altitude,
            sza_method: SzaMethod::UniformCos,
            n_radial_boundaries: 40,
            n_sza_boundaries: 20,
        };
        Grid::build(&spec, &mars()).expect("reference grid")
    }
}
