//! Error types for grid construction and ray traversal.

use thiserror::Error;

/// Errors raised while building a grid or a ray set.
///
/// These are configuration errors: construction is aborted and no partial
/// grid is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    /// The radial discretization id does not name a known method.
    #[error("unknown radial discretization method id {0}")]
    UnknownRadialMethod(u32),

    /// The SZA discretization id does not name a known method.
    #[error("unknown SZA discretization method id {0}")]
    UnknownSzaMethod(u32),

    /// Fewer radial boundaries than the minimum of 2.
    #[error("at least 2 radial boundaries are required, got {0}")]
    TooFewRadialBoundaries(usize),

    /// Fewer SZA boundaries than the minimum of 3.
    #[error("at least 3 SZA boundaries are required, got {0}")]
    TooFewSzaBoundaries(usize),

    /// The atmosphere bounds are not finite or not ordered.
    #[error("invalid atmosphere bounds: rmin={rmin}, rexo={rexo}, rmax={rmax}")]
    InvalidBounds { rmin: f64, rexo: f64, rmax: f64 },

    /// A generated boundary sequence is not strictly increasing.
    #[error("{axis} boundaries are not strictly increasing at index {index}")]
    NonMonotonicBoundaries { axis: &'static str, index: usize },

    /// A ray set was requested with zero polar or azimuthal angles.
    #[error("ray counts must be positive, got n_theta={n_theta}, n_phi={n_phi}")]
    EmptyRaySet { n_theta: usize, n_phi: usize },
}

/// Invariant violations detected while tracing or interpolating.
///
/// These indicate a logic defect (bad grid construction or a caller handing
/// in inconsistent data), never a transient condition. Callers should treat
/// them as fatal for the current run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// A voxel index outside `[0, n_voxels)` was supplied.
    #[error("voxel index {0} is outside the grid")]
    InvalidVoxel(usize),

    /// The crossing list is longer than the number of surfaces allows.
    #[error("{count} crossings exceed the maximum of {max}")]
    TooManyCrossings { count: usize, max: usize },

    /// The first crossing is not the ray origin.
    #[error("first crossing is at distance {0}, expected 0")]
    OriginNotFirst(f64),

    /// Crossing distances are not strictly increasing.
    #[error("crossing {index} at distance {distance} does not follow {previous}")]
    UnorderedCrossings {
        index: usize,
        distance: f64,
        previous: f64,
    },

    /// A crossing between the origin and the exit lies outside the grid.
    #[error("crossing {0} enters an invalid voxel before the ray exits")]
    InvalidInteriorVoxel(usize),

    /// The traversal entered the grid but never left it.
    #[error("traversal has no exit crossing")]
    MissingExit,

    /// Two consecutive crossings are not neighboring voxels.
    #[error("crossing {index} jumps from {from:?} to {to:?}")]
    NonAdjacentStep {
        index: usize,
        from: (isize, isize),
        to: (isize, isize),
    },

    /// The point handed to the interpolator is not inside the given voxel.
    #[error("point (r={r}, sza={sza}) is not inside voxel {voxel}")]
    PointOutsideVoxel { voxel: usize, r: f64, sza: f64 },

    /// The point's SZA lies outside the tabulated SZA point range.
    #[error("SZA {0} lies outside the interpolation grid")]
    SzaOutOfRange(f64),

    /// Interpolation weights failed to sum to one.
    #[error("interpolation weights sum to {0}")]
    WeightSum(f64),

    /// A quantity array does not have one entry per voxel.
    #[error("quantity has {got} entries, grid has {expected} voxels")]
    QuantityLength { got: usize, expected: usize },
}
