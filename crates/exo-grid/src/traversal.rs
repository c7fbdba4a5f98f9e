//! Boundary-intersection stepping along a ray.
//!
//! Rather than marching through voxels, the stepper intersects the ray with
//! every boundary surface at once, sorts the crossings, and assigns each one
//! the bin it enters. The result is a list of [`Crossing`]s: the first is the
//! ray origin at distance 0, the last is the exit from the grid (either
//! through the top or into the planet).
//!
//! Bin assignment is absolute: crossing radial boundary `k` outward enters
//! radial bin `k`, inward enters `k - 1`, and likewise for SZA boundaries.
//! Indices therefore cannot drift even if a tangent contact is missed.

use std::cmp::Ordering;

use crate::coords::AtmoVector;
use crate::error::GeometryError;
use crate::grid::{Grid, VoxelIndices};

/// Which boundary family a crossing passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Not a crossing: the ray origin.
    Origin,
    /// A radial boundary (sphere).
    Radial,
    /// An SZA boundary (cone).
    Sza,
    /// A radial and an SZA boundary at the same distance.
    Corner,
}

impl Axis {
    fn merge(self, other: Axis) -> Axis {
        if self == other { self } else { Axis::Corner }
    }
}

/// One entry in a traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crossing {
    /// Distance from the ray origin.
    pub distance: f64,
    /// Voxel entered, or `None` if this crossing leaves the grid.
    pub voxel: Option<usize>,
    /// Radial and SZA bin entered. Out-of-range bins are kept for diagnostics.
    pub indices: VoxelIndices,
    /// Boundary family crossed.
    pub axis: Axis,
}

/// A straight piece of a ray inside a single voxel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Voxel the segment lies in.
    pub voxel: usize,
    /// Distance along the ray where the segment starts.
    pub start: f64,
    /// Distance along the ray where the segment ends.
    pub end: f64,
}

impl Segment {
    /// Path length inside the voxel.
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered crossings of one ray through the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Traversal {
    crossings: Vec<Crossing>,
}

impl Traversal {
    /// All crossings, origin first.
    pub fn crossings(&self) -> &[Crossing] {
        &self.crossings
    }

    /// Number of crossings including the origin.
    pub fn len(&self) -> usize {
        self.crossings.len()
    }

    /// True only for a traversal that has not been filled yet.
    pub fn is_empty(&self) -> bool {
        self.crossings.is_empty()
    }

    /// The exit crossing, if the ray was ever inside the grid.
    pub fn exit(&self) -> Option<&Crossing> {
        match self.crossings.as_slice() {
            [_, .., last] => Some(last),
            _ => None,
        }
    }

    /// True if the ray leaves the grid through the inner boundary, or
    /// starts inside the planet.
    pub fn exits_bottom(&self) -> bool {
        match self.crossings.as_slice() {
            [origin] => origin.voxel.is_none() && origin.indices.r < 0,
            _ => self.exit().is_some_and(|c| c.indices.r < 0),
        }
    }

    /// Per-voxel pieces of the ray, in order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.crossings.windows(2).filter_map(|w| {
            w[0].voxel.map(|voxel| Segment {
                voxel,
                start: w[0].distance,
                end: w[1].distance,
            })
        })
    }

    /// Total path length inside the grid.
    pub fn length_inside(&self) -> f64 {
        self.segments().map(|s| s.length()).sum()
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    distance: f64,
    axis: Axis,
    boundary: usize,
    increasing: bool,
}

impl Candidate {
    /// Bin on the far side of the boundary.
    fn bin_after(&self) -> isize {
        if self.increasing {
            self.boundary as isize
        } else {
            self.boundary as isize - 1
        }
    }

    /// Bin the ray occupies just before reaching the boundary.
    fn bin_before(&self) -> isize {
        if self.increasing {
            self.boundary as isize - 1
        } else {
            self.boundary as isize
        }
    }

    fn enter(&self, from: VoxelIndices) -> VoxelIndices {
        let bin = self.bin_after();
        match self.axis {
            Axis::Radial => VoxelIndices::new(bin, from.sza),
            _ => VoxelIndices::new(from.r, bin),
        }
    }
}

/// Reusable buffers for [`Grid::trace_into`].
///
/// Each worker owns one; nothing is shared between threads.
#[derive(Debug, Default)]
pub struct TraceScratch {
    candidates: Vec<Candidate>,
    traversal: Traversal,
}

impl TraceScratch {
    /// Empty scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch sized for `grid`, so tracing never reallocates.
    pub fn for_grid(grid: &Grid) -> Self {
        let max = grid.max_crossings();
        Self {
            candidates: Vec::with_capacity(max),
            traversal: Traversal {
                crossings: Vec::with_capacity(max),
            },
        }
    }

    /// The traversal produced by the last successful trace.
    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }
}

impl Grid {
    /// Upper bound on the length of any valid crossing list.
    pub fn max_crossings(&self) -> usize {
        1 + 2 * (self.radial_boundary_spheres().len() + self.sza_boundary_cones().len())
    }

    /// Trace `vec` through the grid.
    ///
    /// Allocates fresh buffers; use [`Grid::trace_into`] in hot loops.
    pub fn trace(&self, vec: &AtmoVector) -> Result<Traversal, GeometryError> {
        let mut scratch = TraceScratch::for_grid(self);
        self.trace_into(vec, &mut scratch)?;
        Ok(std::mem::take(&mut scratch.traversal))
    }

    /// Trace `vec` through the grid into caller-owned buffers.
    ///
    /// If the origin carries a voxel tag it is trusted; otherwise the origin
    /// is located without radial clamping, so rays starting below or above
    /// the grid enter it at the right shell. An untagged origin lying on a
    /// boundary takes the bin the ray moves into.
    pub fn trace_into<'s>(
        &self,
        vec: &AtmoVector,
        scratch: &'s mut TraceScratch,
    ) -> Result<&'s Traversal, GeometryError> {
        self.collect_candidates(vec, &mut scratch.candidates);
        let origin = match vec.pt.voxel {
            Some(v) => self
                .voxel_to_indices(v)
                .ok_or(GeometryError::InvalidVoxel(v))?,
            None => self.untagged_origin(vec, &scratch.candidates),
        };

        let crossings = &mut scratch.traversal.crossings;
        self.walk(origin, &scratch.candidates, crossings);
        trim(crossings);
        self.check_crossings(crossings)?;
        Ok(&scratch.traversal)
    }

    fn collect_candidates(&self, vec: &AtmoVector, out: &mut Vec<Candidate>) {
        out.clear();
        let tol = self.tolerance();
        for (k, sphere) in self.radial_boundary_spheres().iter().enumerate() {
            out.extend(sphere.intersections(vec, tol).iter().map(|h| Candidate {
                distance: h.distance,
                axis: Axis::Radial,
                boundary: k,
                increasing: h.increasing,
            }));
        }
        // Cone c sits on SZA boundary c + 1.
        for (c, cone) in self.sza_boundary_cones().iter().enumerate() {
            out.extend(cone.intersections(vec, tol).iter().map(|h| Candidate {
                distance: h.distance,
                axis: Axis::Sza,
                boundary: c + 1,
                increasing: h.increasing,
            }));
        }
        out.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    }

    /// Bins of an untagged origin.
    ///
    /// Off the boundaries this is the half-open lookup. On a boundary (within
    /// the crossing tolerance) the lookup can name the wrong side, and a
    /// tangent start yields no crossing to correct it, so the bin is taken
    /// from the next crossing of that family: the bin the ray occupies just
    /// before it. With no crossing ahead, the bin of a far point on the ray
    /// is used.
    fn untagged_origin(&self, vec: &AtmoVector, candidates: &[Candidate]) -> VoxelIndices {
        let raw = self.point_to_raw_indices(&vec.pt);
        let tol = self.tolerance();
        let (r, t) = (vec.pt.r, vec.pt.t);

        let on_sphere = self
            .radial_boundaries()
            .iter()
            .any(|&b| (r - b).abs() <= tol);
        let szas = self.sza_boundaries();
        let on_cone = szas[1..szas.len() - 1]
            .iter()
            .any(|&b| (t - b).abs() * r <= tol);
        if !on_sphere && !on_cone {
            return raw;
        }

        let ahead = self.point_to_raw_indices(&vec.point_at(self.rmax()));
        let bin_before = |axis: Axis, fallback: isize| {
            candidates
                .iter()
                .find(|c| c.axis == axis && c.distance >= -tol)
                .map_or(fallback, Candidate::bin_before)
        };
        VoxelIndices::new(
            if on_sphere {
                bin_before(Axis::Radial, ahead.r)
            } else {
                raw.r
            },
            if on_cone {
                bin_before(Axis::Sza, ahead.sza)
            } else {
                raw.sza
            },
        )
    }

    fn walk(&self, origin: VoxelIndices, candidates: &[Candidate], out: &mut Vec<Crossing>) {
        let tol = self.tolerance();
        out.clear();
        out.push(Crossing {
            distance: 0.0,
            voxel: self.indices_to_voxel(origin),
            indices: origin,
            axis: Axis::Origin,
        });

        let mut current = origin;
        for cand in candidates.iter().filter(|c| c.distance >= -tol) {
            current = cand.enter(current);
            let voxel = self.indices_to_voxel(current);
            let distance = cand.distance.max(0.0);
            let Some(last) = out.last_mut() else {
                continue;
            };
            if distance - last.distance <= tol {
                // Coincident with the previous record: fold into it.
                last.indices = current;
                last.voxel = voxel;
                if last.axis != Axis::Origin {
                    last.axis = last.axis.merge(cand.axis);
                    last.distance = distance;
                }
            } else {
                out.push(Crossing {
                    distance,
                    voxel,
                    indices: current,
                    axis: cand.axis,
                });
            }
            if cand.axis == Axis::Radial && cand.boundary == 0 && !cand.increasing {
                // Into the planet.
                break;
            }
        }
        // A record that lands where the previous one already was is no crossing.
        out.dedup_by(|next, prev| next.indices == prev.indices);
    }

    /// Check the invariants of a crossing list.
    ///
    /// The list must start with the origin at distance 0, have strictly
    /// increasing distances, stay inside the grid between its first and last
    /// entries, end outside the grid, and move by at most one bin per
    /// coordinate at each step. The step from an out-of-grid origin to the
    /// entry point is exempt from the adjacency rule.
    pub fn check_crossings(&self, crossings: &[Crossing]) -> Result<(), GeometryError> {
        let max = self.max_crossings();
        if crossings.len() > max {
            return Err(GeometryError::TooManyCrossings {
                count: crossings.len(),
                max,
            });
        }
        let Some(first) = crossings.first() else {
            return Ok(());
        };
        if first.distance != 0.0 {
            return Err(GeometryError::OriginNotFirst(first.distance));
        }

        let last = crossings.len() - 1;
        for (i, pair) in crossings.windows(2).enumerate() {
            let (prev, cur) = (&pair[0], &pair[1]);
            let index = i + 1;
            if cur.distance.partial_cmp(&prev.distance) != Some(Ordering::Greater) {
                return Err(GeometryError::UnorderedCrossings {
                    index,
                    distance: cur.distance,
                    previous: prev.distance,
                });
            }
            if index < last && cur.voxel.is_none() {
                return Err(GeometryError::InvalidInteriorVoxel(index));
            }
            if index == 1 && prev.voxel.is_none() {
                continue;
            }
            let dr = (cur.indices.r - prev.indices.r).abs();
            let ds = (cur.indices.sza - prev.indices.sza).abs();
            if dr > 1 || ds > 1 || (dr == 0 && ds == 0) {
                return Err(GeometryError::NonAdjacentStep {
                    index,
                    from: (prev.indices.r, prev.indices.sza),
                    to: (cur.indices.r, cur.indices.sza),
                });
            }
        }
        if last > 0 && crossings[last].voxel.is_some() {
            return Err(GeometryError::MissingExit);
        }
        Ok(())
    }
}

/// Drop records before the ray first enters the grid (keeping the origin)
/// and everything after it first leaves.
fn trim(crossings: &mut Vec<Crossing>) {
    let Some(entry) = crossings.iter().position(|c| c.voxel.is_some()) else {
        crossings.truncate(1);
        return;
    };
    if entry > 1 {
        crossings.drain(1..entry);
    }
    if let Some(exit) = crossings.iter().skip(1).position(|c| c.voxel.is_none()) {
        crossings.truncate(exit + 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::AtmoPoint;
    use crate::test_support::reference_grid;
    use glam::DVec3;
    use std::f64::consts::FRAC_PI_2;

    fn ray(origin: DVec3, dir: DVec3) -> AtmoVector {
        AtmoVector::from_direction(AtmoPoint::from_xyz(origin), dir)
    }

    #[test]
    fn test_radial_ray_from_innermost_point() {
        let g = reference_grid();
        let pt = AtmoPoint::from_rtp(g.pts_radii()[0], FRAC_PI_2, 0.0);
        let vec = AtmoVector::from_direction(pt, pt.radial_unit());
        let t = g.trace(&vec).unwrap();

        let c = t.crossings();
        let n = g.radial_boundaries().len();
        assert_eq!(c.len(), n);
        for (i, crossing) in c[..n - 1].iter().enumerate() {
            assert_eq!(crossing.indices.r, i as isize);
            assert!(crossing.voxel.is_some());
        }
        assert_eq!(c[n - 2].indices.r, n as isize - 2);
        assert!(c[1..].iter().all(|x| x.axis == Axis::Radial));
        assert!(c.iter().all(|x| x.indices.sza == c[0].indices.sza));

        let exit = t.exit().unwrap();
        assert!(exit.voxel.is_none());
        assert!(!t.exits_bottom());
        assert!((exit.distance - (g.rmax() - g.pts_radii()[0])).abs() < 1e-6 * g.rmax());
    }

    #[test]
    fn test_crossing_distances_increase() {
        let g = reference_grid();
        let pt = AtmoPoint::from_rtp(g.pts_radii()[5], 1.0, 0.3);
        let vec = AtmoVector::from_direction(pt, DVec3::new(0.2, -0.7, 0.4));
        let t = g.trace(&vec).unwrap();
        for pair in t.crossings().windows(2) {
            assert!(pair[1].distance > pair[0].distance);
        }
    }

    #[test]
    fn test_ray_from_outside_enters_and_exits() {
        let g = reference_grid();
        let h = 0.3 * g.rmax();
        let t = g
            .trace(&ray(DVec3::new(-2.0 * g.rmax(), 0.0, h), DVec3::X))
            .unwrap();
        let c = t.crossings();
        assert!(c[0].voxel.is_none());
        assert_eq!(c[0].indices.r, g.n_radial_cells() as isize);
        assert_eq!(c[1].indices.r, g.n_radial_cells() as isize - 1);
        assert!(c[1].voxel.is_some());
        assert!(!t.exits_bottom());

        let chord = 2.0 * (g.rmax() * g.rmax() - h * h).sqrt();
        assert!((t.length_inside() - chord).abs() < 1e-6 * chord);
    }

    #[test]
    fn test_ray_that_misses_grid() {
        let g = reference_grid();
        let t = g
            .trace(&ray(DVec3::new(-2.0 * g.rmax(), 0.0, 1.5 * g.rmax()), DVec3::X))
            .unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.exit().is_none());
        assert_eq!(t.segments().count(), 0);
    }

    #[test]
    fn test_ray_into_planet_exits_bottom() {
        let g = reference_grid();
        let start = 2.0 * g.rmin();
        let t = g
            .trace(&ray(DVec3::new(0.0, 0.0, start), DVec3::NEG_Z))
            .unwrap();
        assert!(t.exits_bottom());
        let exit = t.exit().unwrap();
        assert_eq!(exit.indices.r, -1);
        assert!((exit.distance - (start - g.rmin())).abs() < 1e-6 * g.rmin());
    }

    #[test]
    fn test_ray_across_polar_axis() {
        let g = reference_grid();
        let h = 2.0 * g.rmin();
        let t = g
            .trace(&ray(DVec3::new(-3.0 * g.rmin(), 0.0, h), DVec3::X))
            .unwrap();
        let sza: Vec<isize> = t
            .crossings()
            .iter()
            .filter(|c| c.voxel.is_some())
            .map(|c| c.indices.sza)
            .collect();
        let min = *sza.iter().min().unwrap();
        assert_eq!(min, 0);
        // SZA falls to the polar cap and rises again.
        let turn = sza.iter().position(|&s| s == 0).unwrap();
        assert!(sza[..=turn].windows(2).all(|w| w[1] <= w[0]));
        assert!(sza[turn..].windows(2).all(|w| w[1] >= w[0]));
        assert!(t.crossings().iter().any(|c| c.axis == Axis::Sza));
    }

    #[test]
    fn test_segments_sum_to_chord() {
        let g = reference_grid();
        let pt = AtmoPoint::from_rtp(g.pts_radii()[10], 2.0, 1.0);
        let dir = DVec3::new(0.3, 0.5, 0.8).normalize();
        let t = g.trace(&AtmoVector::from_direction(pt, dir)).unwrap();
        let exit = t.exit().unwrap();
        assert!(!t.exits_bottom());
        assert!((t.length_inside() - exit.distance).abs() < 1e-6 * exit.distance);
        for seg in t.segments() {
            assert!(seg.length() > 0.0);
            let mid = AtmoVector::from_direction(pt, dir).point_at(0.5 * (seg.start + seg.end));
            assert_eq!(g.locate_voxel(&mid), seg.voxel);
        }
    }

    #[test]
    fn test_tagged_origin_is_trusted() {
        let g = reference_grid();
        let v = g.voxels()[g.n_sza_cells() * 3 + 4];
        let t = g.trace(&AtmoVector::toward_sun(v.pt)).unwrap();
        assert_eq!(t.crossings()[0].voxel, Some(v.index));
    }

    #[test]
    fn test_invalid_tag_is_rejected() {
        let g = reference_grid();
        let pt = AtmoPoint::from_rtp(g.pts_radii()[0], 1.0, 0.0).with_voxel(g.n_voxels());
        assert_eq!(
            g.trace(&AtmoVector::toward_sun(pt)).unwrap_err(),
            GeometryError::InvalidVoxel(g.n_voxels())
        );
    }

    #[test]
    fn test_scratch_reuse_matches_fresh_trace() {
        let g = reference_grid();
        let mut scratch = TraceScratch::for_grid(&g);
        for v in g.voxels().iter().step_by(37) {
            let vec = AtmoVector::toward_sun(v.pt);
            let reused = g.trace_into(&vec, &mut scratch).unwrap().clone();
            assert_eq!(reused, g.trace(&vec).unwrap());
        }
    }

    /// Trace `vec` and check every segment's midpoint lies in the voxel it names.
    fn assert_segments_located(g: &Grid, vec: &AtmoVector) -> Traversal {
        let t = g
            .trace(vec)
            .unwrap_or_else(|e| panic!("trace from {:?} along {:?}: {e}", vec.pt, vec.dir));
        for seg in t.segments().filter(|s| s.length() > 1e-6 * g.rmax()) {
            let mid = vec.point_at(0.5 * (seg.start + seg.end));
            assert_eq!(
                g.locate_voxel(&mid),
                seg.voxel,
                "segment {seg:?} from {:?} along {:?}",
                vec.pt,
                vec.dir
            );
        }
        t
    }

    /// Bins of the first segment longer than rounding noise.
    fn first_bins(g: &Grid, t: &Traversal) -> VoxelIndices {
        t.segments()
            .find(|s| s.length() > 1e-6 * g.rmax())
            .and_then(|s| g.voxel_to_indices(s.voxel))
            .expect("a segment inside the grid")
    }

    fn boundary_directions(pt: &AtmoPoint) -> [DVec3; 7] {
        let (er, et, ep) = (pt.radial_unit(), pt.sza_unit(), pt.azimuth_unit());
        [
            er,
            -er,
            et,
            -et,
            ep,
            (er + et).normalize(),
            (-er + ep - et).normalize(),
        ]
    }

    #[test]
    fn test_origin_on_obtuse_cone_tangent() {
        let g = reference_grid();
        let j = 11;
        assert!(g.sza_boundaries()[j] > FRAC_PI_2);
        let pt = AtmoPoint::from_rtp(g.pts_radii()[5], g.sza_boundaries()[j], 0.0);
        let t = assert_segments_located(&g, &AtmoVector::from_direction(pt, DVec3::Y));
        // A tangent line leaves an obtuse cone toward the equator.
        assert_eq!(first_bins(&g, &t), VoxelIndices::new(5, j as isize - 1));
    }

    #[test]
    fn test_origin_on_acute_cone_tangent() {
        let g = reference_grid();
        let j = 5;
        assert!(g.sza_boundaries()[j] < FRAC_PI_2);
        let pt = AtmoPoint::from_rtp(g.pts_radii()[5], g.sza_boundaries()[j], 0.0);
        let t = assert_segments_located(&g, &AtmoVector::from_direction(pt, DVec3::Y));
        assert_eq!(first_bins(&g, &t), VoxelIndices::new(5, j as isize));
    }

    #[test]
    fn test_origin_on_cone_either_direction() {
        let g = reference_grid();
        for j in [5, 11] {
            let pt = AtmoPoint::from_rtp(g.pts_radii()[12], g.sza_boundaries()[j], 0.7);
            let up = assert_segments_located(&g, &AtmoVector::from_direction(pt, pt.sza_unit()));
            assert_eq!(first_bins(&g, &up).sza, j as isize);
            let down = assert_segments_located(&g, &AtmoVector::from_direction(pt, -pt.sza_unit()));
            assert_eq!(first_bins(&g, &down).sza, j as isize - 1);
        }
    }

    #[test]
    fn test_origin_on_radial_boundary_either_direction() {
        let g = reference_grid();
        let k = 7;
        let pt = AtmoPoint::from_rtp(g.radial_boundaries()[k], g.pts_sza()[9], 0.0);
        let out = assert_segments_located(&g, &AtmoVector::from_direction(pt, pt.radial_unit()));
        assert_eq!(first_bins(&g, &out).r, k as isize);
        let inward = assert_segments_located(&g, &AtmoVector::from_direction(pt, -pt.radial_unit()));
        assert_eq!(first_bins(&g, &inward).r, k as isize - 1);
        assert!(inward.exits_bottom());
        // Moving along the sphere the radius only grows.
        let level = assert_segments_located(&g, &AtmoVector::from_direction(pt, pt.sza_unit()));
        assert_eq!(first_bins(&g, &level).r, k as isize);
    }

    #[test]
    fn test_untagged_origin_at_grid_edges() {
        let g = reference_grid();
        let top = g.n_radial_cells() as isize;

        let bottom = AtmoPoint::from_rtp(g.rmin(), 2.5, 0.0);
        let into_planet = g
            .trace(&AtmoVector::from_direction(bottom, -bottom.radial_unit()))
            .unwrap();
        assert_eq!(into_planet.len(), 1);
        assert!(into_planet.exits_bottom());
        let sunward_on_nightside = g.trace(&AtmoVector::toward_sun(bottom)).unwrap();
        assert!(sunward_on_nightside.exits_bottom());
        let up = assert_segments_located(&g, &AtmoVector::from_direction(bottom, bottom.radial_unit()));
        assert_eq!(first_bins(&g, &up).r, 0);
        let skim = assert_segments_located(&g, &AtmoVector::from_direction(bottom, bottom.sza_unit()));
        assert_eq!(first_bins(&g, &skim).r, 0);
        assert!(!skim.exits_bottom());

        let edge = AtmoPoint::from_rtp(g.rmax(), 1.2, 0.0);
        let away = g
            .trace(&AtmoVector::from_direction(edge, edge.radial_unit()))
            .unwrap();
        assert_eq!(away.len(), 1);
        assert!(away.crossings()[0].voxel.is_none());
        assert!(!away.exits_bottom());
        let graze = g
            .trace(&AtmoVector::from_direction(edge, edge.sza_unit()))
            .unwrap();
        assert!(graze.length_inside() < 1e-6 * g.rmax());
        assert!(!graze.exits_bottom());
        let inward = assert_segments_located(&g, &AtmoVector::from_direction(edge, -edge.radial_unit()));
        assert_eq!(first_bins(&g, &inward).r, top - 1);
        assert!(inward.exits_bottom());
    }

    #[test]
    fn test_origins_on_every_boundary() {
        let g = reference_grid();
        let n_sza = g.sza_boundaries().len();
        // (origin, whether it sits on a cone)
        let mut origins = Vec::new();
        for &r in [0, 5, 20, 38].iter().map(|&k| &g.pts_radii()[k]) {
            for &t in &g.sza_boundaries()[1..n_sza - 1] {
                origins.push((AtmoPoint::from_rtp(r, t, 0.4), true));
            }
        }
        for &r in g.radial_boundaries() {
            for &t in [3, 9, 15].iter().map(|&j| &g.pts_sza()[j]) {
                origins.push((AtmoPoint::from_rtp(r, t, 1.9), false));
            }
        }
        for &r in [1, 12].iter().map(|&k| &g.radial_boundaries()[k]) {
            for &t in [5, 11].iter().map(|&j| &g.sza_boundaries()[j]) {
                origins.push((AtmoPoint::from_rtp(r, t, 0.0), true));
            }
        }

        for (pt, on_cone) in &origins {
            // A radial line from a cone point lies in the cone itself.
            let skip = if *on_cone { 2 } else { 0 };
            for dir in boundary_directions(pt).into_iter().skip(skip) {
                assert_segments_located(&g, &AtmoVector::from_direction(*pt, dir));
            }
        }
    }

    fn record(distance: f64, g: &Grid, r: isize, sza: isize) -> Crossing {
        let indices = VoxelIndices::new(r, sza);
        Crossing {
            distance,
            voxel: g.indices_to_voxel(indices),
            indices,
            axis: Axis::Radial,
        }
    }

    #[test]
    fn test_check_rejects_bad_lists() {
        let g = reference_grid();
        let top = g.n_radial_cells() as isize;

        let good = [record(0.0, &g, 37, 3), record(1.0, &g, top - 1, 3), record(2.0, &g, top, 3)];
        assert_eq!(g.check_crossings(&good), Ok(()));

        let late_origin = [record(0.5, &g, 37, 3), record(1.0, &g, 38, 3)];
        assert_eq!(
            g.check_crossings(&late_origin),
            Err(GeometryError::OriginNotFirst(0.5))
        );

        let unordered = [record(0.0, &g, 37, 3), record(2.0, &g, 38, 3), record(1.0, &g, top, 3)];
        assert!(matches!(
            g.check_crossings(&unordered),
            Err(GeometryError::UnorderedCrossings { index: 2, .. })
        ));

        let jump = [record(0.0, &g, 10, 3), record(1.0, &g, 12, 3), record(2.0, &g, top, 3)];
        assert!(matches!(
            g.check_crossings(&jump),
            Err(GeometryError::NonAdjacentStep { index: 1, .. })
        ));

        let hole = [record(0.0, &g, 0, 3), record(1.0, &g, -1, 3), record(2.0, &g, 0, 3)];
        assert_eq!(
            g.check_crossings(&hole),
            Err(GeometryError::InvalidInteriorVoxel(1))
        );

        let no_exit = [record(0.0, &g, 10, 3), record(1.0, &g, 11, 3)];
        assert_eq!(g.check_crossings(&no_exit), Err(GeometryError::MissingExit));

        let too_many: Vec<Crossing> = (0..=g.max_crossings())
            .map(|i| record(i as f64, &g, 0, 0))
            .collect();
        assert!(matches!(
            g.check_crossings(&too_many),
            Err(GeometryError::TooManyCrossings { .. })
        ));
    }
}
