//! Analytic boundary surfaces: spheres at radial boundaries and cones at
//! interior SZA boundaries.
//!
//! Each surface solves its ray-intersection quadratic and reports the signed
//! distances along the ray, together with the direction in which the ray
//! crosses. Tangent contacts (double roots) are reported as no crossing,
//! since they do not change the voxel the ray occupies.

use crate::coords::AtmoVector;

/// Cones whose half-angle is this close to π/2 are treated as the equatorial plane.
const PLANE_COS_EPSILON: f64 = 1e-12;

/// One ray/surface crossing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Signed distance along the ray.
    pub distance: f64,
    /// True when the crossed coordinate (radius or SZA) increases along the ray.
    pub increasing: bool,
}

/// Up to two crossings, sorted by distance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hits {
    hits: [Option<SurfaceHit>; 2],
}

impl Hits {
    /// No crossings.
    pub fn none() -> Self {
        Self::default()
    }

    fn push(&mut self, hit: SurfaceHit) {
        if self.hits[0].is_none() {
            self.hits[0] = Some(hit);
        } else {
            self.hits[1] = Some(hit);
            if let [Some(a), Some(b)] = self.hits
                && b.distance < a.distance
            {
                self.hits.swap(0, 1);
            }
        }
    }

    /// Number of crossings (0, 1 or 2).
    pub fn len(&self) -> usize {
        self.hits.iter().flatten().count()
    }

    /// True if the ray does not cross the surface.
    pub fn is_empty(&self) -> bool {
        self.hits[0].is_none()
    }

    /// Iterate the crossings in order of distance.
    pub fn iter(&self) -> impl Iterator<Item = SurfaceHit> + '_ {
        self.hits.iter().flatten().copied()
    }
}

/// Sphere centered on the planet, one per radial boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    radius: f64,
}

impl Sphere {
    /// Create a sphere of the given radius.
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Sphere radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Intersect the ray with this sphere.
    ///
    /// Solves `|p + s d|² = R²`. Roots closer together than `tolerance` are a
    /// tangent contact and produce no crossing.
    pub fn intersections(&self, vec: &AtmoVector, tolerance: f64) -> Hits {
        let p = vec.pt.pos;
        let d = vec.dir;
        let b = p.dot(d);
        let c = p.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc <= 0.0 {
            return Hits::none();
        }
        let sqrt_disc = disc.sqrt();
        if 2.0 * sqrt_disc < tolerance {
            return Hits::none();
        }

        // Stable form: avoid cancellation between -b and sqrt_disc.
        let q = -b - b.signum() * sqrt_disc;
        let (s0, s1) = if q == 0.0 {
            (-sqrt_disc, sqrt_disc)
        } else {
            (q, c / q)
        };

        let mut hits = Hits::none();
        for s in [s0, s1] {
            // d|P|²/ds = 2 (p·d + s)
            hits.push(SurfaceHit {
                distance: s,
                increasing: b + s > 0.0,
            });
        }
        hits
    }
}

/// Cone with its apex at the planet center and its axis along +z.
///
/// The surface is the set of points whose SZA equals `angle`. Only the nappe
/// on the correct side of the xy-plane counts: a cone with `angle < π/2`
/// lives at `z > 0`, one with `angle > π/2` at `z < 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cone {
    angle: f64,
    cos_angle: f64,
    cos2: f64,
}

impl Cone {
    /// Create a cone with the given half-angle (SZA) in radians.
    pub fn new(angle: f64) -> Self {
        let cos_angle = angle.cos();
        Self {
            angle,
            cos_angle,
            cos2: cos_angle * cos_angle,
        }
    }

    /// Cone half-angle.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// True if this cone degenerates to the `z = 0` plane.
    pub fn is_plane(&self) -> bool {
        self.cos_angle.abs() < PLANE_COS_EPSILON
    }

    /// Intersect the ray with this cone.
    ///
    /// Solves `(P·ẑ)² = cos²α |P|²` with `P = p + s d`, then keeps only the
    /// roots on the physical nappe. Roots closer together than `tolerance`
    /// are a tangent contact and produce no crossing.
    pub fn intersections(&self, vec: &AtmoVector, tolerance: f64) -> Hits {
        let p = vec.pt.pos;
        let d = vec.dir;
        let mut hits = Hits::none();

        if self.is_plane() {
            if d.z.abs() < f64::EPSILON {
                return hits;
            }
            hits.push(SurfaceHit {
                distance: -p.z / d.z,
                increasing: d.z < 0.0,
            });
            return hits;
        }

        let a = d.z * d.z - self.cos2;
        let b = 2.0 * (p.z * d.z - self.cos2 * p.dot(d));
        let c = p.z * p.z - self.cos2 * p.length_squared();

        let mut roots = [f64::NAN; 2];
        if a.abs() < PLANE_COS_EPSILON {
            // Ray parallel to a generator: the quadratic is linear. A ray
            // lying in the cone never changes SZA.
            if b.abs() <= 16.0 * f64::EPSILON * p.length() {
                return hits;
            }
            roots[0] = -c / b;
        } else {
            let disc = b * b - 4.0 * a * c;
            if disc <= 0.0 {
                return hits;
            }
            let sqrt_disc = disc.sqrt();
            if sqrt_disc / a.abs() < tolerance {
                return hits;
            }
            let q = -0.5 * (b + b.signum() * sqrt_disc);
            roots = if q == 0.0 {
                [sqrt_disc / (2.0 * a), -sqrt_disc / (2.0 * a)]
            } else {
                [q / a, c / q]
            };
        }

        for s in roots.into_iter().filter(|s| s.is_finite()) {
            let pos = p + d * s;
            if pos.z * self.cos_angle <= 0.0 {
                // Mirror nappe.
                continue;
            }
            // SZA grows along the ray when cos(SZA) = z/r shrinks, i.e. when
            // d_z r² - z (P·d) < 0.
            let rate = d.z * pos.length_squared() - pos.z * pos.dot(d);
            hits.push(SurfaceHit {
                distance: s,
                increasing: rate < 0.0,
            });
        }
        hits
    }
}
