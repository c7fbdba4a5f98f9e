//! Points and ray vectors in the planet-centered frame.
//!
//! The Sun lies along +z. A point's solar zenith angle (SZA) is its polar
//! angle from +z and its azimuth is measured in the xy-plane from +x. Because
//! the grid is symmetric about the z axis, only radius and SZA locate a voxel.

use std::f64::consts::TAU;

use glam::DVec3;

use crate::rays::Ray;

/// A point in the atmosphere, cached in both cartesian and spherical form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmoPoint {
    /// Cartesian position.
    pub pos: DVec3,
    /// Distance from the planet center.
    pub r: f64,
    /// Solar zenith angle in `[0, π]`.
    pub t: f64,
    /// Azimuth in `[0, 2π)`.
    pub p: f64,
    /// Voxel this point is known to lie in, if the caller has tagged it.
    pub voxel: Option<usize>,
}

impl AtmoPoint {
    /// Build a point from radius, SZA and azimuth.
    pub fn from_rtp(r: f64, t: f64, p: f64) -> Self {
        let pos = DVec3::new(r * t.sin() * p.cos(), r * t.sin() * p.sin(), r * t.cos());
        Self {
            pos,
            r,
            t,
            p,
            voxel: None,
        }
    }

    /// Build a point from cartesian coordinates.
    pub fn from_xyz(pos: DVec3) -> Self {
        let r = pos.length();
        // The center has no defined direction; call it the subsolar axis.
        let t = if r > 0.0 {
            (pos.z / r).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        let mut p = pos.y.atan2(pos.x);
        if p < 0.0 {
            p += TAU;
        }
        Self {
            pos,
            r,
            t,
            p,
            voxel: None,
        }
    }

    /// Tag this point with the voxel it is known to occupy.
    #[must_use]
    pub fn with_voxel(mut self, voxel: usize) -> Self {
        self.voxel = Some(voxel);
        self
    }

    /// Unit vector pointing away from the planet center.
    pub fn radial_unit(&self) -> DVec3 {
        DVec3::new(
            self.t.sin() * self.p.cos(),
            self.t.sin() * self.p.sin(),
            self.t.cos(),
        )
    }

    /// Unit vector in the direction of increasing SZA.
    pub fn sza_unit(&self) -> DVec3 {
        DVec3::new(
            self.t.cos() * self.p.cos(),
            self.t.cos() * self.p.sin(),
            -self.t.sin(),
        )
    }

    /// Unit vector in the direction of increasing azimuth.
    pub fn azimuth_unit(&self) -> DVec3 {
        DVec3::new(-self.p.sin(), self.p.cos(), 0.0)
    }

    /// The point reached after travelling `distance` along `direction`.
    ///
    /// The result carries no voxel tag.
    pub fn advance(&self, direction: DVec3, distance: f64) -> Self {
        Self::from_xyz(self.pos + direction * distance)
    }
}

/// A ray origin and a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmoVector {
    /// Where the ray starts.
    pub pt: AtmoPoint,
    /// Unit direction of travel.
    pub dir: DVec3,
}

impl AtmoVector {
    /// A ray from `pt` along an arbitrary cartesian direction (normalized here).
    pub fn from_direction(pt: AtmoPoint, dir: DVec3) -> Self {
        Self {
            pt,
            dir: dir.normalize(),
        }
    }

    /// A ray from `pt` whose angles are given in the local frame of `pt`.
    ///
    /// The ray's polar angle is measured from the local vertical and its
    /// azimuth from the local direction of increasing SZA.
    pub fn from_ray(pt: AtmoPoint, ray: &Ray) -> Self {
        let (st, ct) = ray.theta.sin_cos();
        let (sp, cp) = ray.phi.sin_cos();
        let dir = st * cp * pt.sza_unit() + st * sp * pt.azimuth_unit() + ct * pt.radial_unit();
        Self {
            pt,
            dir: dir.normalize(),
        }
    }

    /// A ray from `pt` pointing straight at the Sun (+z).
    pub fn toward_sun(pt: AtmoPoint) -> Self {
        Self { pt, dir: DVec3::Z }
    }

    /// Cartesian position at `distance` along the ray.
    pub fn position_at(&self, distance: f64) -> DVec3 {
        self.pt.pos + self.dir * distance
    }

    /// Point at `distance` along the ray.
    pub fn point_at(&self, distance: f64) -> AtmoPoint {
        AtmoPoint::from_xyz(self.position_at(distance))
    }
}
