//! Sample line-of-sight integration through the grid.

use exo_config::Config;
use exo_grid::{
    AtmoPoint, AtmoVector, Emission, GeometryError, Grid, InterpolatedValues, RaySet, TraceScratch,
};
use glam::DVec3;
use tracing::debug;

/// A spacecraft position and viewing direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sightline {
    pub origin: AtmoPoint,
    pub direction: DVec3,
}

impl Sightline {
    /// Nadir view from the configured spacecraft position.
    pub fn from_config(config: &Config) -> Self {
        let r = config.observation.distance_planet_radii * config.atmosphere.planet_radius_km * 1e5;
        let origin = AtmoPoint::from_rtp(r, config.observation.sza_deg.to_radians(), 0.0);
        Self {
            origin,
            direction: -origin.pos,
        }
    }

    fn vector(&self) -> AtmoVector {
        AtmoVector::from_direction(self.origin, self.direction)
    }
}

/// Line-of-sight totals for one emission.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineOfSight {
    /// Scatterer optical depth along the path.
    pub tau_species: f64,
    /// Absorber optical depth along the path.
    pub tau_absorber: f64,
    /// Attenuated source function integrated over the path.
    pub brightness: f64,
}

/// How per-segment optical quantities are taken from the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sampling {
    /// Log-linear interpolation at the segment midpoint.
    Interpolated,
    /// The voxel-average value of the voxel the segment crosses.
    VoxelAverage,
}

/// Integrate every emission along the sightline.
pub fn integrate(
    grid: &Grid,
    emissions: &[Emission],
    sightline: &Sightline,
    sampling: Sampling,
) -> Result<Vec<LineOfSight>, GeometryError> {
    let mut scratch = TraceScratch::for_grid(grid);
    integrate_into(grid, emissions, &sightline.vector(), sampling, &mut scratch)
}

fn integrate_into(
    grid: &Grid,
    emissions: &[Emission],
    vec: &AtmoVector,
    sampling: Sampling,
    scratch: &mut TraceScratch,
) -> Result<Vec<LineOfSight>, GeometryError> {
    let traversal = grid.trace_into(vec, scratch)?;
    let mut totals = vec![LineOfSight::default(); emissions.len()];

    for segment in traversal.segments() {
        let length = segment.length();
        let values = match sampling {
            Sampling::Interpolated => {
                let pt = vec.point_at(0.5 * (segment.start + segment.end));
                grid.grid_interp(segment.voxel, &pt, emissions)?
            }
            Sampling::VoxelAverage => voxel_values(emissions, segment.voxel)?,
        };
        for (total, v) in totals.iter_mut().zip(&values) {
            let dtau_species = v.dtau_species * length;
            let dtau_absorber = v.dtau_absorber * length;
            let tau = total.tau_species + total.tau_absorber;
            total.brightness += v.sourcefn * dtau_species * (-tau).exp();
            total.tau_species += dtau_species;
            total.tau_absorber += dtau_absorber;
        }
    }

    debug!(
        "Sightline crossed {} records, {:.3e} cm inside the grid, hits planet: {}",
        traversal.len(),
        traversal.length_inside(),
        traversal.exits_bottom()
    );
    Ok(totals)
}

fn voxel_values(
    emissions: &[Emission],
    voxel: usize,
) -> Result<Vec<InterpolatedValues>, GeometryError> {
    let at = |values: &[f64]| {
        values
            .get(voxel)
            .copied()
            .ok_or(GeometryError::InvalidVoxel(voxel))
    };
    emissions
        .iter()
        .map(|em| {
            Ok(InterpolatedValues {
                dtau_species: at(&em.dtau_species)?,
                dtau_absorber: at(&em.dtau_absorber)?,
                abs: at(&em.abs)?,
                sourcefn: at(&em.sourcefn)?,
            })
        })
        .collect()
}

/// A synthetic square image taken from one spacecraft position.
#[derive(Clone, Debug, PartialEq)]
pub struct FakeObservation {
    origin: AtmoPoint,
    size: usize,
    directions: Vec<DVec3>,
}

impl FakeObservation {
    /// A `size` x `size` image centred on nadir and spanning
    /// `field_of_view_deg` on each side.
    pub fn new(origin: AtmoPoint, field_of_view_deg: f64, size: usize) -> Self {
        let nadir = -origin.pos.normalize();
        let (u, v) = nadir.any_orthonormal_pair();
        let half = 0.5 * field_of_view_deg.to_radians();
        let offset = |i: usize| (((i as f64 + 0.5) / size as f64) * 2.0 - 1.0) * half;

        let mut directions = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let dir = nadir + offset(col).tan() * u + offset(row).tan() * v;
                directions.push(dir.normalize());
            }
        }
        Self {
            origin,
            size,
            directions,
        }
    }

    /// The configured image from the configured spacecraft position.
    pub fn from_config(config: &Config) -> Self {
        let sightline = Sightline::from_config(config);
        Self::new(
            sightline.origin,
            config.observation.field_of_view_deg,
            config.observation.image_size,
        )
    }

    /// Pixels per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Line-of-sight totals per pixel (row-major), one entry per emission.
    pub fn brightness(
        &self,
        grid: &Grid,
        emissions: &[Emission],
        sampling: Sampling,
    ) -> Result<Vec<Vec<LineOfSight>>, GeometryError> {
        let mut scratch = TraceScratch::for_grid(grid);
        self.directions
            .iter()
            .map(|&dir| {
                let vec = AtmoVector::from_direction(self.origin, dir);
                integrate_into(grid, emissions, &vec, sampling, &mut scratch)
            })
            .collect()
    }
}

/// Trace every ray from the anchor of a mid-grid voxel and return the
/// longest crossing list.
pub fn trace_ray_set(grid: &Grid, rays: &RaySet) -> Result<usize, GeometryError> {
    let index = (grid.n_radial_cells() / 2) * grid.n_sza_cells() + grid.n_sza_cells() / 2;
    let voxel = grid.voxel(index).ok_or(GeometryError::InvalidVoxel(index))?;
    let mut scratch = TraceScratch::for_grid(grid);
    let mut longest = 0;
    for ray in rays {
        let vec = AtmoVector::from_ray(voxel.pt, ray);
        longest = longest.max(grid.trace_into(&vec, &mut scratch)?.len());
    }
    Ok(longest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exo_grid::{AtmosphereBounds, BarometricAtmosphere, GridSpec};

    fn setup() -> (Grid, Vec<Emission>) {
        let atm = BarometricAtmosphere::hydrogen_co2(
            AtmosphereBounds {
                rmin: 3475e5,
                rexo: 3595e5,
                rmax: 53_395e5,
            },
            200.0,
            5e5,
            2e8,
        );
        let grid = Grid::build(&GridSpec::default(), &atm).unwrap();
        let mut emission = Emission::new("lyman alpha", 1.0);
        emission.define(&atm.line(atm.lyman_alpha_sigma(), 0.0), grid.voxels());
        emission
            .set_source_function(vec![1.0; grid.n_voxels()])
            .unwrap();
        (grid, vec![emission])
    }

    #[test]
    fn test_sightline_points_at_center() {
        let sightline = Sightline::from_config(&Config::default());
        let expected_r = 30.0 * 3395e5;
        assert!((sightline.origin.r - expected_r).abs() / expected_r < 1e-12);
        let along = sightline.direction.normalize().dot(sightline.origin.pos.normalize());
        assert!((along + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nadir_integral_is_positive() {
        let (grid, emissions) = setup();
        let sightline = Sightline::from_config(&Config::default());
        let totals = integrate(&grid, &emissions, &sightline, Sampling::Interpolated).unwrap();
        assert_eq!(totals.len(), 1);
        assert!(totals[0].tau_species > 0.0);
        assert_eq!(totals[0].tau_absorber, 0.0);
        // Unit source function: a left sum of exp(-tau) dtau, bounded by
        // its integral 1 - exp(-tau) below and by tau above.
        let tau = totals[0].tau_species;
        let integral = 1.0 - (-tau).exp();
        assert!(totals[0].brightness >= integral * (1.0 - 1e-9));
        assert!(totals[0].brightness <= tau * (1.0 + 1e-9));
    }

    #[test]
    fn test_sightline_missing_grid() {
        let (grid, emissions) = setup();
        let origin = AtmoPoint::from_rtp(30.0 * 3395e5, 1.0, 0.0);
        let sightline = Sightline {
            origin,
            direction: origin.radial_unit(),
        };
        let totals = integrate(&grid, &emissions, &sightline, Sampling::Interpolated).unwrap();
        assert_eq!(totals[0], LineOfSight::default());
    }

    #[test]
    fn test_trace_ray_set_bounded() {
        let (grid, _) = setup();
        let rays = RaySet::build(6, 4).unwrap();
        let longest = trace_ray_set(&grid, &rays).unwrap();
        assert!(longest >= 2);
        assert!(longest <= grid.max_crossings());
    }

    #[test]
    fn test_voxel_average_sums_voxel_dtau() {
        let (grid, emissions) = setup();
        let sightline = Sightline::from_config(&Config::default());
        let traversal = grid.trace(&sightline.vector()).unwrap();
        let expected: f64 = traversal
            .segments()
            .map(|seg| emissions[0].dtau_species[seg.voxel] * seg.length())
            .sum();

        let totals = integrate(&grid, &emissions, &sightline, Sampling::VoxelAverage).unwrap();
        assert!(expected > 0.0);
        assert!((totals[0].tau_species - expected).abs() <= 1e-12 * expected);

        let interpolated =
            integrate(&grid, &emissions, &sightline, Sampling::Interpolated).unwrap();
        let ratio = totals[0].brightness / interpolated[0].brightness;
        assert!((0.5..2.0).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn test_fake_image_centre_pixel_is_nadir() {
        let (grid, emissions) = setup();
        let config = Config::default();
        let image = FakeObservation::new(Sightline::from_config(&config).origin, 30.0, 5);
        assert_eq!(image.size(), 5);

        let pixels = image
            .brightness(&grid, &emissions, Sampling::Interpolated)
            .unwrap();
        assert_eq!(pixels.len(), 25);
        let nadir = integrate(
            &grid,
            &emissions,
            &Sightline::from_config(&config),
            Sampling::Interpolated,
        )
        .unwrap();
        let centre = pixels[12][0].brightness;
        assert!((centre - nadir[0].brightness).abs() <= 1e-9 * nadir[0].brightness);
    }

    #[test]
    fn test_fake_image_spans_field_of_view() {
        let origin = AtmoPoint::from_rtp(30.0 * 3395e5, 1.0, 0.0);
        let image = FakeObservation::new(origin, 30.0, 4);
        let nadir = -origin.pos.normalize();
        let max_angle = image
            .directions
            .iter()
            .map(|d| d.dot(nadir).clamp(-1.0, 1.0).acos())
            .fold(0.0, f64::max);
        // Corner pixels sit off both image axes.
        assert!(max_angle > 10.0_f64.to_radians());
        assert!(max_angle < 15.0_f64.to_radians() * std::f64::consts::SQRT_2);

        // The grid top subtends about 31 degrees from 30 planet radii, so
        // every pixel crosses it.
        let (grid, emissions) = setup();
        let pixels = image
            .brightness(&grid, &emissions, Sampling::VoxelAverage)
            .unwrap();
        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|p| p[0].tau_species > 0.0));
    }
}
