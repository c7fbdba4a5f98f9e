use criterion::{Criterion, black_box, criterion_group, criterion_main};
use exo_grid::*;

fn mars_grid() -> Grid {
    let atm = BarometricAtmosphere::hydrogen_co2(
        AtmosphereBounds {
            rmin: 3390e5,
            rexo: 3590e5,
            rmax: 50_000e5,
        },
        200.0,
        5e5,
        2e8,
    );
    let spec = GridSpec {
        radial_method: RadialMethod::Altitude,
        sza_method: SzaMethod::UniformCos,
        n_radial_boundaries: 40,
        n_sza_boundaries: 20,
    };
    Grid::build(&spec, &atm).unwrap()
}

fn bench_grid_build(c: &mut Criterion) {
    let atm = BarometricAtmosphere::hydrogen_co2(
        AtmosphereBounds {
            rmin: 3390e5,
            rexo: 3590e5,
            rmax: 50_000e5,
        },
        200.0,
        5e5,
        2e8,
    );
    let spec = GridSpec::default();
    c.bench_function("grid_build", |bencher| {
        bencher.iter(|| black_box(Grid::build(&spec, &atm).unwrap()))
    });
}

fn bench_trace_from_voxel(c: &mut Criterion) {
    let grid = mars_grid();
    let rays = RaySet::build(12, 6).unwrap();
    let voxel = grid.voxels()[grid.n_sza_cells() * 10 + 7];
    let mut scratch = TraceScratch::for_grid(&grid);
    c.bench_function("trace_all_rays_from_voxel", |bencher| {
        bencher.iter(|| {
            for ray in &rays {
                let vec = AtmoVector::from_ray(voxel.pt, ray);
                black_box(grid.trace_into(&vec, &mut scratch).unwrap().len());
            }
        })
    });
}

fn bench_trace_observation(c: &mut Criterion) {
    let grid = mars_grid();
    let origin = AtmoPoint::from_rtp(30.0 * R_MARS_CM, 1.2, 0.0);
    let vec = AtmoVector::from_direction(origin, -origin.pos);
    c.bench_function("trace_observation", |bencher| {
        bencher.iter(|| black_box(grid.trace(black_box(&vec)).unwrap()))
    });
}

fn bench_interp_weights(c: &mut Criterion) {
    let grid = mars_grid();
    let voxel = grid.voxels()[grid.n_sza_cells() * 20 + 5];
    let pt = AtmoPoint::from_rtp(
        0.4 * voxel.r_bounds[0] + 0.6 * voxel.r_bounds[1],
        voxel.pt.t + 0.01,
        0.5,
    );
    let mut weights = InterpWeights::default();
    c.bench_function("interp_weights", |bencher| {
        bencher.iter(|| {
            grid.interp_weights_into(voxel.index, black_box(&pt), &mut weights)
                .unwrap();
            black_box(weights)
        })
    });
}

criterion_group!(
    benches,
    bench_grid_build,
    bench_trace_from_voxel,
    bench_trace_observation,
    bench_interp_weights,
);
criterion_main!(benches);
