//! Parallel tracing of sunward columns for single-scattering optical depth.
//!
//! Every voxel anchor is traced straight toward the Sun (+z). The resulting
//! per-voxel path lengths do not depend on the emission, so they are traced
//! once on a worker pool and then reduced against each emission's `dtau`
//! arrays on the calling thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, info};

use crate::coords::AtmoVector;
use crate::emission::Emission;
use crate::error::GeometryError;
use crate::grid::Grid;
use crate::traversal::{Segment, TraceScratch};

/// A request to trace the sunward column above one voxel anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnTask {
    pub voxel: usize,
}

/// The sunward path from one voxel anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnPath {
    /// Voxel whose anchor the column starts from.
    pub voxel: usize,
    /// Per-voxel pieces of the path, starting in `voxel`.
    pub segments: Vec<Segment>,
    /// True if the planet blocks the Sun.
    pub shadowed: bool,
}

impl ColumnPath {
    /// Optical depth to the Sun for per-voxel extinction `dtau`.
    ///
    /// Shadowed columns have infinite optical depth.
    pub fn optical_depth(&self, dtau: &[f64]) -> f64 {
        if self.shadowed {
            return f64::INFINITY;
        }
        self.segments
            .iter()
            .map(|s| dtau[s.voxel] * s.length())
            .sum()
    }
}

type ColumnResult = Result<ColumnPath, GeometryError>;

/// Trace the sunward column above `voxel` on the calling thread.
pub fn column_path(
    grid: &Grid,
    voxel: usize,
    scratch: &mut TraceScratch,
) -> Result<ColumnPath, GeometryError> {
    let vox = grid.voxel(voxel).ok_or(GeometryError::InvalidVoxel(voxel))?;
    let traversal = grid.trace_into(&AtmoVector::toward_sun(vox.pt), scratch)?;
    Ok(ColumnPath {
        voxel,
        segments: traversal.segments().collect(),
        shadowed: traversal.exits_bottom(),
    })
}

/// Fill an emission's single-scattering optical depths from traced columns.
pub fn single_scattering(
    paths: &[ColumnPath],
    emission: &mut Emission,
) -> Result<(), GeometryError> {
    let n = emission.n_voxels();
    let mut tau_species = vec![0.0; n];
    let mut tau_absorber = vec![0.0; n];
    for path in paths {
        if path.voxel >= n {
            return Err(GeometryError::InvalidVoxel(path.voxel));
        }
        tau_species[path.voxel] = path.optical_depth(&emission.dtau_species);
        tau_absorber[path.voxel] = path.optical_depth(&emission.dtau_absorber);
    }
    emission.set_single_scattering(tau_species, tau_absorber)
}

/// A pool of threads tracing columns against a shared grid.
///
/// Each worker owns its own [`TraceScratch`]; the grid is shared read-only.
pub struct ColumnWorkers {
    task_sender: Option<Sender<ColumnTask>>,
    result_receiver: Receiver<ColumnResult>,
    handles: Vec<JoinHandle<()>>,
}

impl ColumnWorkers {
    /// Spawn `thread_count` workers with a task queue of `queue_capacity`.
    pub fn new(
        grid: Arc<Grid>,
        thread_count: usize,
        queue_capacity: usize,
    ) -> std::io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<ColumnTask>(queue_capacity.max(1));
        // Unbounded so a worker never blocks while the caller is still submitting.
        let (result_sender, result_receiver) = unbounded::<ColumnResult>();

        let mut handles = Vec::with_capacity(thread_count);
        for i in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let grid = Arc::clone(&grid);

            let handle = std::thread::Builder::new()
                .name(format!("column-worker-{i}"))
                .spawn(move || {
                    let mut scratch = TraceScratch::for_grid(&grid);
                    while let Ok(task) = receiver.recv() {
                        let result = column_path(&grid, task.voxel, &mut scratch);
                        if sender.send(result).is_err() {
                            break;
                        }
                    }
                })?;
            handles.push(handle);
        }

        debug!("Spawned {} column workers", handles.len());
        Ok(Self {
            task_sender: Some(task_sender),
            result_receiver,
            handles,
        })
    }

    /// A pool with one worker per CPU core.
    pub fn with_defaults(grid: Arc<Grid>) -> std::io::Result<Self> {
        let threads = num_cpus::get().max(1);
        Self::new(grid, threads, threads * 16)
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Trace every column in `voxels` and return the paths sorted by voxel.
    ///
    /// The first geometry error reported by any worker is returned after all
    /// submitted tasks have drained.
    pub fn run(
        &self,
        voxels: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<ColumnPath>, GeometryError> {
        let start = Instant::now();
        let Some(sender) = &self.task_sender else {
            return Ok(Vec::new());
        };

        let mut submitted = 0;
        for voxel in voxels {
            if sender.send(ColumnTask { voxel }).is_err() {
                break;
            }
            submitted += 1;
        }

        let mut paths = Vec::with_capacity(submitted);
        let mut first_error = None;
        for _ in 0..submitted {
            match self.result_receiver.recv() {
                Ok(Ok(path)) => paths.push(path),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => break,
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        paths.sort_by_key(|p| p.voxel);
        info!(
            "Traced {} sunward columns on {} threads in {:.1} ms",
            paths.len(),
            self.thread_count(),
            start.elapsed().as_secs_f64() * 1e3
        );
        Ok(paths)
    }
}

impl Drop for ColumnWorkers {
    fn drop(&mut self) {
        // Closing the queue ends each worker's receive loop.
        self.task_sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::CO2_LYMAN_ALPHA_SIGMA;
    use crate::test_support::{mars, reference_grid};

    fn serial_paths(grid: &Grid) -> Vec<ColumnPath> {
        let mut scratch = TraceScratch::for_grid(grid);
        (0..grid.n_voxels())
            .map(|v| column_path(grid, v, &mut scratch).unwrap())
            .collect()
    }

    #[test]
    fn test_parallel_matches_serial() {
        let grid = Arc::new(reference_grid());
        let workers = ColumnWorkers::new(Arc::clone(&grid), 4, 8).unwrap();
        let parallel = workers.run(0..grid.n_voxels()).unwrap();
        assert_eq!(parallel, serial_paths(&grid));
    }

    #[test]
    fn test_with_defaults_runs() {
        let grid = Arc::new(reference_grid());
        let workers = ColumnWorkers::with_defaults(Arc::clone(&grid)).unwrap();
        assert!(workers.thread_count() >= 1);
        let paths = workers.run([0, 5, 17]).unwrap();
        let voxels: Vec<usize> = paths.iter().map(|p| p.voxel).collect();
        assert_eq!(voxels, vec![0, 5, 17]);
    }

    #[test]
    fn test_invalid_voxel_reported() {
        let grid = Arc::new(reference_grid());
        let workers = ColumnWorkers::new(Arc::clone(&grid), 2, 4).unwrap();
        let bad = grid.n_voxels() + 3;
        assert_eq!(
            workers.run([0, bad]).unwrap_err(),
            GeometryError::InvalidVoxel(bad)
        );
    }

    #[test]
    fn test_nightside_columns_are_shadowed() {
        let grid = reference_grid();
        let mut scratch = TraceScratch::for_grid(&grid);
        let antisolar = grid.n_sza_cells() - 1;
        let path = column_path(&grid, antisolar, &mut scratch).unwrap();
        assert!(path.shadowed);
        assert_eq!(path.optical_depth(&vec![1.0; grid.n_voxels()]), f64::INFINITY);

        let path = column_path(&grid, 0, &mut scratch).unwrap();
        assert!(!path.shadowed);
    }

    #[test]
    fn test_subsolar_column_depth() {
        let grid = reference_grid();
        let mut scratch = TraceScratch::for_grid(&grid);
        let path = column_path(&grid, 0, &mut scratch).unwrap();
        let mut dtau = vec![0.0; grid.n_voxels()];
        dtau[0] = 2e-8;
        let v = grid.voxels()[0];
        let expected = 2e-8 * (v.r_bounds[1] - v.pt.r);
        assert!((path.optical_depth(&dtau) - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn test_single_scattering_fills_emission() {
        let grid = Arc::new(reference_grid());
        let atm = mars();
        let model = atm.line(atm.lyman_alpha_sigma(), CO2_LYMAN_ALPHA_SIGMA);
        let mut em = Emission::new("H Lyman alpha", 1.0);
        em.define(&model, grid.voxels());

        let workers = ColumnWorkers::new(Arc::clone(&grid), 3, 16).unwrap();
        let paths = workers.run(0..grid.n_voxels()).unwrap();
        single_scattering(&paths, &mut em).unwrap();

        let top_subsolar = grid.n_voxels() - grid.n_sza_cells();
        let bottom_subsolar = 0;
        assert!(em.tau_species_single_scattering[top_subsolar] >= 0.0);
        assert!(
            em.tau_species_single_scattering[bottom_subsolar]
                > em.tau_species_single_scattering[top_subsolar]
        );
        assert_eq!(
            em.tau_species_single_scattering[grid.n_sza_cells() - 1],
            f64::INFINITY
        );
        assert_eq!(em.singlescat[grid.n_sza_cells() - 1], 0.0);
    }
}
