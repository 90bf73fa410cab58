// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::{velocity_to_slowness, GridData, Hypocenter, PatchGrid};
use crate::error::{Result, SweepError};
use crate::update_kernels::update_node;

/// Traversal order of one Gauss-Seidel pass over the patch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Rows ascending, columns ascending.
    RowsAscColsAsc,
    /// Rows descending, columns ascending.
    RowsDescColsAsc,
    /// Rows descending, columns descending.
    RowsDescColsDesc,
    /// Rows ascending, columns descending.
    RowsAscColsDesc,
}

impl SweepDirection {
    /// The four passes of one iteration, in the order they are applied.
    pub const ORDER: [SweepDirection; 4] = [
        SweepDirection::RowsAscColsAsc,
        SweepDirection::RowsDescColsAsc,
        SweepDirection::RowsDescColsDesc,
        SweepDirection::RowsAscColsDesc,
    ];

    fn rows_ascending(self) -> bool {
        matches!(
            self,
            SweepDirection::RowsAscColsAsc | SweepDirection::RowsAscColsDesc
        )
    }

    fn cols_ascending(self) -> bool {
        matches!(
            self,
            SweepDirection::RowsAscColsAsc | SweepDirection::RowsDescColsAsc
        )
    }
}

/// How the change between two iterations is reduced to a single residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidualNorm {
    /// Sum over all patches of the squared change.
    #[default]
    SumOfSquares,
    /// Sum of squared changes divided by the number of patches.
    MeanSquare,
}

/// Convergence settings for the sweep loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    /// Stop once the residual is at or below this value.
    pub tolerance: f64,
    /// Maximum number of four-pass iterations. `None` loops until converged.
    pub max_iterations: Option<usize>,
    /// Reduction applied to the per-patch squared changes.
    pub residual_norm: ResidualNorm,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            tolerance: 0.1,
            max_iterations: Some(1000),
            residual_norm: ResidualNorm::SumOfSquares,
        }
    }
}

impl SweepConfig {
    fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(SweepError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// Progress information passed to the optional callback after each iteration.
pub struct SweepProgress {
    /// Number of completed four-pass iterations.
    pub iteration: usize,
    /// Residual of the latest iteration.
    pub residual: f64,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    /// Number of four-pass iterations performed.
    pub iterations: usize,
    /// Residual of the last iteration.
    pub residual: f64,
    /// Tolerance the residual was compared against.
    pub tolerance: f64,
    /// Whether the residual reached the tolerance.
    pub converged: bool,
}

impl SweepReport {
    /// Turn a non-converged report into `SweepError::NotConverged`.
    pub fn ensure_converged(self) -> Result<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(SweepError::NotConverged {
                iterations: self.iterations,
                residual: self.residual,
                tolerance: self.tolerance,
            })
        }
    }
}

/// A Fast Sweeping Method solver for rupture onset times.
///
/// Repeats four directional Gauss-Seidel passes over the patch grid until the
/// change between iterations drops to the configured tolerance. Each solve
/// starts from a freshly seeded field, so repeated calls give the same result.
pub struct FastSweepSolver {
    grid: PatchGrid,
    hypocenter: Hypocenter,
    config: SweepConfig,
    previous: Vec<f64>,
    progress_callback: Option<Box<dyn Fn(SweepProgress) + Send + Sync>>,
}

impl FastSweepSolver {
    /// Create a new solver for the given grid and hypocenter, with default configuration.
    ///
    /// # Errors
    /// Returns an error if the hypocenter lies outside the grid.
    pub fn new(grid: PatchGrid, hypocenter: Hypocenter) -> Result<Self> {
        if !grid.contains(hypocenter.index()) {
            return Err(SweepError::InvalidHypocenter {
                row: hypocenter.row,
                col: hypocenter.col,
                shape: grid.shape(),
            });
        }
        let num_nodes = grid.num_nodes();
        let mut solver = FastSweepSolver {
            grid,
            hypocenter,
            config: SweepConfig::default(),
            previous: vec![0.0; num_nodes],
            progress_callback: None,
        };
        solver.initialize();
        Ok(solver)
    }

    /// Replace the whole configuration (builder method).
    ///
    /// # Errors
    /// Returns an error if the tolerance is not positive and finite.
    pub fn with_config(mut self, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Set the convergence tolerance (builder method). Default is 0.1.
    ///
    /// # Errors
    /// Returns an error if the tolerance is not positive and finite.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        let config = SweepConfig {
            tolerance,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Cap the number of iterations (builder method). Default is 1000.
    /// At least one iteration is always performed.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = Some(max_iterations);
        self
    }

    /// Remove the iteration cap (builder method).
    pub fn without_iteration_limit(mut self) -> Self {
        self.config.max_iterations = None;
        self
    }

    /// Set how the residual is reduced (builder method).
    pub fn with_residual_norm(mut self, residual_norm: ResidualNorm) -> Self {
        self.config.residual_norm = residual_norm;
        self
    }

    /// Set a callback invoked after every iteration (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(SweepProgress) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &PatchGrid {
        &self.grid
    }

    /// Consume the solver and return the grid with computed onset times.
    pub fn into_grid(self) -> PatchGrid {
        self.grid
    }

    /// The nucleation patch.
    pub fn hypocenter(&self) -> Hypocenter {
        self.hypocenter
    }

    /// The active configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Save the onset time grid to a file. Format is inferred from the extension.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        crate::io::save_grid(&self.grid, path.as_ref())
    }

    /// Mark every patch unreached and pin the hypocenter to zero.
    pub fn initialize(&mut self) {
        self.grid.reset();
        self.grid.set_t_init(self.hypocenter.index(), 0.0);
    }

    /// Run one iteration (the four directional passes) and return its residual.
    pub fn iterate(&mut self) -> f64 {
        self.previous.copy_from_slice(self.grid.onset_time());
        for direction in SweepDirection::ORDER {
            sweep_pass(&mut self.grid, direction);
        }
        sweep_residual(
            &self.previous,
            self.grid.onset_time(),
            self.config.residual_norm,
        )
    }

    /// Compute onset times from the hypocenter.
    ///
    /// Hitting the iteration cap is not an error here; the best-effort field stays
    /// in the grid and the report says `converged: false`.
    pub fn solve(&mut self) -> SweepReport {
        self.initialize();
        let start = Instant::now();
        let tolerance = self.config.tolerance;
        let mut iterations = 0;

        loop {
            let residual = self.iterate();
            iterations += 1;
            debug!(iteration = iterations, residual, "sweep iteration complete");

            if let Some(cb) = &self.progress_callback {
                cb(SweepProgress {
                    iteration: iterations,
                    residual,
                    elapsed: start.elapsed(),
                });
            }

            if residual <= tolerance {
                info!(
                    iterations,
                    residual,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "fast sweep converged"
                );
                return SweepReport {
                    iterations,
                    residual,
                    tolerance,
                    converged: true,
                };
            }

            if let Some(max_iterations) = self.config.max_iterations {
                if iterations >= max_iterations {
                    warn!(
                        iterations,
                        residual, tolerance, "fast sweep stopped at iteration limit"
                    );
                    return SweepReport {
                        iterations,
                        residual,
                        tolerance,
                        converged: false,
                    };
                }
            }
        }
    }
}

/// Apply the upwind update to every patch once, in the given traversal order.
///
/// Each new value is written back immediately, so later patches in the same
/// pass see it.
pub fn sweep_pass<G: GridData>(grid: &mut G, direction: SweepDirection) {
    let [rows, cols] = grid.shape();
    for r in 0..rows {
        let i = if direction.rows_ascending() {
            r
        } else {
            rows - 1 - r
        };
        for c in 0..cols {
            let j = if direction.cols_ascending() {
                c
            } else {
                cols - 1 - c
            };
            let t = update_node(grid, [i, j]);
            grid.update_t([i, j], t);
        }
    }
}

/// Reduce the change between two fields to a single residual.
///
/// Patches that are identical (including both unreached) contribute zero; a
/// patch reached for the first time contributes infinity.
pub fn sweep_residual(previous: &[f64], current: &[f64], norm: ResidualNorm) -> f64 {
    let sum: f64 = previous
        .iter()
        .zip(current)
        .map(|(&old, &new)| {
            if old == new {
                0.0
            } else {
                let d = new - old;
                d * d
            }
        })
        .sum();
    match norm {
        ResidualNorm::SumOfSquares => sum,
        ResidualNorm::MeanSquare => sum / previous.len().max(1) as f64,
    }
}

/// Compute rupture onset times for a slowness field with default settings.
///
/// `slowness` is row-major with `num_in_strike` rows and `num_in_dip` columns.
/// Returns a new field of the same length with zero at the hypocenter.
///
/// # Errors
/// Returns an error for invalid input or if the sweep does not converge within
/// the default iteration cap.
pub fn fast_sweep(
    slowness: &[f64],
    patch_size: f64,
    hypocenter: Hypocenter,
    num_in_strike: usize,
    num_in_dip: usize,
) -> Result<Vec<f64>> {
    let grid = PatchGrid::new([num_in_strike, num_in_dip], patch_size, slowness.to_vec())?;
    let mut solver = FastSweepSolver::new(grid, hypocenter)?;
    solver.solve().ensure_converged()?;
    Ok(solver.into_grid().into_onset_time())
}

/// Like [`fast_sweep`], but takes rupture velocities and uses their inverse as slowness.
///
/// # Errors
/// Returns an error if any velocity is not positive and finite, or for any error
/// [`fast_sweep`] reports.
pub fn fast_sweep_velocity(
    velocity: &[f64],
    patch_size: f64,
    hypocenter: Hypocenter,
    num_in_strike: usize,
    num_in_dip: usize,
) -> Result<Vec<f64>> {
    let slowness = velocity_to_slowness(velocity)?;
    fast_sweep(&slowness, patch_size, hypocenter, num_in_strike, num_in_dip)
}
