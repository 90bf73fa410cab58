// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Result, SweepError};

/// Core patch-grid data access. Provides onset time and slowness field
/// access, grid geometry, and index conversion utilities.
///
/// Indices are `[row, col]`, where rows run along strike and columns run
/// along dip.
pub trait GridData {
    /// Get the onset time at the given index.
    fn get_t(&self, idx: [usize; 2]) -> f64;

    /// Get the slowness at the given index.
    fn get_s(&self, idx: [usize; 2]) -> f64;

    /// Lower the onset time if the new value is smaller.
    /// Returns true if the stored value changed.
    fn update_t(&mut self, idx: [usize; 2], val: f64) -> bool;

    /// Set the initial onset time (used for seeding the hypocenter).
    fn set_t_init(&mut self, idx: [usize; 2], val: f64);

    /// Get the grid shape `[num_in_strike, num_in_dip]`.
    fn shape(&self) -> [usize; 2];

    /// Get the edge length of one square patch.
    fn patch_size(&self) -> f64;

    /// Get the total number of patches in the grid.
    fn num_nodes(&self) -> usize;

    /// Convert a `[row, col]` index to a flat row-major index.
    fn nd_to_flat(&self, idx: [usize; 2]) -> usize;
}

/// A rectangular grid of square fault patches.
///
/// Stores the grid shape, patch size, slowness field, and onset time
/// solution, all in row-major order.
#[derive(Debug, Clone)]
pub struct PatchGrid {
    shape: [usize; 2],
    patch_size: f64,
    onset_time: Vec<f64>,
    slowness: Box<[f64]>,
}

impl PatchGrid {
    /// Create a new patch grid.
    ///
    /// # Parameters
    /// - `shape`: `[num_in_strike, num_in_dip]`, each must be >= 1
    /// - `patch_size`: Edge length of one square patch (must be positive and finite)
    /// - `slowness`: Slowness values in row-major order (must all be positive and finite)
    ///
    /// # Errors
    /// Returns an error if any parameter is invalid or if the slowness vector length
    /// does not match the number of patches.
    pub fn new(shape: [usize; 2], patch_size: f64, slowness: Vec<f64>) -> Result<Self> {
        if !patch_size.is_finite() || patch_size <= 0.0 {
            return Err(SweepError::InvalidPatchSize(patch_size));
        }

        for (axis, &size) in shape.iter().enumerate() {
            if size == 0 {
                return Err(SweepError::InvalidGridShape { axis, size });
            }
        }

        let num_nodes = match shape[0].checked_mul(shape[1]) {
            Some(n) if n == slowness.len() => n,
            _ => {
                return Err(SweepError::ShapeMismatch {
                    expected: shape.to_vec(),
                    got: vec![slowness.len()],
                })
            }
        };

        for (index, &value) in slowness.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SweepError::InvalidSlowness { index, value });
            }
        }

        Ok(PatchGrid {
            shape,
            patch_size,
            onset_time: vec![f64::INFINITY; num_nodes],
            slowness: slowness.into_boxed_slice(),
        })
    }

    /// Reset every onset time to the unreached sentinel (+infinity).
    pub fn reset(&mut self) {
        self.onset_time.fill(f64::INFINITY);
    }

    /// Get the onset time field in row-major order.
    pub fn onset_time(&self) -> &[f64] {
        &self.onset_time
    }

    /// Consume the grid and return the onset time field.
    pub fn into_onset_time(self) -> Vec<f64> {
        self.onset_time
    }

    /// Get a reference to the slowness field.
    pub fn slowness(&self) -> &[f64] {
        &self.slowness
    }

    /// Check whether `idx` lies inside the grid.
    pub fn contains(&self, idx: [usize; 2]) -> bool {
        idx[0] < self.shape[0] && idx[1] < self.shape[1]
    }
}

impl GridData for PatchGrid {
    fn get_t(&self, idx: [usize; 2]) -> f64 {
        self.onset_time[self.nd_to_flat(idx)]
    }

    fn get_s(&self, idx: [usize; 2]) -> f64 {
        self.slowness[self.nd_to_flat(idx)]
    }

    fn update_t(&mut self, idx: [usize; 2], val: f64) -> bool {
        let flat = self.nd_to_flat(idx);
        if val < self.onset_time[flat] {
            self.onset_time[flat] = val;
            true
        } else {
            false
        }
    }

    fn set_t_init(&mut self, idx: [usize; 2], val: f64) {
        let flat = self.nd_to_flat(idx);
        self.onset_time[flat] = val;
    }

    fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn patch_size(&self) -> f64 {
        self.patch_size
    }

    fn num_nodes(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    fn nd_to_flat(&self, idx: [usize; 2]) -> usize {
        idx[0] * self.shape[1] + idx[1]
    }
}

/// The rupture nucleation patch, where the onset time is fixed at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypocenter {
    /// Patch index along strike (grid row).
    pub row: usize,
    /// Patch index along dip (grid column).
    pub col: usize,
}

impl Hypocenter {
    /// Create a hypocenter from patch indices.
    pub fn new(row: usize, col: usize) -> Self {
        Hypocenter { row, col }
    }

    /// Map physical positions on the fault plane to the patch containing them.
    ///
    /// Positions are measured from the fault origin in the same length unit as
    /// `patch_size`. Patch `k` is centred at `(k + 0.5) * patch_size`; the index
    /// is the nearest centre, with ties rounded to even.
    ///
    /// # Errors
    /// Returns an error if a position is not finite or maps to a negative index.
    pub fn from_position(strike: f64, dip: f64, patch_size: f64) -> Result<Self> {
        if !patch_size.is_finite() || patch_size <= 0.0 {
            return Err(SweepError::InvalidPatchSize(patch_size));
        }
        let to_index = |pos: f64| -> Option<usize> {
            let k = ((pos - patch_size / 2.0) / patch_size).round_ties_even();
            if k.is_finite() && k >= 0.0 {
                Some(k as usize)
            } else {
                None
            }
        };
        match (to_index(strike), to_index(dip)) {
            (Some(row), Some(col)) => Ok(Hypocenter { row, col }),
            _ => Err(SweepError::InvalidPosition { strike, dip }),
        }
    }

    /// The `[row, col]` index of the hypocenter.
    pub fn index(&self) -> [usize; 2] {
        [self.row, self.col]
    }
}

/// Convert a rupture velocity field to slowness (element-wise 1/v).
pub fn velocity_to_slowness(velocity: &[f64]) -> Result<Vec<f64>> {
    let mut slowness = Vec::with_capacity(velocity.len());
    for (index, &v) in velocity.iter().enumerate() {
        if !v.is_finite() || v <= 0.0 {
            return Err(SweepError::InvalidVelocity { index, value: v });
        }
        slowness.push(1.0 / v);
    }
    Ok(slowness)
}
