// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Rupture onset times on a fault patch grid using the Fast Sweeping Method (FSM).
//!
//! Given a per-patch slowness (inverse rupture velocity) field on a rectangular
//! grid of square patches and a hypocenter patch, this library solves the
//! eikonal equation |∇T| = s with T(hypocenter) = 0. The solver repeats four
//! directional Gauss-Seidel sweeps with a first-order upwind update until the
//! change between iterations falls below a tolerance.

#![warn(missing_docs)]

/// Patch grid data structures and traits.
pub mod core;
/// Error types for the library.
pub mod error;
/// File I/O for loading slowness fields and saving onset times.
pub mod io;
/// Fast sweeping solver implementation.
pub mod sweep;
/// Local eikonal update kernels.
pub mod update_kernels;

pub use crate::core::{Hypocenter, PatchGrid};
pub use crate::error::{Result, SweepError};
pub use crate::sweep::{
    fast_sweep, fast_sweep_velocity, FastSweepSolver, ResidualNorm, SweepConfig, SweepProgress,
    SweepReport,
};
