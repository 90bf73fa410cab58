// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use eikonal_fsm::core::{Hypocenter, PatchGrid};
use eikonal_fsm::sweep::{FastSweepSolver, ResidualNorm};

fn make_solver(rows: usize, cols: usize, slowness: Vec<f64>) -> FastSweepSolver {
    let grid = PatchGrid::new([rows, cols], 1.0, slowness).unwrap();
    FastSweepSolver::new(grid, Hypocenter::new(rows / 2, cols / 3)).unwrap()
}

fn checkerboard(rows: usize, cols: usize, block: usize) -> Vec<f64> {
    let mut slowness = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            slowness[i * cols + j] = if (i / block + j / block) % 2 == 0 {
                1.0
            } else {
                2.0
            };
        }
    }
    slowness
}

/// Homogeneous fault grids of increasing size.
fn bench_grid_size_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("homogeneous");
    for &n in &[32, 64, 128, 256] {
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter_with_setup(
                || make_solver(n, n, vec![1.0; n * n]),
                |mut solver| {
                    black_box(solver.solve());
                    solver
                },
            );
        });
    }
    group.finish();
}

/// Heterogeneous slowness needs more iterations to settle.
fn bench_checkerboard(c: &mut Criterion) {
    let (rows, cols) = (128, 64);
    c.bench_function("checkerboard_128x64", |b| {
        b.iter_with_setup(
            || {
                make_solver(rows, cols, checkerboard(rows, cols, 8))
                    .with_tolerance(1e-8)
                    .unwrap()
                    .with_residual_norm(ResidualNorm::MeanSquare)
            },
            |mut solver| {
                black_box(solver.solve());
                solver
            },
        );
    });
}

criterion_group!(benches, bench_grid_size_scaling, bench_checkerboard);
criterion_main!(benches);
