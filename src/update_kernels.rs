// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::GridData;

/// Solve the discretized eikonal equation at a single patch.
///
/// Given the smaller neighbor onset time `a` along strike, `b` along dip, the
/// patch slowness `f` and patch size `h`:
///
/// - if `|a - b| >= f*h` the front arrives along one axis and the result is the
///   plane-wave update `min(a, b) + f*h`;
/// - otherwise the front arrives diagonally and the result is the larger root of
///   `(u-a)^2 + (u-b)^2 = (f*h)^2`, i.e. `(a + b + sqrt(2 f^2 h^2 - (a-b)^2)) / 2`.
///
/// The square-root argument is strictly positive in the second branch.
pub fn solve_local(a: f64, b: f64, f: f64, h: f64) -> f64 {
    // No upstream information on either axis
    if a.is_infinite() && b.is_infinite() {
        return f64::INFINITY;
    }

    let fh = f * h;
    let diff = a - b;
    if diff.abs() >= fh {
        a.min(b) + fh
    } else {
        (a + b + (2.0 * fh * fh - diff * diff).sqrt()) / 2.0
    }
}

/// Neighbor indices `(lo, hi)` along one axis, clamped to `[0, len - 1]`.
///
/// Edge patches use themselves in place of the missing neighbor.
#[inline]
fn clamped_neighbors(i: usize, len: usize) -> (usize, usize) {
    (i.saturating_sub(1), (i + 1).min(len - 1))
}

/// Compute the upwind onset-time candidate for a single patch.
///
/// Takes the smaller of the two strike neighbors and of the two dip neighbors
/// (with clamped edges), calls `solve_local`, and never returns more than the
/// current value at `idx`.
pub fn update_node<G: GridData>(grid: &G, idx: [usize; 2]) -> f64 {
    let shape = grid.shape();
    let [i, j] = idx;

    let (i_lo, i_hi) = clamped_neighbors(i, shape[0]);
    let (j_lo, j_hi) = clamped_neighbors(j, shape[1]);

    let a = grid.get_t([i_lo, j]).min(grid.get_t([i_hi, j]));
    let b = grid.get_t([i, j_lo]).min(grid.get_t([i, j_hi]));

    let candidate = solve_local(a, b, grid.get_s(idx), grid.patch_size());
    let current = grid.get_t(idx);
    if candidate < current {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PatchGrid;

    #[test]
    fn solve_local_diagonal_branch() {
        // Both neighbors at 0, f=1, h=1: u = sqrt(2)/2
        let u = solve_local(0.0, 0.0, 1.0, 1.0);
        assert!((u - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-10);

        // a=1, b=0, f=2, h=1: |a-b| < 2, u = (1 + sqrt(8 - 1)) / 2
        let u = solve_local(1.0, 0.0, 2.0, 1.0);
        assert!((u - (1.0 + 7.0_f64.sqrt()) / 2.0).abs() < 1e-10);
    }

    #[test]
    fn solve_local_axis_branch() {
        // a=0, b=100: plane wave from a
        let u = solve_local(0.0, 100.0, 1.0, 1.0);
        assert!((u - 1.0).abs() < 1e-10);

        // Boundary of the branch condition |a-b| == f*h takes the axis formula
        let u = solve_local(3.0, 2.0, 0.5, 2.0);
        assert!((u - 3.0).abs() < 1e-10);
    }

    #[test]
    fn solve_local_scales_with_patch_size() {
        let u = solve_local(f64::INFINITY, 4.0, 0.25, 8.0);
        assert!((u - 6.0).abs() < 1e-10);
    }

    #[test]
    fn solve_local_both_infinite() {
        let u = solve_local(f64::INFINITY, f64::INFINITY, 1.0, 1.0);
        assert!(u.is_infinite());
    }

    #[test]
    fn solve_local_one_infinite() {
        let u = solve_local(f64::INFINITY, 5.0, 1.0, 1.0);
        assert!((u - 6.0).abs() < 1e-10);
        let u = solve_local(5.0, f64::INFINITY, 1.0, 1.0);
        assert!((u - 6.0).abs() < 1e-10);
    }

    #[test]
    fn clamped_neighbors_at_edges() {
        assert_eq!(clamped_neighbors(0, 5), (0, 1));
        assert_eq!(clamped_neighbors(4, 5), (3, 4));
        assert_eq!(clamped_neighbors(2, 5), (1, 3));
        assert_eq!(clamped_neighbors(0, 1), (0, 0));
    }

    #[test]
    fn update_node_hypocenter_neighbors() {
        let mut grid = PatchGrid::new([3, 3], 1.0, vec![1.0; 9]).unwrap();
        grid.set_t_init([1, 1], 0.0);

        // Face neighbor: one axis sees the hypocenter, the other sees nothing
        let u = update_node(&grid, [0, 1]);
        assert!((u - 1.0).abs() < 1e-10);

        // Corner: no finite neighbor yet
        let u = update_node(&grid, [0, 0]);
        assert!(u.is_infinite());

        // Hypocenter keeps its zero
        assert_eq!(update_node(&grid, [1, 1]), 0.0);
    }

    #[test]
    fn update_node_never_increases() {
        let mut grid = PatchGrid::new([3, 3], 1.0, vec![1.0; 9]).unwrap();
        grid.set_t_init([1, 1], 0.0);
        grid.set_t_init([1, 2], 0.25);
        let u = update_node(&grid, [1, 2]);
        assert_eq!(u, 0.25);
    }

    #[test]
    fn update_node_uses_self_at_edge() {
        // Single row: the strike neighbors of every patch collapse onto itself
        let mut grid = PatchGrid::new([1, 4], 1.0, vec![1.0; 4]).unwrap();
        grid.set_t_init([0, 1], 0.0);
        grid.set_t_init([0, 2], 0.4);

        // a = t[0,2] (self), b = min(t[0,1], t[0,3]) = 0
        // candidate = (0.4 + sqrt(2 - 0.16)) / 2 > 0.4, so the current value stays
        let u = update_node(&grid, [0, 2]);
        assert!((u - 0.4).abs() < 1e-12);

        // With self unreached the update is a pure plane wave along dip
        grid.set_t_init([0, 2], f64::INFINITY);
        let u = update_node(&grid, [0, 2]);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_nan_produced() {
        let cases = [
            (0.0, 0.0, 1.0, 1.0),
            (1.0, 1.0, 1.0, 1.0),
            (f64::INFINITY, 0.0, 1.0, 1.0),
            (0.0, f64::INFINITY, 1.0, 1.0),
            (f64::INFINITY, f64::INFINITY, 1.0, 1.0),
            (0.0, 0.0, 0.001, 0.001),
            (0.0, 0.0, 1000.0, 1.0),
        ];
        for (a, b, f, h) in cases {
            let u = solve_local(a, b, f, h);
            assert!(!u.is_nan(), "NaN for solve_local({}, {}, {}, {})", a, b, f, h);
        }
    }
}
