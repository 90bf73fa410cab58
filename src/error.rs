// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver setup, I/O, or execution.
#[derive(Debug)]
pub enum SweepError {
    /// Grid shape is invalid (an axis has no patches).
    InvalidGridShape {
        /// The axis index (0 = strike, 1 = dip).
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Patch size is not positive and finite.
    InvalidPatchSize(f64),
    /// Slowness value is not positive and finite.
    InvalidSlowness {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Rupture velocity is not positive and finite.
    InvalidVelocity {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Hypocenter lies outside the patch grid.
    InvalidHypocenter {
        /// Row (along-strike) index of the hypocenter.
        row: usize,
        /// Column (along-dip) index of the hypocenter.
        col: usize,
        /// Grid shape `[num_in_strike, num_in_dip]`.
        shape: [usize; 2],
    },
    /// A physical position could not be mapped to a patch index.
    InvalidPosition {
        /// The position along strike.
        strike: f64,
        /// The position along dip.
        dip: f64,
    },
    /// Convergence tolerance is not positive and finite.
    InvalidTolerance(f64),
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// The sweep residual stayed above the tolerance for the whole iteration budget.
    NotConverged {
        /// Number of full four-direction iterations performed.
        iterations: usize,
        /// Residual after the last iteration.
        residual: f64,
        /// The tolerance that was not reached.
        tolerance: f64,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has size {} (must be >= 1)",
                    axis, size
                )
            }
            SweepError::InvalidPatchSize(h) => {
                write!(f, "invalid patch size: {} (must be positive and finite)", h)
            }
            SweepError::InvalidSlowness { index, value } => {
                write!(
                    f,
                    "invalid slowness at index {}: {} (must be positive and finite)",
                    index, value
                )
            }
            SweepError::InvalidVelocity { index, value } => {
                write!(
                    f,
                    "invalid velocity at index {}: {} (must be positive and finite)",
                    index, value
                )
            }
            SweepError::InvalidHypocenter { row, col, shape } => {
                write!(
                    f,
                    "invalid hypocenter [{}, {}]: outside grid of shape {:?}",
                    row, col, shape
                )
            }
            SweepError::InvalidPosition { strike, dip } => {
                write!(
                    f,
                    "invalid position (strike={}, dip={}): does not map to a patch",
                    strike, dip
                )
            }
            SweepError::InvalidTolerance(tol) => {
                write!(
                    f,
                    "invalid tolerance: {} (must be positive and finite)",
                    tol
                )
            }
            SweepError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            SweepError::NotConverged {
                iterations,
                residual,
                tolerance,
            } => {
                write!(
                    f,
                    "sweep did not converge after {} iterations: residual {} > tolerance {}",
                    iterations, residual, tolerance
                )
            }
            SweepError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            SweepError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            SweepError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            SweepError::IoError(e) => write!(f, "I/O error: {}", e),
            SweepError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SweepError {
    fn from(e: std::io::Error) -> Self {
        SweepError::IoError(e)
    }
}

/// Convenience type alias for Results with SweepError.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_grid_shape() {
        let e = SweepError::InvalidGridShape { axis: 1, size: 0 };
        assert_eq!(
            e.to_string(),
            "invalid grid shape: axis 1 has size 0 (must be >= 1)"
        );
    }

    #[test]
    fn display_invalid_patch_size() {
        let e = SweepError::InvalidPatchSize(-2.0);
        assert_eq!(
            e.to_string(),
            "invalid patch size: -2 (must be positive and finite)"
        );
    }

    #[test]
    fn display_invalid_slowness() {
        let e = SweepError::InvalidSlowness {
            index: 5,
            value: -0.5,
        };
        assert_eq!(
            e.to_string(),
            "invalid slowness at index 5: -0.5 (must be positive and finite)"
        );
    }

    #[test]
    fn display_invalid_hypocenter() {
        let e = SweepError::InvalidHypocenter {
            row: 3,
            col: 0,
            shape: [3, 4],
        };
        assert_eq!(
            e.to_string(),
            "invalid hypocenter [3, 0]: outside grid of shape [3, 4]"
        );
    }

    #[test]
    fn display_not_converged() {
        let e = SweepError::NotConverged {
            iterations: 10,
            residual: 2.5,
            tolerance: 0.1,
        };
        assert_eq!(
            e.to_string(),
            "sweep did not converge after 10 iterations: residual 2.5 > tolerance 0.1"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = SweepError::IoError(io_err);
        assert!(e.to_string().contains("file not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e: SweepError = io_err.into();
        assert!(matches!(e, SweepError::IoError(_)));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn display_mat_variable_not_found() {
        let e = SweepError::MatVariableNotFound {
            expected: "slowness".to_string(),
            available: vec!["velocity".to_string(), "grid".to_string()],
        };
        assert!(e.to_string().contains("slowness"));
        assert!(e.to_string().contains("velocity"));
    }
}
