// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, ArrayD, IxDyn, ShapeBuilder};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use tracing::debug;

use crate::core::{velocity_to_slowness, GridData, PatchGrid};
use crate::error::{Result, SweepError};

/// MAT variable name used when saving onset times.
pub const ONSET_TIME_VAR: &str = "onset_time";

/// Supported file formats for field I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(SweepError::UnsupportedFileFormat(ext.to_string())),
        None => Err(SweepError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Load a per-patch field from a .npy file.
///
/// Accepts a 2D array of shape `[num_in_strike, num_in_dip]` or a flat vector of
/// the same total length; f32 data is promoted to f64.
pub fn load_npy_field(path: &Path, shape: [usize; 2]) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path)?;
    let arr: ArrayD<f64> = match ArrayD::<f64>::read_npy(bytes.as_slice()) {
        Ok(a) => a,
        // Only a dtype mismatch falls through to the f32 reader
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let arr32 = ArrayD::<f32>::read_npy(bytes.as_slice())
                .map_err(|e| SweepError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
        Err(e) => return Err(SweepError::Other(format!("npy read error: {}", e))),
    };

    let got: Vec<usize> = arr.shape().to_vec();
    let flat_ok = shape[0].checked_mul(shape[1]).is_some_and(|n| got == [n]);
    if got != shape && !flat_ok {
        return Err(SweepError::ShapeMismatch {
            expected: shape.to_vec(),
            got,
        });
    }

    // Fortran-order files must be relaid to row-major first
    Ok(arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Save a row-major field of shape `[num_in_strike, num_in_dip]` to a .npy file.
pub fn save_npy_field(data: &[f64], shape: [usize; 2], path: &Path) -> Result<()> {
    let arr = Array2::from_shape_vec((shape[0], shape[1]), data.to_vec())
        .map_err(|e| SweepError::Other(format!("shape error: {}", e)))?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| SweepError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

/// Load a per-patch field stored under `variable_name` in a .mat file.
///
/// MAT data is column-major; the stored matrix may be `[rows, cols]` or its
/// transpose. The result is always row-major `[num_in_strike, num_in_dip]`.
pub fn load_mat_field(path: &Path, variable_name: &str, shape: [usize; 2]) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| SweepError::Other(format!("MAT parse error: {}", e)))?;

    let available: Vec<String> = mat.arrays().iter().map(|a| a.name().to_string()).collect();
    let array =
        mat.find_by_name(variable_name)
            .ok_or_else(|| SweepError::MatVariableNotFound {
                expected: variable_name.to_string(),
                available,
            })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => real.clone(),
        matfile::NumericData::Single { real, imag: _ } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(SweepError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    let mat_shape: Vec<usize> = array.size().to_vec();
    let transposed = [shape[1], shape[0]];
    let same = mat_shape == shape;
    let swapped = mat_shape == transposed;
    if (!same && !swapped) || shape[0].checked_mul(shape[1]) != Some(data.len()) {
        return Err(SweepError::ShapeMismatch {
            expected: shape.to_vec(),
            got: mat_shape,
        });
    }

    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| SweepError::Other(format!("shape error: {}", e)))?;
    let row_major = if same {
        arr.as_standard_layout().to_owned().into_raw_vec()
    } else {
        arr.t().as_standard_layout().to_owned().into_raw_vec()
    };
    Ok(row_major)
}

/// Save a row-major field to a Level 5 .mat file as a `[rows, cols]` double matrix.
pub fn save_mat_field(data: &[f64], shape: [usize; 2], path: &Path, var_name: &str) -> Result<()> {
    let arr = Array2::from_shape_vec((shape[0], shape[1]), data.to_vec())
        .map_err(|e| SweepError::Other(format!("shape error: {}", e)))?;
    // Column-major element order is the row-major order of the transpose
    let col_major: Vec<f64> = arr.t().as_standard_layout().to_owned().into_raw_vec();
    write_mat_level5(path, var_name, &shape, &col_major)
}

/// Minimal MAT-file Level 5 writer for a single real f64 matrix.
///
/// The `matfile` crate only reads, so the writer is kept here. Layout: a 128-byte
/// header, then one uncompressed miMATRIX element holding array flags,
/// dimensions, name and real part, each sub-element padded to 8 bytes.
fn write_mat_level5(path: &Path, var_name: &str, dimensions: &[usize], data: &[f64]) -> Result<()> {
    const MI_INT8: u32 = 1;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;

    let padded = |n: u32| n.div_ceil(8) * 8;

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // Header: 116 bytes text, 8 bytes subsystem offset, version, endian marker
    let desc = b"MATLAB 5.0 MAT-file, created by eikonal-fsm";
    let mut header_text = [b' '; 116];
    header_text[..desc.len()].copy_from_slice(desc);
    w.write_all(&header_text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    let dims_size = (dimensions.len() * 4) as u32;
    let name_bytes = var_name.as_bytes();
    let name_size = name_bytes.len() as u32;
    let real_size = (data.len() * 8) as u32;

    let matrix_size = 16 + (8 + padded(dims_size)) + (8 + padded(name_size)) + (8 + real_size);
    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&matrix_size.to_le_bytes())?;

    // Array flags
    w.write_all(&MI_UINT32.to_le_bytes())?;
    w.write_all(&8u32.to_le_bytes())?;
    w.write_all(&MX_DOUBLE_CLASS.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;

    // Dimensions
    w.write_all(&MI_INT32.to_le_bytes())?;
    w.write_all(&dims_size.to_le_bytes())?;
    for &d in dimensions {
        w.write_all(&(d as i32).to_le_bytes())?;
    }
    w.write_all(&vec![0u8; (padded(dims_size) - dims_size) as usize])?;

    // Name
    w.write_all(&MI_INT8.to_le_bytes())?;
    w.write_all(&name_size.to_le_bytes())?;
    w.write_all(name_bytes)?;
    w.write_all(&vec![0u8; (padded(name_size) - name_size) as usize])?;

    // Real part (f64 data is already 8-byte aligned)
    w.write_all(&MI_DOUBLE.to_le_bytes())?;
    w.write_all(&real_size.to_le_bytes())?;
    for &val in data {
        w.write_all(&val.to_le_bytes())?;
    }

    w.flush()?;
    Ok(())
}

/// Save the grid's onset times to a file, inferring format from extension.
pub fn save_grid(grid: &PatchGrid, path: &Path) -> Result<()> {
    let format = infer_format(path)?;
    debug!(path = %path.display(), ?format, "saving onset times");
    match format {
        FileFormat::Npy => save_npy_field(grid.onset_time(), grid.shape(), path),
        FileFormat::Mat => save_mat_field(grid.onset_time(), grid.shape(), path, ONSET_TIME_VAR),
    }
}

/// Load a slowness field from a file, inferring format from extension.
pub fn load_slowness(path: &Path, shape: [usize; 2]) -> Result<Vec<f64>> {
    match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, shape),
        FileFormat::Mat => load_mat_field(path, "slowness", shape),
    }
}

/// Load a rupture velocity field from a file and convert to slowness.
pub fn load_velocity_as_slowness(path: &Path, shape: [usize; 2]) -> Result<Vec<f64>> {
    let velocity = match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, shape)?,
        FileFormat::Mat => load_mat_field(path, "velocity", shape)?,
    };
    velocity_to_slowness(&velocity)
}
