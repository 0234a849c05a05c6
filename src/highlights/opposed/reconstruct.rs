//! Reconstruction of clipped photosites
//!
//! Clipped photosites become `max(value, refavg + chroma)`; everything else is
//! copied through after clamping negatives. The output region may be a crop of
//! the input region, offset by `(roi_out.x, roi_out.y)`.

use rayon::prelude::*;

use crate::highlights::common::{HighlightError, Result, Roi};
use crate::highlights::opposed::refavg::{refavg_linear, refavg_mosaic};
use crate::highlights::opposed::types::ClipThresholds;
use crate::highlights::sensor::{CfaPattern, LINEAR_STRIDE};

/// Parameters shared by every photosite of one reconstruction pass
#[derive(Debug, Clone, Copy)]
pub struct ReconstructParams {
    pub thresholds: ClipThresholds,
    pub chroma: [f32; 3],
    pub power: f32,
}

#[inline]
fn mosaic_photosite(
    input: &[f32],
    roi_in: &Roi,
    cfa: &CfaPattern,
    row: usize,
    col: usize,
    params: &ReconstructParams,
) -> f32 {
    let value = input[row * roi_in.width + col].max(0.0);
    let inside = row > 0 && col > 0 && row + 1 < roi_in.height && col + 1 < roi_in.width;
    if !inside {
        return value;
    }
    let color = cfa.color_at(row, col, roi_in);
    if params.thresholds.is_clipped(value, color) {
        let reference = refavg_mosaic(input, roi_in, cfa, row, col, params.power);
        value.max(reference + params.chroma[color])
    } else {
        value
    }
}

#[inline]
fn linear_pixel(pixel: &[f32], out: &mut [f32], params: &ReconstructParams) {
    for color in 0..3 {
        let value = pixel[color].max(0.0);
        out[color] = if params.thresholds.is_clipped(value, color) {
            value.max(refavg_linear(pixel, color, params.power) + params.chroma[color])
        } else {
            value
        };
    }
    out[3] = pixel[3];
}

/// Reconstructs a mosaic frame straight into the (possibly cropped) output.
pub fn reconstruct_mosaic_into(
    input: &[f32],
    roi_in: &Roi,
    output: &mut [f32],
    roi_out: &Roi,
    cfa: &CfaPattern,
    params: &ReconstructParams,
) {
    if output.is_empty() {
        return;
    }
    output
        .par_chunks_mut(roi_out.width)
        .enumerate()
        .for_each(|(row, line)| {
            let irow = row + roi_out.y;
            for (col, out) in line.iter_mut().enumerate() {
                let icol = col + roi_out.x;
                *out = if irow < roi_in.height && icol < roi_in.width {
                    mosaic_photosite(input, roi_in, cfa, irow, icol, params)
                } else {
                    0.0
                };
            }
        });
}

/// Reconstructs a 4-float-per-pixel sraw frame straight into the output.
pub fn reconstruct_linear_into(
    input: &[f32],
    roi_in: &Roi,
    output: &mut [f32],
    roi_out: &Roi,
    params: &ReconstructParams,
) {
    if output.is_empty() {
        return;
    }
    output
        .par_chunks_mut(roi_out.width * LINEAR_STRIDE)
        .enumerate()
        .for_each(|(row, line)| {
            let irow = row + roi_out.y;
            for (col, out) in line.chunks_exact_mut(LINEAR_STRIDE).enumerate() {
                let icol = col + roi_out.x;
                if irow < roi_in.height && icol < roi_in.width {
                    let idx = (irow * roi_in.width + icol) * LINEAR_STRIDE;
                    linear_pixel(&input[idx..idx + LINEAR_STRIDE], out, params);
                } else {
                    out.fill(0.0);
                }
            }
        });
}

/// Allocates a zeroed buffer of `len` floats, reporting failure instead of aborting.
pub fn try_alloc_frame(len: usize) -> Result<Vec<f32>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| HighlightError::AllocationFailed(len.saturating_mul(size_of::<f32>())))?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// Copies the output region out of a reconstructed input-sized buffer.
pub fn crop_into(full: &[f32], roi_in: &Roi, output: &mut [f32], roi_out: &Roi, stride: usize) {
    if output.is_empty() {
        return;
    }
    output
        .par_chunks_mut(roi_out.width * stride)
        .enumerate()
        .for_each(|(row, line)| {
            let irow = row + roi_out.y;
            for (col, out) in line.chunks_exact_mut(stride).enumerate() {
                let icol = col + roi_out.x;
                if irow < roi_in.height && icol < roi_in.width {
                    let idx = (irow * roi_in.width + icol) * stride;
                    out.copy_from_slice(&full[idx..idx + stride]);
                } else {
                    out.fill(0.0);
                }
            }
        });
}

/// Copies the input into the output region unchanged; used for frames too
/// small to reconstruct.
pub fn pass_through(input: &[f32], roi_in: &Roi, output: &mut [f32], roi_out: &Roi, stride: usize) {
    crop_into(input, roi_in, output, roi_out, stride);
}
