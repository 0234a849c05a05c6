//! Coarse clipping masks
//!
//! One coarse cell covers 3x3 photosites. The block holds six planes: three
//! raw planes marking cells with at least one clipped photosite of a primary,
//! then three dilated planes marking cells near such clipping.

use rayon::prelude::*;
use tracing::trace;

use crate::highlights::common::{HighlightError, Result, Roi};
use crate::highlights::opposed::types::{ClipThresholds, MASK_ALIGN};
use crate::highlights::sensor::{CfaPattern, LINEAR_STRIDE};

/// Coarse cells a dilated mask reaches out to.
pub const DILATE_RADIUS: usize = 3;

pub struct ClipMasks {
    /// Logical coarse width, `W / 3`
    mwidth: usize,
    /// Logical coarse height, `H / 3`
    mheight: usize,
    /// Row stride of a plane; one spare column for photosites past `3 * mwidth`
    stride: usize,
    /// Rows stored per plane; one spare row for the same reason
    rows: usize,
    /// Elements per plane, rounded up to `MASK_ALIGN`
    plane_size: usize,
    data: Vec<u8>,
}

#[cfg(test)]
thread_local! {
    static ALLOCATION_LIMIT: std::cell::Cell<usize> = const { std::cell::Cell::new(usize::MAX) };
}

/// Caps mask allocations made on the current thread until the guard drops.
#[cfg(test)]
pub(crate) fn limit_allocations(bytes: usize) -> AllocationLimit {
    ALLOCATION_LIMIT.with(|limit| limit.set(bytes));
    AllocationLimit
}

#[cfg(test)]
pub(crate) struct AllocationLimit;

#[cfg(test)]
impl Drop for AllocationLimit {
    fn drop(&mut self) {
        ALLOCATION_LIMIT.with(|limit| limit.set(usize::MAX));
    }
}

#[cfg(test)]
fn within_limit(bytes: usize) -> bool {
    bytes <= ALLOCATION_LIMIT.with(|limit| limit.get())
}

#[cfg(not(test))]
#[inline]
fn within_limit(_bytes: usize) -> bool {
    true
}

fn round_up(value: usize, align: usize) -> Option<usize> {
    value.checked_add(align - 1).map(|v| v / align * align)
}

impl ClipMasks {
    /// Allocates zeroed planes for a frame of `width` x `height` photosites.
    pub fn allocate(width: usize, height: usize) -> Result<Self> {
        let mwidth = width / 3;
        let mheight = height / 3;
        let stride = mwidth + 1;
        let rows = mheight + 1;

        let plane_size = stride
            .checked_mul(rows)
            .and_then(|cells| round_up(cells, MASK_ALIGN))
            .ok_or(HighlightError::AllocationFailed(usize::MAX))?;
        let total = plane_size
            .checked_mul(6)
            .ok_or(HighlightError::AllocationFailed(usize::MAX))?;

        if !within_limit(total) {
            return Err(HighlightError::AllocationFailed(total));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| HighlightError::AllocationFailed(total))?;
        data.resize(total, 0);

        trace!(mwidth, mheight, plane_size, "Allocated clip masks");
        Ok(Self {
            mwidth,
            mheight,
            stride,
            rows,
            plane_size,
            data,
        })
    }

    pub fn coarse_width(&self) -> usize {
        self.mwidth
    }

    pub fn coarse_height(&self) -> usize {
        self.mheight
    }

    pub fn plane_size(&self) -> usize {
        self.plane_size
    }

    /// Row stride shared by every plane.
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn cell(&self, row: usize, col: usize) -> usize {
        (row / 3) * self.stride + col / 3
    }

    /// Raw plane of primary `color`, `stride()` cells per row.
    pub fn raw(&self, color: usize) -> &[u8] {
        let start = color * self.plane_size;
        &self.data[start..start + self.plane_size]
    }

    /// Dilated plane of primary `color`, `stride()` cells per row.
    pub fn dilated(&self, color: usize) -> &[u8] {
        let start = (color + 3) * self.plane_size;
        &self.data[start..start + self.plane_size]
    }

    /// Whether photosite `(row, col)` lies near clipped data of primary `color`.
    #[inline]
    pub fn is_near_clipped(&self, color: usize, row: usize, col: usize) -> bool {
        self.data[(color + 3) * self.plane_size + self.cell(row, col)] != 0
    }

    /// Whether coarse cell `(mrow, mcol)` lies at least `DILATE_RADIUS` cells
    /// inside the coarse grid. Only these cells are dilated and sampled.
    #[inline]
    pub fn is_interior_cell(&self, mrow: usize, mcol: usize) -> bool {
        interior(mrow, mcol, self.mwidth, self.mheight)
    }

    /// Whether photosite `(row, col)` may contribute a chrominance sample of
    /// primary `color`: its coarse cell is interior and near clipped data.
    #[inline]
    pub fn is_sample_site(&self, color: usize, row: usize, col: usize) -> bool {
        self.is_interior_cell(row / 3, col / 3) && self.is_near_clipped(color, row, col)
    }

    /// Whether the coarse cell holding `(row, col)` has clipped data of primary `color`.
    #[inline]
    pub fn is_clipped_cell(&self, color: usize, row: usize, col: usize) -> bool {
        self.data[color * self.plane_size + self.cell(row, col)] != 0
    }

    /// Splits the raw planes into per-coarse-row chunks, one chunk per primary.
    fn raw_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = [&mut [u8]; 3]> {
        let used = self.stride * self.rows;
        let stride = self.stride;
        let plane_size = self.plane_size;
        let (red, rest) = self.data.split_at_mut(plane_size);
        let (green, rest) = rest.split_at_mut(plane_size);
        let blue = &mut rest[..plane_size];
        red[..used]
            .par_chunks_mut(stride)
            .zip(green[..used].par_chunks_mut(stride))
            .zip(blue[..used].par_chunks_mut(stride))
            .map(|((r, g), b)| [r, g, b])
    }

    /// Marks every coarse cell holding a clipped photosite of a mosaic frame,
    /// skipping a one-photosite border. Returns whether anything was clipped.
    pub fn build_mosaic(
        &mut self,
        input: &[f32],
        roi: &Roi,
        cfa: &CfaPattern,
        thresholds: &ClipThresholds,
    ) -> bool {
        let (width, height) = (roi.width, roi.height);
        if width < 3 || height < 3 {
            return false;
        }
        self.raw_rows_mut()
            .enumerate()
            .map(|(mrow, mut planes)| {
                let mut any = false;
                let first = (mrow * 3).max(1);
                let last = (mrow * 3 + 3).min(height - 1);
                for row in first..last {
                    let line = &input[row * width..(row + 1) * width];
                    for col in 1..width - 1 {
                        let color = cfa.color_at(row, col, roi);
                        if thresholds.is_clipped(line[col].max(0.0), color) {
                            planes[color][col / 3] = 1;
                            any = true;
                        }
                    }
                }
                any
            })
            .reduce(|| false, |a, b| a | b)
    }

    /// Same as [`build_mosaic`](Self::build_mosaic) for a 4-float-per-pixel sraw frame,
    /// where every pixel is tested on all three channels.
    pub fn build_linear(&mut self, input: &[f32], roi: &Roi, thresholds: &ClipThresholds) -> bool {
        let (width, height) = (roi.width, roi.height);
        if width < 3 || height < 3 {
            return false;
        }
        self.raw_rows_mut()
            .enumerate()
            .map(|(mrow, mut planes)| {
                let mut any = false;
                let first = (mrow * 3).max(1);
                let last = (mrow * 3 + 3).min(height - 1);
                for row in first..last {
                    for col in 1..width - 1 {
                        let idx = (row * width + col) * LINEAR_STRIDE;
                        for (color, plane) in planes.iter_mut().enumerate() {
                            if thresholds.is_clipped(input[idx + color], color) {
                                plane[col / 3] = 1;
                                any = true;
                            }
                        }
                    }
                }
                any
            })
            .reduce(|| false, |a, b| a | b)
    }

    /// Fills the dilated planes. Interior cells take the footprint dilation;
    /// the rest keep their raw value and are never sampled.
    pub fn dilate(&mut self) {
        let (mwidth, mheight) = (self.mwidth, self.mheight);
        let stride = self.stride;
        let used = stride * self.rows;
        let plane_size = self.plane_size;
        let (raw, dilated) = self.data.split_at_mut(3 * plane_size);

        for color in 0..3 {
            let input = &raw[color * plane_size..(color + 1) * plane_size];
            let output = &mut dilated[color * plane_size..color * plane_size + used];
            output
                .par_chunks_mut(stride)
                .enumerate()
                .for_each(|(mrow, line)| {
                    for (mcol, cell) in line.iter_mut().enumerate() {
                        let mx = mrow * stride + mcol;
                        *cell = if interior(mrow, mcol, mwidth, mheight) {
                            dilated_cell(input, mx, stride)
                        } else {
                            input[mx]
                        };
                    }
                });
        }
    }
}

#[inline]
fn interior(mrow: usize, mcol: usize, mwidth: usize, mheight: usize) -> bool {
    mrow >= DILATE_RADIUS
        && mrow + DILATE_RADIUS < mheight
        && mcol >= DILATE_RADIUS
        && mcol + DILATE_RADIUS < mwidth
}

/// Offsets `(drow, dcol)` of the dilation footprint: the 7x7 square around a
/// cell without the cell itself and without its four corners.
#[inline]
pub fn in_footprint(drow: isize, dcol: isize) -> bool {
    let r = DILATE_RADIUS as isize;
    drow.abs() <= r
        && dcol.abs() <= r
        && (drow, dcol) != (0, 0)
        && !(drow.abs() == r && dcol.abs() == r)
}

#[inline]
fn dilated_cell(plane: &[u8], mx: usize, stride: usize) -> u8 {
    if plane[mx] != 0 {
        return 1;
    }
    let r = DILATE_RADIUS as isize;
    for drow in -r..=r {
        let base = mx as isize + drow * stride as isize;
        for dcol in -r..=r {
            if in_footprint(drow, dcol) && plane[(base + dcol) as usize] != 0 {
                return 1;
            }
        }
    }
    0
}
