//! Global chrominance estimation
//!
//! Unclipped photosites lying close to clipped data of the same primary show
//! how far that primary sits from its opposed reference average. The mean of
//! those deviations becomes the per-primary correction applied to clipped data.

use rayon::prelude::*;

use crate::highlights::common::Roi;
use crate::highlights::opposed::masks::ClipMasks;
use crate::highlights::opposed::refavg::{refavg_linear, refavg_mosaic};
use crate::highlights::opposed::types::ClipThresholds;
use crate::highlights::sensor::{CfaPattern, LINEAR_STRIDE};

/// Per-primary sums of deviations and their sample counts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChromaAccumulator {
    pub sum: [f64; 3],
    pub count: [u64; 3],
}

impl ChromaAccumulator {
    #[inline]
    pub fn add(&mut self, color: usize, deviation: f32) {
        self.sum[color] += f64::from(deviation);
        self.count[color] += 1;
    }

    pub fn merge(mut self, other: Self) -> Self {
        for c in 0..3 {
            self.sum[c] += other.sum[c];
            self.count[c] += other.count[c];
        }
        self
    }

    /// Mean deviation per primary; primaries without samples get zero.
    pub fn finish(&self) -> [f32; 3] {
        let mut chroma = [0.0f32; 3];
        for c in 0..3 {
            chroma[c] = (self.sum[c] / self.count[c].max(1) as f64) as f32;
        }
        chroma
    }
}

/// Accumulates deviations over a mosaic frame whose masks are already dilated.
pub fn accumulate_mosaic(
    input: &[f32],
    roi: &Roi,
    cfa: &CfaPattern,
    thresholds: &ClipThresholds,
    masks: &ClipMasks,
    power: f32,
) -> ChromaAccumulator {
    let width = roi.width;
    if width < 3 || roi.height < 3 {
        return ChromaAccumulator::default();
    }
    (1..roi.height - 1)
        .into_par_iter()
        .map(|row| {
            let mut acc = ChromaAccumulator::default();
            for col in 1..width - 1 {
                let color = cfa.color_at(row, col, roi);
                let value = input[row * width + col].max(0.0);
                if thresholds.is_sample(value, color) && masks.is_sample_site(color, row, col) {
                    acc.add(color, value - refavg_mosaic(input, roi, cfa, row, col, power));
                }
            }
            acc
        })
        .reduce(ChromaAccumulator::default, ChromaAccumulator::merge)
}

/// Accumulates deviations over a 4-float-per-pixel sraw frame.
pub fn accumulate_linear(
    input: &[f32],
    roi: &Roi,
    thresholds: &ClipThresholds,
    masks: &ClipMasks,
    power: f32,
) -> ChromaAccumulator {
    let width = roi.width;
    if width < 3 || roi.height < 3 {
        return ChromaAccumulator::default();
    }
    (1..roi.height - 1)
        .into_par_iter()
        .map(|row| {
            let mut acc = ChromaAccumulator::default();
            for col in 1..width - 1 {
                let idx = (row * width + col) * LINEAR_STRIDE;
                let pixel = &input[idx..idx + LINEAR_STRIDE];
                for color in 0..3 {
                    let value = pixel[color].max(0.0);
                    if thresholds.is_sample(value, color) && masks.is_sample_site(color, row, col) {
                        acc.add(color, value - refavg_linear(pixel, color, power));
                    }
                }
            }
            acc
        })
        .reduce(ChromaAccumulator::default, ChromaAccumulator::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_divides_by_at_least_one() {
        let mut acc = ChromaAccumulator::default();
        acc.add(0, 0.5);
        acc.add(0, 0.25);
        acc.add(2, -0.1);
        let chroma = acc.finish();
        assert!((chroma[0] - 0.375).abs() < 1e-7);
        assert_eq!(chroma[1], 0.0);
        assert!((chroma[2] + 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_tiny_frames_yield_no_samples() {
        use crate::highlights::opposed::types::WhiteBalance;

        let thresholds = ClipThresholds::new(1.0, &WhiteBalance::disabled());
        let masks = ClipMasks::allocate(2, 2).unwrap();
        let acc = accumulate_mosaic(&[0.5; 4], &Roi::new(2, 2), &CfaPattern::bayer_rggb(), &thresholds, &masks, 3.0);
        assert_eq!(acc, ChromaAccumulator::default());
        let acc = accumulate_linear(&[0.5; 4], &Roi::new(1, 1), &thresholds, &masks, 3.0);
        assert_eq!(acc, ChromaAccumulator::default());
    }

    #[test]
    fn test_merge_adds_sums_and_counts() {
        let mut a = ChromaAccumulator::default();
        a.add(1, 1.0);
        let mut b = ChromaAccumulator::default();
        b.add(1, 3.0);
        b.add(2, 2.0);
        let merged = a.merge(b);
        assert_eq!(merged.count, [0, 2, 1]);
        assert_eq!(merged.finish(), [0.0, 2.0, 2.0]);
    }
}
