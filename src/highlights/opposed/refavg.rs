//! Opposed reference averages
//!
//! A clipped primary is estimated from the two other primaries around it. The
//! averages are combined in a cube-root-like space `x^(1/P)` and mapped back
//! with `x^P`, which keeps bright neighbors from dominating dark ones.

use crate::highlights::common::Roi;
use crate::highlights::sensor::CfaPattern;

#[inline]
fn opposed(means: [f32; 3], color: usize, power: f32) -> f32 {
    let opp = match color {
        0 => 0.5 * (means[1] + means[2]),
        1 => 0.5 * (means[0] + means[2]),
        _ => 0.5 * (means[0] + means[1]),
    };
    opp.powf(power)
}

/// Reference average for channel `color` of one sraw pixel (`pixel[0..3]` is RGB).
#[inline]
pub fn refavg_linear(pixel: &[f32], color: usize, power: f32) -> f32 {
    let inv = 1.0 / power;
    let means = [
        pixel[0].max(0.0).powf(inv),
        pixel[1].max(0.0).powf(inv),
        pixel[2].max(0.0).powf(inv),
    ];
    opposed(means, color, power)
}

/// Reference average for the photosite at `(row, col)` of a mosaic frame.
///
/// Averages every primary over the pattern's neighborhood (3x3 for Bayer,
/// 5x5 for X-Trans, cut at the frame edge), then combines the two primaries
/// the photosite does not carry.
pub fn refavg_mosaic(
    input: &[f32],
    roi: &Roi,
    cfa: &CfaPattern,
    row: usize,
    col: usize,
    power: f32,
) -> f32 {
    let radius = cfa.refavg_radius();
    let row_min = row.saturating_sub(radius);
    let row_max = (row + radius).min(roi.height - 1);
    let col_min = col.saturating_sub(radius);
    let col_max = (col + radius).min(roi.width - 1);

    let mut sum = [0.0f32; 3];
    let mut cnt = [0u32; 3];
    for r in row_min..=row_max {
        let line = &input[r * roi.width..(r + 1) * roi.width];
        for (c, &value) in line.iter().enumerate().take(col_max + 1).skip(col_min) {
            let color = cfa.color_at(r, c, roi);
            sum[color] += value.max(0.0);
            cnt[color] += 1;
        }
    }

    let inv = 1.0 / power;
    let mut means = [0.0f32; 3];
    for c in 0..3 {
        if cnt[c] > 0 {
            means[c] = (sum[c] / cnt[c] as f32).powf(inv);
        }
    }
    opposed(means, cfa.color_at(row, col, roi), power)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_linear_uses_other_channels() {
        let pixel = [1.0, 0.4, 0.4, 0.0];
        assert!(close(refavg_linear(&pixel, 0, 3.0), 0.4));

        let pixel = [0.125, 0.0, 1.0, 0.0];
        // cube roots 0.5 and 1.0, mean 0.75, cubed
        assert!(close(refavg_linear(&pixel, 1, 3.0), 0.421875));
    }

    #[test]
    fn test_linear_clamps_negative_channels() {
        let pixel = [0.9, -0.5, 0.216, 0.0];
        // cube roots 0.0 and 0.6, mean 0.3, cubed
        assert!(close(refavg_linear(&pixel, 0, 3.0), 0.027));
    }

    #[test]
    fn test_mosaic_bayer_flat_neighbors() {
        let roi = Roi::new(5, 5);
        let cfa = CfaPattern::bayer_rggb();
        let input: Vec<f32> = (0..25)
            .map(|i| {
                let (row, col) = (i / 5, i % 5);
                if cfa.color_at(row, col, &roi) == 0 { 1.0 } else { 0.3 }
            })
            .collect();
        // red at (2,2): greens and blues all 0.3
        assert!(close(refavg_mosaic(&input, &roi, &cfa, 2, 2, 3.0), 0.3));
        // corner red only sees its three neighbors
        assert!(close(refavg_mosaic(&input, &roi, &cfa, 0, 0, 3.0), 0.3));
    }

    #[test]
    fn test_mosaic_green_mixes_red_and_blue() {
        let roi = Roi::new(3, 3);
        let cfa = CfaPattern::bayer_rggb();
        // R G R / G B G / R G R, centre is blue; use (1,0) green instead
        let input = [0.125, 0.5, 0.125, 0.5, 1.0, 0.5, 0.125, 0.5, 0.125];
        // around (1,0): reds 0.125 (cube root 0.5), blue 1.0 (cube root 1.0)
        assert!(close(refavg_mosaic(&input, &roi, &cfa, 1, 0, 3.0), 0.421875));
    }

    #[test]
    fn test_mosaic_power_one_is_plain_mean() {
        let roi = Roi::new(3, 3);
        let cfa = CfaPattern::bayer_rggb();
        let input = [0.2, 0.4, 0.2, 0.4, 0.8, 0.4, 0.2, 0.4, 0.2];
        // blue centre: mean(red 0.2, green 0.4)
        assert!(close(refavg_mosaic(&input, &roi, &cfa, 1, 1, 1.0), 0.3));
    }
}
