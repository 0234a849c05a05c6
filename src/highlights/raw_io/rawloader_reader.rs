//! RAW frame reader implementation using the rawloader library.
//!
//! Decodes any format rawloader supports, subtracts the black level, scales
//! by the white level and derives the sensor layout from the decoder's CFA.

use std::io::Cursor;

use rawloader::{CFA, RawImageData};
use tracing::debug;

use crate::highlights::common::{HighlightError, Result};
use crate::highlights::opposed::WhiteBalance;
use crate::highlights::raw_io::reader::RawFrameReader;
use crate::highlights::raw_io::types::RawFrame;
use crate::highlights::sensor::{CfaPattern, SensorLayout};

/// RAW frame reader that uses the rawloader library for decoding.
pub struct RawLoaderReader;

/// Normalized value the sensor saturates at.
const NORMALIZED_WHITE: f32 = 1.0;

/// Below this the green coefficient is treated as missing.
const MIN_GREEN_COEFF: f32 = 1e-4;

/// Builds the engine's sensor layout from rawloader's CFA description.
///
/// Three components per pixel means an sraw frame. A 6x6 CFA is copied as an
/// X-Trans table; anything else is packed into the 8-row Bayer descriptor.
pub fn sensor_layout(cfa: &CFA, cpp: usize) -> Result<SensorLayout> {
    if cpp == 3 {
        return Ok(SensorLayout::Linear);
    }
    if cfa.width == 0 || cfa.height == 0 {
        return Err(HighlightError::DecodeError(format!(
            "no CFA pattern for a {cpp}-component image"
        )));
    }

    if cfa.width == 6 && cfa.height == 6 {
        let mut pattern = [[0u8; 6]; 6];
        for (row, line) in pattern.iter_mut().enumerate() {
            for (col, color) in line.iter_mut().enumerate() {
                *color = fold_color(cfa.color_at(row, col)) as u8;
            }
        }
        return Ok(SensorLayout::Mosaic(CfaPattern::XTrans { pattern }));
    }

    let mut filters = 0u32;
    for row in 0..8 {
        for col in 0..2 {
            let shift = (((row << 1) & 14) + (col & 1)) << 1;
            filters |= (fold_color(cfa.color_at(row, col)) as u32) << shift;
        }
    }
    Ok(SensorLayout::Mosaic(CfaPattern::Bayer { filters }))
}

// rawloader numbers the second green (or emerald) as 3
fn fold_color(color: usize) -> usize {
    if color > 2 { 1 } else { color }
}

fn white_balance(coeffs: [f32; 4]) -> WhiteBalance {
    let green = coeffs[1];
    if !green.is_finite() || green.abs() < MIN_GREEN_COEFF {
        return WhiteBalance::disabled();
    }
    let normalized = [coeffs[0] / green, 1.0, coeffs[2] / green];
    if normalized.iter().all(|c| c.is_finite() && *c > 0.0) {
        WhiteBalance::new(normalized)
    } else {
        WhiteBalance::disabled()
    }
}

// sraw pixels carry a fourth, unused float
fn pad_pixels(samples: &[f32], cpp: usize) -> Vec<f32> {
    samples
        .chunks_exact(cpp)
        .flat_map(|px| [px[0], px[1], px[2], 0.0])
        .collect()
}

impl RawFrameReader for RawLoaderReader {
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| HighlightError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;
        let cpp = decoded.cpp;
        let pattern = decoded.cfa.to_string();
        debug!(width, height, cpp, cfa = %pattern, "Decoded image");

        let sensor = sensor_layout(&decoded.cfa, cpp)?;

        let black = f32::from(decoded.blacklevels[0]);
        let white = f32::from(decoded.whitelevels[0]);
        let range = (white - black).max(1.0);

        // Integer data is scaled against the sensor levels, float data is already normalized
        let samples: Vec<f32> = match decoded.data {
            RawImageData::Integer(values) => values
                .iter()
                .map(|&v| (f32::from(v) - black) / range)
                .collect(),
            RawImageData::Float(values) => values,
        };

        let data = if sensor.is_linear() {
            pad_pixels(&samples, cpp)
        } else {
            samples
        };

        let expected = width * height * sensor.stride();
        if data.len() != expected {
            return Err(HighlightError::DecodeError(format!(
                "decoded {} samples, expected {expected}",
                data.len()
            )));
        }

        let wb = white_balance(decoded.wb_coeffs);
        debug!(black, white, wb = ?wb.coeffs, "Normalized RAW samples");

        Ok(RawFrame {
            width,
            height,
            data,
            sensor,
            wb,
            saturation: NORMALIZED_WHITE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlights::sensor::LINEAR_STRIDE;

    #[test]
    fn test_white_balance_normalized_to_green() {
        let wb = white_balance([2.0, 1.0, 1.5, f32::NAN]);
        assert!(wb.enabled);
        assert_eq!(wb.coeffs, [2.0, 1.0, 1.5]);

        let wb = white_balance([4.0, 2.0, 3.0, 0.0]);
        assert_eq!(wb.coeffs, [2.0, 1.0, 1.5]);
    }

    #[test]
    fn test_missing_white_balance_disables_it() {
        assert!(!white_balance([f32::NAN; 4]).enabled);
        assert!(!white_balance([1.0, 0.0, 1.0, 0.0]).enabled);
        assert!(!white_balance([-1.0, 1.0, 1.0, 0.0]).enabled);
    }

    #[test]
    fn test_fold_color() {
        assert_eq!(fold_color(0), 0);
        assert_eq!(fold_color(2), 2);
        assert_eq!(fold_color(3), 1);
    }

    #[test]
    fn test_linear_stride_padding() {
        let samples = [0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6];
        let padded = pad_pixels(&samples, 3);
        assert_eq!(padded.len(), 2 * LINEAR_STRIDE);
        assert_eq!(padded[4..8], [0.4, 0.5, 0.6, 0.0]);
    }
}
