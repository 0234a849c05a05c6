//! Decoded frame and output types

use crate::highlights::common::Roi;
use crate::highlights::opposed::WhiteBalance;
use crate::highlights::sensor::SensorLayout;

/// A RAW frame normalized to `[0, 1]` against the sensor's black and white levels
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: usize,
    pub height: usize,
    /// `width * height * sensor.stride()` floats
    pub data: Vec<f32>,
    pub sensor: SensorLayout,
    /// As-shot coefficients, normalized to green
    pub wb: WhiteBalance,
    /// Sensor saturation in normalized units
    pub saturation: f32,
}

impl RawFrame {
    pub fn roi(&self) -> Roi {
        Roi::new(self.width, self.height)
    }
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}
