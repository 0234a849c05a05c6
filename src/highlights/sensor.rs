//! Sensor pattern oracle
//!
//! Resolves which primary a photosite carries for 2x2 Bayer and 6x6 X-Trans
//! mosaics, and describes the 4-channel linear layout used by sraw sensors.

use crate::highlights::common::Roi;

/// Packed descriptor value marking an X-Trans sensor.
pub const XTRANS_FILTERS: u32 = 9;
/// Packed descriptor value marking a non-mosaic (sraw) sensor.
pub const LINEAR_FILTERS: u32 = 0;

/// Floats per photosite in the sraw layout (RGB plus padding).
pub const LINEAR_STRIDE: usize = 4;

pub const RED: usize = 0;
pub const GREEN: usize = 1;
pub const BLUE: usize = 2;

/// Color filter array of a mosaic sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaPattern {
    /// 2x2 pattern packed as 2-bit fields, indexed by the low bits of row and column
    Bayer { filters: u32 },
    /// 6x6 pattern, indexed relative to the frame's region of interest
    XTrans { pattern: [[u8; 6]; 6] },
}

/// Photosite layout of a frame handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLayout {
    /// One float per photosite, one primary each
    Mosaic(CfaPattern),
    /// Four floats per photosite carrying all three primaries
    Linear,
}

impl CfaPattern {
    pub const fn bayer_rggb() -> Self {
        Self::Bayer { filters: 0x9494_9494 }
    }

    pub const fn bayer_bggr() -> Self {
        Self::Bayer { filters: 0x1616_1616 }
    }

    pub const fn bayer_grbg() -> Self {
        Self::Bayer { filters: 0x6161_6161 }
    }

    pub const fn bayer_gbrg() -> Self {
        Self::Bayer { filters: 0x4949_4949 }
    }

    /// Fujifilm's usual X-Trans layout.
    pub const fn xtrans_default() -> Self {
        Self::XTrans {
            pattern: [
                [1, 1, 0, 1, 1, 2],
                [1, 1, 2, 1, 1, 0],
                [2, 0, 1, 0, 2, 1],
                [1, 1, 2, 1, 1, 0],
                [1, 1, 0, 1, 1, 2],
                [0, 2, 1, 2, 0, 1],
            ],
        }
    }

    /// Primary (0 red, 1 green, 2 blue) at `(row, col)` of a frame with region `roi`.
    #[inline]
    pub fn color_at(&self, row: usize, col: usize, roi: &Roi) -> usize {
        match self {
            Self::Bayer { filters } => {
                let shift = (((row << 1) & 14) + (col & 1)) << 1;
                fold_fourth_color(((filters >> shift) & 3) as usize)
            }
            Self::XTrans { pattern } => {
                fold_fourth_color(usize::from(pattern[(row + roi.y) % 6][(col + roi.x) % 6]))
            }
        }
    }

    /// Half-size of the square neighborhood used for reference averages.
    pub fn refavg_radius(&self) -> usize {
        match self {
            Self::Bayer { .. } => 1,
            Self::XTrans { .. } => 2,
        }
    }

    /// Descriptor pair as the device kernels expect it.
    pub fn descriptor(&self) -> (u32, [[u8; 6]; 6]) {
        match self {
            Self::Bayer { filters } => (*filters, [[0; 6]; 6]),
            Self::XTrans { pattern } => (XTRANS_FILTERS, *pattern),
        }
    }
}

impl SensorLayout {
    /// Decodes a packed descriptor: `9` selects the X-Trans table, `0` the
    /// linear layout, anything else a packed Bayer pattern.
    pub fn from_descriptor(filters: u32, xtrans: &[[u8; 6]; 6]) -> Self {
        match filters {
            LINEAR_FILTERS => Self::Linear,
            XTRANS_FILTERS => Self::Mosaic(CfaPattern::XTrans { pattern: *xtrans }),
            filters => Self::Mosaic(CfaPattern::Bayer { filters }),
        }
    }

    pub fn stride(&self) -> usize {
        match self {
            Self::Mosaic(_) => 1,
            Self::Linear => LINEAR_STRIDE,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Linear)
    }
}

// Four-color descriptors mark the second green as 3.
#[inline]
fn fold_fourth_color(color: usize) -> usize {
    if color > BLUE { GREEN } else { color }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bayer_layouts() {
        let roi = Roi::new(4, 4);
        let cases = [
            (CfaPattern::bayer_rggb(), [RED, GREEN, GREEN, BLUE]),
            (CfaPattern::bayer_bggr(), [BLUE, GREEN, GREEN, RED]),
            (CfaPattern::bayer_grbg(), [GREEN, RED, BLUE, GREEN]),
            (CfaPattern::bayer_gbrg(), [GREEN, BLUE, RED, GREEN]),
        ];
        for (cfa, expected) in cases {
            let got = [
                cfa.color_at(0, 0, &roi),
                cfa.color_at(0, 1, &roi),
                cfa.color_at(1, 0, &roi),
                cfa.color_at(1, 1, &roi),
            ];
            assert_eq!(got, expected, "{:?}", cfa);
            // the pattern repeats every two photosites
            assert_eq!(cfa.color_at(6, 9, &roi), cfa.color_at(0, 1, &roi));
        }
    }

    #[test]
    fn test_xtrans_uses_roi_offset() {
        let cfa = CfaPattern::xtrans_default();
        let roi = Roi::new(12, 12);
        let shifted = Roi::new(12, 12).with_offset(1, 2);
        for row in 0..12 {
            for col in 0..12 {
                assert_eq!(cfa.color_at(row, col, &shifted), cfa.color_at(row + 2, col + 1, &roi));
            }
        }
        assert_eq!(cfa.color_at(0, 2, &roi), RED);
        assert_eq!(cfa.color_at(0, 5, &roi), BLUE);
    }

    #[test]
    fn test_xtrans_has_every_primary_in_each_3x3() {
        let cfa = CfaPattern::xtrans_default();
        let roi = Roi::new(6, 6);
        for top in [0, 3] {
            for left in [0, 3] {
                let mut seen = [false; 3];
                for row in top..top + 3 {
                    for col in left..left + 3 {
                        seen[cfa.color_at(row, col, &roi)] = true;
                    }
                }
                assert_eq!(seen, [true; 3]);
            }
        }
    }

    #[test]
    fn test_from_descriptor() {
        let table = [[2u8; 6]; 6];
        assert_eq!(SensorLayout::from_descriptor(0, &table), SensorLayout::Linear);
        assert_eq!(
            SensorLayout::from_descriptor(9, &table),
            SensorLayout::Mosaic(CfaPattern::XTrans { pattern: table })
        );
        assert_eq!(
            SensorLayout::from_descriptor(0x9494_9494, &table),
            SensorLayout::Mosaic(CfaPattern::bayer_rggb())
        );
        assert_eq!(SensorLayout::Linear.stride(), 4);
        assert_eq!(SensorLayout::Mosaic(CfaPattern::bayer_rggb()).stride(), 1);
    }

    #[test]
    fn test_fourth_color_folds_to_green() {
        // RGBG descriptor: the (1,1) site is tagged 3
        let cfa = CfaPattern::Bayer { filters: 0xd4d4_d4d4 };
        let roi = Roi::new(2, 2);
        assert_eq!(cfa.color_at(1, 1, &roi), GREEN);
    }
}
