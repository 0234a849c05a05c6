//! Validity tag of a cached chrominance correction
//!
//! The tag fingerprints everything that invalidates a correction: sensor
//! pattern, effective white balance, saturation and the perceptual exponent.
//! It is a float in `[1, 2)` so it fits the fourth slot of the stored
//! correction; equal inputs give bit-equal tags on every platform.

use crate::highlights::opposed::types::WhiteBalance;
use crate::highlights::sensor::{CfaPattern, SensorLayout};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const ONE_BITS: u32 = 0x3f80_0000;

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

pub fn color_tag(sensor: &SensorLayout, wb: &WhiteBalance, saturation: f32, power: f32) -> f32 {
    let mut hasher = Fnv1a::new();
    match sensor {
        SensorLayout::Linear => hasher.write(&[0]),
        SensorLayout::Mosaic(CfaPattern::Bayer { filters }) => {
            hasher.write(&[1]);
            hasher.write(&filters.to_le_bytes());
        }
        SensorLayout::Mosaic(CfaPattern::XTrans { pattern }) => {
            hasher.write(&[2]);
            for row in pattern {
                hasher.write(row);
            }
        }
    }
    for coeff in wb.effective() {
        hasher.write(&coeff.to_le_bytes());
    }
    hasher.write(&saturation.to_le_bytes());
    hasher.write(&power.to_le_bytes());

    // top 23 bits become the mantissa of a float in [1, 2)
    f32::from_bits(ONE_BITS | (hasher.finish() >> 41) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlights::opposed::types::ChromaCorrection;

    fn rggb() -> SensorLayout {
        SensorLayout::Mosaic(CfaPattern::bayer_rggb())
    }

    #[test]
    fn test_tag_is_deterministic_and_in_range() {
        let wb = WhiteBalance::new([2.0, 1.0, 1.5]);
        let a = color_tag(&rggb(), &wb, 1.0, 3.0);
        let b = color_tag(&rggb(), &wb, 1.0, 3.0);
        assert_eq!(a.to_bits(), b.to_bits());
        assert!((1.0..2.0).contains(&a));
        assert!(!ChromaCorrection::default().matches(a));
    }

    #[test]
    fn test_tag_changes_with_every_input() {
        let wb = WhiteBalance::new([2.0, 1.0, 1.5]);
        let base = ChromaCorrection::new([0.0; 3], color_tag(&rggb(), &wb, 1.0, 3.0));

        let variants = [
            color_tag(&rggb(), &wb, 1.01, 3.0),
            color_tag(&rggb(), &WhiteBalance::new([2.0, 1.0, 1.6]), 1.0, 3.0),
            color_tag(&rggb(), &WhiteBalance::disabled(), 1.0, 3.0),
            color_tag(&SensorLayout::Mosaic(CfaPattern::bayer_bggr()), &wb, 1.0, 3.0),
            color_tag(&SensorLayout::Mosaic(CfaPattern::xtrans_default()), &wb, 1.0, 3.0),
            color_tag(&SensorLayout::Linear, &wb, 1.0, 3.0),
            color_tag(&rggb(), &wb, 1.0, 2.4),
        ];
        for tag in variants {
            assert!(!base.matches(tag), "tag {} collides with {}", tag, base.tag);
        }
    }

    #[test]
    fn test_disabled_white_balance_ignores_coefficients() {
        let mut off = WhiteBalance::new([2.0, 1.0, 1.5]);
        off.enabled = false;
        assert_eq!(
            color_tag(&rggb(), &off, 1.0, 3.0).to_bits(),
            color_tag(&rggb(), &WhiteBalance::disabled(), 1.0, 3.0).to_bits()
        );
    }
}
