pub(crate) mod space;

pub use space::ColorSpace;

use crate::float::max_code;
use crate::pixel::YCbCr444;
use serde::{Deserialize, Serialize};

/// Color description of the YCbCr input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorInfo {
    pub space: ColorSpace,

    /// If the samples use either full or standard range
    ///
    /// - full range (0 - 255)
    /// - standard range Y (16 - 235), U & V (16 - 240)
    #[serde(default)]
    pub full_range: bool,
}

pub(crate) mod mat_idxs {
    pub(crate) const Y: usize = 0;
    pub(crate) const U: usize = 1;
    pub(crate) const V: usize = 2;

    pub(crate) const R: usize = 0;
    pub(crate) const G: usize = 1;
    pub(crate) const B: usize = 2;
}

/// Code offsets and analog scale of a YCbCr sample at some bit depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Range {
    pub(crate) y_offset: i64,
    pub(crate) chroma_offset: i64,
    /// Code steps for analog Y `0.0..=1.0`
    pub(crate) y_span: f64,
    /// Code steps for analog U/V `-0.5..=0.5`
    pub(crate) chroma_span: f64,
}

impl ColorInfo {
    pub(crate) fn range(&self, bits: u8) -> Range {
        let max = f64::from(max_code(bits));
        let chroma_offset = 1i64 << (bits - 1);

        if self.full_range {
            Range {
                y_offset: 0,
                chroma_offset,
                y_span: max,
                chroma_span: max,
            }
        } else {
            let scale = f64::from(1u32 << (bits - 8));

            Range {
                y_offset: 16 << (bits - 8),
                chroma_offset,
                y_span: 219.0 * scale,
                chroma_span: 224.0 * scale,
            }
        }
    }

    /// Quantize analog RGB (`0.0..=1.0`) into a YCbCr sample
    pub fn rgb_to_ycbcr(&self, rgb: [f64; 3], bits: u8) -> YCbCr444 {
        let range = self.range(bits);
        let [y, u, v] = self.space.rgb_to_ycbcr(rgb.map(|c| c.clamp(0.0, 1.0)));
        let max = f64::from(max_code(bits));

        let quantize = |offset: i64, span: f64, value: f64| {
            (offset as f64 + value * span).round().clamp(0.0, max) as u16
        };

        YCbCr444 {
            y: quantize(range.y_offset, range.y_span, y),
            cb: quantize(range.chroma_offset, range.chroma_span, u),
            cr: quantize(range.chroma_offset, range.chroma_span, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_range_levels() {
        let color = ColorInfo {
            space: ColorSpace::BT601,
            full_range: false,
        };

        assert_eq!(
            color.rgb_to_ycbcr([0.0; 3], 8),
            YCbCr444 {
                y: 16,
                cb: 128,
                cr: 128
            }
        );
        assert_eq!(color.rgb_to_ycbcr([1.0; 3], 8).y, 235);
        assert_eq!(color.rgb_to_ycbcr([1.0; 3], 10).y, 940);
        assert_eq!(color.rgb_to_ycbcr([0.0, 0.0, 1.0], 8).cb, 240);
    }

    #[test]
    fn full_range_levels() {
        let color = ColorInfo {
            space: ColorSpace::BT709,
            full_range: true,
        };

        assert_eq!(color.rgb_to_ycbcr([1.0; 3], 8).y, 255);
        assert_eq!(color.rgb_to_ycbcr([0.0; 3], 8).cb, 128);
    }
}
