use crate::color::ColorInfo;
use crate::color::mat_idxs::*;
use crate::float::max_code;
use crate::pixel::{Rgb, YCbCr444};
use crate::stream::Transform;

/// Fractional bits of the fixed point coefficients
pub const COEFFICIENT_BITS: u32 = 14;

/// Fixed point YCbCr to RGB matrix
///
/// Offsets are removed first, then the three products of every output are summed, rounded and
/// clamped into the code range. The sample range is folded into the coefficients.
#[derive(Debug, Clone)]
pub struct YCbCrToRgb {
    max: i64,
    y_offset: i64,
    chroma_offset: i64,
    /// Indexed as `[Y|U|V][R|G|B]`
    coefficients: [[i64; 3]; 3],
}

impl YCbCrToRgb {
    pub fn new(color: ColorInfo, bits_per_component: u8) -> Self {
        let range = color.range(bits_per_component);
        let mat = color.space.ycbcr_to_rgb_mat();
        let max = f64::from(max_code(bits_per_component));
        let one = f64::from(1u32 << COEFFICIENT_BITS);

        let spans = [range.y_span, range.chroma_span, range.chroma_span];

        let coefficients = [Y, U, V].map(|row| {
            [R, G, B].map(|col| (mat[row][col] * max / spans[row] * one).round() as i64)
        });

        Self {
            max: i64::from(max_code(bits_per_component)),
            y_offset: range.y_offset,
            chroma_offset: range.chroma_offset,
            coefficients,
        }
    }

    pub fn convert(&self, px: &YCbCr444) -> Rgb {
        let yuv = [
            i64::from(px.y) - self.y_offset,
            i64::from(px.cb) - self.chroma_offset,
            i64::from(px.cr) - self.chroma_offset,
        ];

        let half = 1i64 << (COEFFICIENT_BITS - 1);

        let [r, g, b] = [R, G, B].map(|col| {
            let sum: i64 = [Y, U, V]
                .iter()
                .map(|&row| self.coefficients[row][col] * yuv[row])
                .sum();

            ((sum + half) >> COEFFICIENT_BITS).clamp(0, self.max) as u16
        });

        Rgb { r, g, b }
    }
}

impl Transform for YCbCrToRgb {
    type Input = YCbCr444;
    type Output = Rgb;

    /// Offset, multiply, two adder levels with rounding and clamping
    const LATENCY: usize = 4;

    fn transform(&self, input: &YCbCr444) -> Rgb {
        self.convert(input)
    }
}
