use crate::float::FloatFormat;
use crate::pixel::{FloatRgb, Rgb};
use crate::stream::Transform;

/// Encode integer RGB codes as normalized floats, `code / (2^bits - 1)`
#[derive(Debug, Clone, Copy)]
pub struct RgbToFloat {
    format: FloatFormat,
    bits: u8,
}

impl RgbToFloat {
    pub fn new(format: FloatFormat, bits_per_component: u8) -> Self {
        Self {
            format,
            bits: bits_per_component,
        }
    }
}

impl Transform for RgbToFloat {
    type Input = Rgb;
    type Output = FloatRgb;

    const LATENCY: usize = 2;

    fn transform(&self, rgb: &Rgb) -> FloatRgb {
        FloatRgb {
            r: self.format.from_code(rgb.r, self.bits),
            g: self.format.from_code(rgb.g, self.bits),
            b: self.format.from_code(rgb.b, self.bits),
        }
    }
}
