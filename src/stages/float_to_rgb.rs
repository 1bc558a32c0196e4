use crate::float::FloatFormat;
use crate::pixel::{FloatRgb, Rgb};
use crate::stream::Transform;

/// Decode normalized floats back to integer codes, values above one clamp to full scale
#[derive(Debug, Clone, Copy)]
pub struct FloatToRgb {
    format: FloatFormat,
    bits: u8,
}

impl FloatToRgb {
    pub fn new(format: FloatFormat, bits_per_component: u8) -> Self {
        Self {
            format,
            bits: bits_per_component,
        }
    }
}

impl Transform for FloatToRgb {
    type Input = FloatRgb;
    type Output = Rgb;

    const LATENCY: usize = 2;

    fn transform(&self, rgb: &FloatRgb) -> Rgb {
        Rgb {
            r: self.format.to_code(rgb.r, self.bits),
            g: self.format.to_code(rgb.g, self.bits),
            b: self.format.to_code(rgb.b, self.bits),
        }
    }
}
