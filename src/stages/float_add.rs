use crate::float::FloatFormat;
use crate::pixel::FloatRgb;
use crate::stream::Transform;

/// Component wise sum of both mixer branches
#[derive(Debug, Clone, Copy)]
pub struct FloatAdd {
    format: FloatFormat,
}

impl FloatAdd {
    pub fn new(format: FloatFormat) -> Self {
        Self { format }
    }
}

impl Transform for FloatAdd {
    type Input = (FloatRgb, FloatRgb);
    type Output = FloatRgb;

    /// Align, add, normalize, round and pack
    const LATENCY: usize = 4;

    fn transform(&self, (a, b): &(FloatRgb, FloatRgb)) -> FloatRgb {
        a.zip(*b, |x, y| self.format.add(x, y))
    }
}
