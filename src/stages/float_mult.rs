use crate::control::GainFactor;
use crate::float::FloatFormat;
use crate::pixel::FloatRgb;
use crate::stream::Transform;

/// Scale every component by the branch gain
///
/// The gain is only changed between packets, see `Branch` in the mixer.
#[derive(Debug, Clone, Copy)]
pub struct FloatMult {
    format: FloatFormat,
    gain: GainFactor,
}

impl FloatMult {
    pub fn new(format: FloatFormat, gain: GainFactor) -> Self {
        Self { format, gain }
    }

    pub fn gain(&self) -> GainFactor {
        self.gain
    }

    pub fn set_gain(&mut self, gain: GainFactor) {
        self.gain = gain;
    }
}

impl Transform for FloatMult {
    type Input = FloatRgb;
    type Output = FloatRgb;

    /// Significand product, normalize, round and pack
    const LATENCY: usize = 3;

    fn transform(&self, rgb: &FloatRgb) -> FloatRgb {
        rgb.map(|c| self.format.mul(c, self.gain.float()))
    }
}
