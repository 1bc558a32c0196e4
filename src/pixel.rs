use crate::float::Float;
use smallvec::SmallVec;

/// One 4:2:2 sample: a luma value and either Cb (even pixels) or Cr (odd pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelSample {
    pub y: u16,
    pub cb_cr: u16,
}

impl PixelSample {
    pub const fn new(y: u16, cb_cr: u16) -> Self {
        Self { y, cb_cr }
    }
}

/// One sample per source, indexed by source number
pub type SourceSet = SmallVec<[PixelSample; 4]>;

/// 4:4:4 sample, every luma value with its own chroma pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct YCbCr444 {
    pub y: u16,
    pub cb: u16,
    pub cr: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Rgb {
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FloatRgb {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl FloatRgb {
    pub(crate) fn map(self, mut f: impl FnMut(Float) -> Float) -> Self {
        Self {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }

    pub(crate) fn zip(self, other: Self, mut f: impl FnMut(Float, Float) -> Float) -> Self {
        Self {
            r: f(self.r, other.r),
            g: f(self.g, other.g),
            b: f(self.b, other.b),
        }
    }
}
