//! Processing stages between the framer and the output
//!
//! ```text
//! upsampler -> csc -> encoder -> mult \
//!                                      add -> decoder
//! upsampler -> csc -> encoder -> mult /
//! ```

mod chroma;
mod float_add;
mod float_mult;
mod float_to_rgb;
mod rgb_to_float;
mod ycbcr_to_rgb;

pub use chroma::{ChromaUpsampler, upsample_line};
pub use float_add::FloatAdd;
pub use float_mult::FloatMult;
pub use float_to_rgb::FloatToRgb;
pub use rgb_to_float::RgbToFloat;
pub use ycbcr_to_rgb::{COEFFICIENT_BITS, YCbCrToRgb};
