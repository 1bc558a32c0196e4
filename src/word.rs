//! The wide word crossing from the system clock into the pixel clock domain

use crate::config::ConfigError;
use crate::pixel::{PixelSample, SourceSet};

/// `pack_factor` consecutive pixels of every source plus the timing signals they share
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedWord {
    pub hsync: bool,
    pub vsync: bool,
    pub de: bool,
    /// `pixels[i][source]` is sub-word `i`
    pub pixels: Vec<SourceSet>,
}

impl PackedWord {
    /// All signals low, all samples zero
    pub fn blank(layout: &WordLayout) -> Self {
        Self {
            hsync: false,
            vsync: false,
            de: false,
            pixels: vec![
                SourceSet::from_elem(PixelSample::default(), layout.sources);
                layout.pack_factor
            ],
        }
    }
}

/// Everything that can go wrong when converting a [`PackedWord`] to or from its wire bits
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("buffer holds {got} bytes, a packed word needs {expected}")]
    BufferTooShort { expected: usize, got: usize },

    #[error("word shape {got_pixels}x{got_sources} does not match layout {pixels}x{sources}")]
    ShapeMismatch {
        pixels: usize,
        sources: usize,
        got_pixels: usize,
        got_sources: usize,
    },
}

/// Describes the wire format of a [`PackedWord`]
///
/// Bits are packed LSB first: `hsync`, `vsync`, `de`, then for every source its `pack_factor`
/// samples, each sample being `y` followed by `cb_cr` with `bits_per_component` bits each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLayout {
    pack_factor: usize,
    sources: usize,
    bits_per_component: u8,
}

impl WordLayout {
    pub fn new(
        pack_factor: usize,
        sources: usize,
        bits_per_component: u8,
    ) -> Result<Self, ConfigError> {
        if !pack_factor.is_power_of_two() {
            return Err(ConfigError::PackFactorNotPowerOfTwo(pack_factor));
        }

        if sources == 0 {
            return Err(ConfigError::NoSources);
        }

        if !(8..=16).contains(&bits_per_component) {
            return Err(ConfigError::UnsupportedBitsPerComponent(bits_per_component));
        }

        Ok(Self {
            pack_factor,
            sources,
            bits_per_component,
        })
    }

    pub fn pack_factor(&self) -> usize {
        self.pack_factor
    }

    pub fn sources(&self) -> usize {
        self.sources
    }

    pub fn bits_per_component(&self) -> u8 {
        self.bits_per_component
    }

    pub fn width_bits(&self) -> usize {
        3 + self.sources * self.pack_factor * 2 * usize::from(self.bits_per_component)
    }

    pub fn byte_len(&self) -> usize {
        self.width_bits().div_ceil(8)
    }

    fn check_shape(&self, word: &PackedWord) -> Result<(), LayoutError> {
        let got_sources = word.pixels.first().map_or(0, |p| p.len());

        if word.pixels.len() != self.pack_factor
            || word.pixels.iter().any(|p| p.len() != self.sources)
        {
            return Err(LayoutError::ShapeMismatch {
                pixels: self.pack_factor,
                sources: self.sources,
                got_pixels: word.pixels.len(),
                got_sources,
            });
        }

        Ok(())
    }

    pub fn pack(&self, word: &PackedWord) -> Result<Vec<u8>, LayoutError> {
        self.check_shape(word)?;

        let mut writer = BitWriter::new(self.byte_len());
        let bits = u32::from(self.bits_per_component);

        writer.push(u32::from(word.hsync), 1);
        writer.push(u32::from(word.vsync), 1);
        writer.push(u32::from(word.de), 1);

        for source in 0..self.sources {
            for pixel in &word.pixels {
                writer.push(u32::from(pixel[source].y), bits);
                writer.push(u32::from(pixel[source].cb_cr), bits);
            }
        }

        Ok(writer.buf)
    }

    pub fn unpack(&self, buf: &[u8]) -> Result<PackedWord, LayoutError> {
        if buf.len() < self.byte_len() {
            return Err(LayoutError::BufferTooShort {
                expected: self.byte_len(),
                got: buf.len(),
            });
        }

        let mut reader = BitReader { buf, pos: 0 };
        let bits = u32::from(self.bits_per_component);

        let mut word = PackedWord::blank(self);
        word.hsync = reader.pull(1) != 0;
        word.vsync = reader.pull(1) != 0;
        word.de = reader.pull(1) != 0;

        for source in 0..self.sources {
            for pixel in &mut word.pixels {
                let y = reader.pull(bits) as u16;
                let cb_cr = reader.pull(bits) as u16;

                pixel[source] = PixelSample { y, cb_cr };
            }
        }

        Ok(word)
    }
}

struct BitWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0; len],
            pos: 0,
        }
    }

    fn push(&mut self, value: u32, bits: u32) {
        for i in 0..bits {
            if (value >> i) & 1 == 1 {
                self.buf[self.pos / 8] |= 1 << (self.pos % 8);
            }

            self.pos += 1;
        }
    }
}

struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn pull(&mut self, bits: u32) -> u32 {
        let mut value = 0;

        for i in 0..bits {
            let bit = (self.buf[self.pos / 8] >> (self.pos % 8)) & 1;
            value |= u32::from(bit) << i;
            self.pos += 1;
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn word() -> PackedWord {
        PackedWord {
            hsync: true,
            vsync: false,
            de: true,
            pixels: vec![
                smallvec![PixelSample::new(0x10, 0x80), PixelSample::new(0xeb, 0x11)],
                smallvec![PixelSample::new(0x7f, 0xf0), PixelSample::new(0x01, 0x02)],
            ],
        }
    }

    #[test]
    fn layout_dimensions() {
        let layout = WordLayout::new(2, 2, 8).unwrap();

        assert_eq!(layout.width_bits(), 3 + 2 * 2 * 16);
        assert_eq!(layout.byte_len(), 9);
    }

    #[test]
    fn control_bits_come_first() {
        let layout = WordLayout::new(2, 2, 8).unwrap();
        let buf = layout.pack(&word()).unwrap();

        assert_eq!(buf[0] & 0b111, 0b101);
        // First luma sample of source 0 starts at bit 3
        assert_eq!((u16::from(buf[0]) >> 3) | ((u16::from(buf[1]) & 0b111) << 5), 0x10);
    }

    #[test]
    fn unpack_restores_sources_in_order() {
        let layout = WordLayout::new(2, 2, 8).unwrap();
        let buf = layout.pack(&word()).unwrap();

        let unpacked = layout.unpack(&buf).unwrap();
        assert_eq!(unpacked, word());
        assert_eq!(unpacked.pixels[1][0], PixelSample::new(0x7f, 0xf0));
    }

    #[test]
    fn rejects_bad_input() {
        let layout = WordLayout::new(2, 2, 8).unwrap();

        assert!(matches!(
            layout.unpack(&[0; 4]),
            Err(LayoutError::BufferTooShort {
                expected: 9,
                got: 4
            })
        ));

        let mut short = word();
        short.pixels.pop();
        assert!(matches!(
            layout.pack(&short),
            Err(LayoutError::ShapeMismatch { got_pixels: 1, .. })
        ));

        assert!(matches!(
            WordLayout::new(3, 2, 8),
            Err(ConfigError::PackFactorNotPowerOfTwo(3))
        ));
        assert!(matches!(
            WordLayout::new(0, 2, 8),
            Err(ConfigError::PackFactorNotPowerOfTwo(0))
        ));
    }
}
