//! Whole frames on both ends of the pipeline
//!
//! [`FrameWriter`] rasterizes source frames into the packed words the pixel clock domain reads,
//! [`FrameCapture`] collects the active pixels leaving the [`Driver`] back into a frame.

use crate::clock::ClockSource;
use crate::color::ColorInfo;
use crate::config::ConfigError;
use crate::driver::{Driver, PixelOut};
use crate::pixel::{PixelSample, Rgb, SourceSet};
use crate::timing::VideoTiming;
use crate::word::{PackedWord, WordLayout};
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("expected {expected} source frames, got {got}")]
    SourceCount { expected: usize, got: usize },

    #[error("frame is {got:?}, expected {expected:?}")]
    Dimensions {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("horizontal timing must be a multiple of the pack factor {pack_factor}")]
    TimingNotAligned { pack_factor: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 4:2:2 source frame, even pixels carry Cb and odd pixels Cr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YCbCr422Frame {
    width: usize,
    height: usize,
    samples: Vec<PixelSample>,
}

impl YCbCr422Frame {
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> PixelSample,
    ) -> Self {
        let samples = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();

        Self {
            width,
            height,
            samples,
        }
    }

    /// Quantize an analog RGB image, chroma of every pixel pair is averaged
    pub fn from_rgb(
        width: usize,
        height: usize,
        color: ColorInfo,
        bits_per_component: u8,
        mut f: impl FnMut(usize, usize) -> [f64; 3],
    ) -> Self {
        let mut samples = Vec::with_capacity(width * height);

        for y in 0..height {
            let line: Vec<_> = (0..width)
                .map(|x| color.rgb_to_ycbcr(f(x, y), bits_per_component))
                .collect();

            for (x, px) in line.iter().enumerate() {
                let pair = &line[x & !1..(x | 1).min(width - 1) + 1];

                let chroma: Vec<u32> = pair
                    .iter()
                    .map(|p| u32::from(if x % 2 == 0 { p.cb } else { p.cr }))
                    .collect();
                let sum: u32 = chroma.iter().sum();
                let n = chroma.len() as u32;

                samples.push(PixelSample::new(px.y, ((sum + n / 2) / n) as u16));
            }
        }

        Self {
            width,
            height,
            samples,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> PixelSample {
        self.samples[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[PixelSample] {
        &self.samples[y * self.width..(y + 1) * self.width]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RgbFrame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[Rgb] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Interleaved 8 bit RGB, deeper codes keep their most significant bits
    pub fn to_rgb8(&self, bits_per_component: u8) -> Vec<u8> {
        let shift = bits_per_component.saturating_sub(8);

        self.pixels
            .iter()
            .flat_map(|px| [px.r, px.g, px.b])
            .map(|c| (c >> shift) as u8)
            .collect()
    }
}

/// Rasterizes source frames into packed words
#[derive(Debug, Clone, Copy)]
pub struct FrameWriter {
    layout: WordLayout,
    timing: VideoTiming,
}

impl FrameWriter {
    /// Every horizontal interval must be a whole number of words, so sync and data enable never
    /// change inside a word
    pub fn new(layout: WordLayout, timing: VideoTiming) -> Result<Self, FrameError> {
        let pack_factor = layout.pack_factor();

        let intervals = [
            timing.h_active,
            timing.h_front_porch,
            timing.h_sync,
            timing.h_back_porch,
        ];

        if intervals.iter().any(|i| i % pack_factor != 0) {
            return Err(FrameError::TimingNotAligned { pack_factor });
        }

        Ok(Self { layout, timing })
    }

    pub fn timing(&self) -> &VideoTiming {
        &self.timing
    }

    pub fn layout(&self) -> &WordLayout {
        &self.layout
    }

    pub fn words_per_frame(&self) -> usize {
        self.timing.h_total() / self.layout.pack_factor() * self.timing.v_total()
    }

    pub(crate) fn check_sources(&self, sources: &[YCbCr422Frame]) -> Result<(), FrameError> {
        check_frames(
            sources,
            self.layout.sources(),
            (self.timing.h_active, self.timing.v_active),
        )
    }

    /// All words of one frame in raster order, `sources[i]` becomes source `i`
    #[tracing::instrument(level = "debug", skip_all, fields(words = self.words_per_frame()))]
    pub fn words(&self, sources: &[YCbCr422Frame]) -> Result<Vec<PackedWord>, FrameError> {
        self.check_sources(sources)?;

        let pack_factor = self.layout.pack_factor();
        let mut words = Vec::with_capacity(self.words_per_frame());

        for y in 0..self.timing.v_total() {
            for x in (0..self.timing.h_total()).step_by(pack_factor) {
                let signal = self.timing.signal_at(x, y);

                let pixels = (x..x + pack_factor)
                    .map(|x| {
                        sources
                            .iter()
                            .map(|frame| {
                                if signal.data_enable {
                                    frame.get(x, y)
                                } else {
                                    PixelSample::default()
                                }
                            })
                            .collect::<SourceSet>()
                    })
                    .collect();

                words.push(PackedWord {
                    hsync: signal.hsync,
                    vsync: signal.vsync,
                    de: signal.data_enable,
                    pixels,
                });
            }
        }

        Ok(words)
    }
}

pub(crate) fn check_frames(
    frames: &[YCbCr422Frame],
    expected_count: usize,
    expected: (usize, usize),
) -> Result<(), FrameError> {
    if frames.len() != expected_count {
        return Err(FrameError::SourceCount {
            expected: expected_count,
            got: frames.len(),
        });
    }

    for frame in frames {
        let got = (frame.width, frame.height);

        if got != expected {
            return Err(FrameError::Dimensions { expected, got });
        }
    }

    Ok(())
}

/// Collects the active pixels of one frame from the pipeline output
#[derive(Debug, Clone)]
pub struct FrameCapture {
    frame: RgbFrame,
    captured: usize,
    misaligned: u64,
}

impl FrameCapture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: RgbFrame::new(width, height),
            captured: 0,
            misaligned: 0,
        }
    }

    pub fn push(&mut self, out: &PixelOut) {
        if out.valid != out.timing.data_enable {
            self.misaligned += 1;
        }

        if !out.timing.data_enable {
            return;
        }

        if let Some(px) = self.frame.pixels.get_mut(self.captured) {
            *px = out.rgb;
        }

        self.captured += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.captured >= self.frame.pixels.len()
    }

    /// Clocks where the pixel valid flag and the delayed data enable disagreed
    pub fn misaligned(&self) -> u64 {
        self.misaligned
    }

    pub fn frame(&self) -> &RgbFrame {
        &self.frame
    }

    pub fn into_frame(self) -> RgbFrame {
        self.frame
    }
}

/// Feed one frame through `driver` and capture the result
///
/// Blank words are appended until the last pixel left the pipeline.
#[tracing::instrument(
    skip_all,
    fields(width = writer.timing().h_active, height = writer.timing().v_active)
)]
pub fn render_frame<C: ClockSource>(
    driver: &mut Driver<C>,
    writer: &FrameWriter,
    sources: &[YCbCr422Frame],
) -> Result<FrameCapture, FrameError> {
    let layout = writer.layout();
    let mut words: VecDeque<PackedWord> = writer.words(sources)?.into();

    let flush = driver.latency().div_ceil(layout.pack_factor());
    words.extend((0..flush).map(|_| PackedWord::blank(layout)));

    let cycles = words.len() * layout.pack_factor();
    let mut capture = FrameCapture::new(writer.timing().h_active, writer.timing().v_active);

    for _ in 0..cycles {
        let out = driver.clock(&mut words);
        capture.push(&out);
    }

    if capture.misaligned() > 0 {
        tracing::warn!(misaligned = capture.misaligned(), "output valid and data enable disagreed");
    }

    Ok(capture)
}
