//! Untimed model of the pipeline
//!
//! Runs the same stage transforms line by line without any clocking, the timed pipeline must
//! produce exactly the same active pixels.

use crate::config::PipelineConfig;
use crate::control::{MIXED_SOURCES, MixSettings};
use crate::frame::{FrameError, RgbFrame, YCbCr422Frame, check_frames};
use crate::pixel::{FloatRgb, PixelSample, Rgb};
use crate::stages::{FloatAdd, FloatMult, FloatToRgb, RgbToFloat, YCbCrToRgb, upsample_line};
use crate::stream::Transform;

pub(crate) struct LineMixer {
    bits: u8,
    select: [usize; MIXED_SOURCES],
    csc: YCbCrToRgb,
    encoder: RgbToFloat,
    mults: [FloatMult; MIXED_SOURCES],
    adder: FloatAdd,
    decoder: FloatToRgb,
}

impl LineMixer {
    pub(crate) fn new(config: &PipelineConfig, settings: &MixSettings) -> Self {
        let bits = config.bits_per_component;

        Self {
            bits,
            select: settings.select,
            csc: YCbCrToRgb::new(config.color, bits),
            encoder: RgbToFloat::new(config.float, bits),
            mults: settings.gain.map(|gain| FloatMult::new(config.float, gain)),
            adder: FloatAdd::new(config.float),
            decoder: FloatToRgb::new(config.float, bits),
        }
    }

    pub(crate) fn mix_line(&self, sources: &[YCbCr422Frame], y: usize, out: &mut [Rgb]) {
        let [a, b] = [0, 1].map(|i| self.branch(sources[self.select[i]].row(y), i));

        for ((out, a), b) in out.iter_mut().zip(a).zip(b) {
            let sum = self.adder.transform(&(a, b));
            *out = self.decoder.transform(&sum);
        }
    }

    fn branch(&self, line: &[PixelSample], branch: usize) -> Vec<FloatRgb> {
        upsample_line(line, self.bits)
            .iter()
            .map(|px| {
                let rgb = self.csc.transform(px);
                let encoded = self.encoder.transform(&rgb);
                self.mults[branch].transform(&encoded)
            })
            .collect()
    }
}

pub(crate) fn check_inputs(
    config: &PipelineConfig,
    settings: &MixSettings,
    sources: &[YCbCr422Frame],
) -> Result<(usize, usize), FrameError> {
    config.validate()?;

    for index in settings.select {
        crate::config::check_source(index, config.sources)?;
    }

    let dimensions = sources
        .first()
        .map(|f| (f.width(), f.height()))
        .unwrap_or_default();

    check_frames(sources, config.sources, dimensions)?;

    Ok(dimensions)
}

/// Mix one frame, `sources[i]` is source `i`
#[tracing::instrument(level = "debug", skip_all, fields(sources = sources.len()))]
pub fn mix_frame(
    config: &PipelineConfig,
    settings: &MixSettings,
    sources: &[YCbCr422Frame],
) -> Result<RgbFrame, FrameError> {
    let (width, height) = check_inputs(config, settings, sources)?;

    let mixer = LineMixer::new(config, settings);
    let mut frame = RgbFrame::new(width, height);

    if width == 0 {
        return Ok(frame);
    }

    for (y, row) in frame.pixels_mut().chunks_exact_mut(width).enumerate() {
        mixer.mix_line(sources, y, row);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::GainFactor;
    use crate::float::FloatFormat;

    fn settings(select: [usize; 2], gain: [f64; 2]) -> MixSettings {
        MixSettings {
            select,
            gain: gain.map(|g| GainFactor::from_f64(FloatFormat::BINARY16, g).unwrap()),
        }
    }

    #[test]
    fn identity_gain_reproduces_source() {
        let config = PipelineConfig::default();
        let source = YCbCr422Frame::from_fn(6, 2, |x, y| {
            PixelSample::new(16 + (x * 30 + y) as u16, 90 + x as u16 * 10)
        });
        let other = YCbCr422Frame::from_fn(6, 2, |_, _| PixelSample::new(200, 60));

        let csc = YCbCrToRgb::new(config.color, 8);
        let sources = [source.clone(), other];
        let mixed = mix_frame(&config, &settings([0, 1], [1.0, 0.0]), &sources).unwrap();

        for y in 0..2 {
            let expected: Vec<Rgb> = upsample_line(source.row(y), 8)
                .iter()
                .map(|px| csc.convert(px))
                .collect();
            assert_eq!(mixed.row(y), expected);
        }

        let swapped = mix_frame(&config, &settings([1, 0], [0.0, 1.0]), &sources).unwrap();
        assert_eq!(swapped, mixed);
    }

    #[test]
    fn rejects_bad_inputs() {
        let config = PipelineConfig::default();
        let frame = YCbCr422Frame::from_fn(2, 2, |_, _| PixelSample::default());

        assert!(matches!(
            mix_frame(&config, &settings([0, 1], [0.5, 0.5]), &[frame.clone()]),
            Err(FrameError::SourceCount { .. })
        ));
        assert!(matches!(
            mix_frame(&config, &settings([0, 3], [0.5, 0.5]), &[frame.clone(), frame]),
            Err(FrameError::Config(_))
        ));
    }
}
