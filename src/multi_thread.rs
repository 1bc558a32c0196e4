use crate::config::PipelineConfig;
use crate::control::MixSettings;
use crate::frame::{FrameError, RgbFrame, YCbCr422Frame};
use crate::reference::{LineMixer, check_inputs, mix_frame};
use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

/// [`mix_frame`] with the rows split across all cores
#[inline(never)]
#[tracing::instrument(level = "debug", skip_all, fields(sources = sources.len()))]
pub fn mix_frame_multi_thread(
    config: &PipelineConfig,
    settings: &MixSettings,
    sources: &[YCbCr422Frame],
) -> Result<RgbFrame, FrameError> {
    let (width, height) = check_inputs(config, settings, sources)?;

    let threads = num_cpus::get();

    if threads == 1 || width == 0 || height < 2 {
        return mix_frame(config, settings, sources);
    }

    let mixer = LineMixer::new(config, settings);
    let mut frame = RgbFrame::new(width, height);

    let rows_per_chunk = height.div_ceil(threads);

    frame
        .pixels_mut()
        .par_chunks_mut(rows_per_chunk * width)
        .enumerate()
        .for_each(|(chunk, pixels)| {
            for (i, row) in pixels.chunks_exact_mut(width).enumerate() {
                mixer.mix_line(sources, chunk * rows_per_chunk + i, row);
            }
        });

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelSample;

    #[test]
    fn matches_single_thread() {
        let config = PipelineConfig::default();
        let settings = config.initial_settings().unwrap();

        let sources = [
            YCbCr422Frame::from_fn(16, 33, |x, y| {
                PixelSample::new((x * 7 + y * 3) as u16 % 256, (x * 13) as u16 % 256)
            }),
            YCbCr422Frame::from_fn(16, 33, |x, y| PixelSample::new((x + y) as u16 % 256, 128)),
        ];

        assert_eq!(
            mix_frame_multi_thread(&config, &settings, &sources).unwrap(),
            mix_frame(&config, &settings, &sources).unwrap()
        );
    }
}
