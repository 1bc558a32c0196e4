use crate::clock::ClockSource;
use crate::config::{ConfigError, PipelineConfig};
use crate::control::{ControlHandle, MixSettings, Synchronizer};
use crate::fifo::WordSource;
use crate::framer::PacketFramer;
use crate::mixer::Mixer;
use crate::pixel::{Rgb, SourceSet};
use crate::stages::FloatToRgb;
use crate::stream::{Pipelined, Stage, Token};
use crate::timing::{TimingAligner, TimingSignal};
use crate::unpack::StreamUnpacker;

/// Everything leaving the pipeline on one pixel clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelOut {
    pub timing: TimingSignal,
    pub rgb: Rgb,
    /// A processed pixel is present, always coincides with `timing.data_enable` in steady state
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Pixel clocks while the clock was locked
    pub cycles: u64,
    pub words: u64,
    pub underflows: u64,
}

/// Processing stages behind the unpacker, rebuilt on every reset
struct Datapath {
    framer: PacketFramer<SourceSet>,
    mixer: Mixer,
    decoder: Pipelined<FloatToRgb>,
    aligner: TimingAligner,
}

impl Datapath {
    fn new(config: &PipelineConfig, initial: MixSettings) -> Result<Self, ConfigError> {
        let framer = PacketFramer::<SourceSet>::new();
        let mixer = Mixer::new(config, initial)?;
        let decoder = Pipelined::new(FloatToRgb::new(config.float, config.bits_per_component));

        let depth = framer.latency() + mixer.latency() + decoder.latency();

        Ok(Self {
            framer,
            mixer,
            decoder,
            aligner: TimingAligner::new(depth),
        })
    }
}

/// Wires unpacker, framer, mixer and decoder into the complete pixel clock pipeline
///
/// The timing signals of every word enter the [`TimingAligner`] in the cycle its pixel leaves the
/// unpacker, they come out together with the mixed pixel.
pub struct Driver<C> {
    config: PipelineConfig,
    clock: C,
    control: ControlHandle,
    sync: Synchronizer<MixSettings>,
    unpacker: StreamUnpacker,
    path: Datapath,
    in_reset: bool,
    cycles: u64,
}

impl<C: ClockSource> Driver<C> {
    pub fn new(config: &PipelineConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let initial = config.initial_settings()?;
        let path = Datapath::new(config, initial)?;

        tracing::debug!(
            pack_factor = config.pack_factor,
            sources = config.sources,
            latency = path.aligner.depth(),
            pixel_clock = clock.pixel_clock(),
            "pipeline built"
        );

        Ok(Self {
            config: *config,
            control: ControlHandle::new(initial, config.sources, config.float),
            sync: Synchronizer::new(initial),
            unpacker: StreamUnpacker::new(config.layout()?),
            path,
            in_reset: false,
            clock,
            cycles: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle for register writes from the system domain
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// Pixel clocks from a word leaving the buffer to its first pixel leaving the pipeline
    pub fn latency(&self) -> usize {
        self.path.aligner.depth()
    }

    pub fn stats(&self) -> DriverStats {
        let unpack = self.unpacker.stats();

        DriverStats {
            cycles: self.cycles,
            words: unpack.words,
            underflows: unpack.underflows,
        }
    }

    /// Clear every stage, the registers keep their contents
    fn reset(&mut self) -> Result<(), ConfigError> {
        let settings = self.control.settings();

        self.path = Datapath::new(&self.config, settings)?;
        self.sync = Synchronizer::new(settings);
        self.unpacker = StreamUnpacker::new(self.config.layout()?);

        Ok(())
    }

    /// One pixel clock
    pub fn clock(&mut self, src: &mut dyn WordSource) -> PixelOut {
        if !self.clock.locked() {
            if !self.in_reset {
                tracing::warn!("pixel clock lost lock, holding pipeline in reset");
                self.in_reset = true;
            }

            return PixelOut::default();
        }

        if self.in_reset {
            // Rebuilding only repeats the construction that already succeeded in `new`
            if let Err(e) = self.reset() {
                tracing::error!("failed to reset pipeline: {e}");
                return PixelOut::default();
            }

            tracing::debug!("pixel clock locked, leaving reset");
            self.in_reset = false;
        }

        self.cycles += 1;

        let settings = self.sync.clock(self.control.settings());
        let path = &mut self.path;

        // Output is never stalled, readiness still travels backwards through every stage
        let decoder_ready = path.decoder.sink_ready(true);
        let mixer_ready = path.mixer.sink_ready(decoder_ready);
        let framer_ready = path.framer.sink_ready(mixer_ready);

        let unpacked = self.unpacker.clock(src, framer_ready);
        let timing = path.aligner.clock(unpacked.timing);

        let framed = path.framer.clock(
            Token {
                valid: unpacked.timing.data_enable,
                sop: false,
                eop: false,
                payload: unpacked.samples,
            },
            mixer_ready,
        );
        let mixed = path.mixer.clock(framed, &settings, decoder_ready);
        let decoded = path.decoder.clock(mixed, true);

        PixelOut {
            timing,
            rgb: decoded.payload,
            valid: decoded.valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::pixel::PixelSample;
    use crate::word::PackedWord;
    use std::collections::VecDeque;
    use std::sync::Arc;

    fn active_word(config: &PipelineConfig) -> PackedWord {
        PackedWord {
            hsync: false,
            vsync: false,
            de: true,
            pixels: vec![
                SourceSet::from_elem(PixelSample::new(235, 128), config.sources);
                config.pack_factor
            ],
        }
    }

    #[test]
    fn default_latency() {
        let clock = FixedClock::new(FixedClock::VGA_HZ);
        let driver = Driver::new(&PipelineConfig::default(), clock).unwrap();
        assert_eq!(driver.latency(), 18);
    }

    #[test]
    fn unlocked_clock_holds_reset() {
        let config = PipelineConfig::default();
        let clock = Arc::new(FixedClock::unlocked(FixedClock::VGA_HZ));
        let mut driver = Driver::new(&config, clock.clone()).unwrap();

        let mut src: VecDeque<_> = [active_word(&config)].into();

        for _ in 0..10 {
            assert_eq!(driver.clock(&mut src), PixelOut::default());
        }
        assert_eq!(src.len(), 1);
        assert_eq!(driver.stats().cycles, 0);

        clock.set_locked(true);
        driver.clock(&mut src);
        driver.clock(&mut src);
        assert!(src.is_empty());
        assert_eq!(driver.stats().words, 1);
    }

    #[test]
    fn timing_leaves_with_pixel() {
        let config = PipelineConfig::default();
        let mut driver = Driver::new(&config, FixedClock::new(FixedClock::VGA_HZ)).unwrap();

        let mut src = VecDeque::new();
        src.push_back(active_word(&config));

        let out: Vec<PixelOut> = (0..40).map(|_| driver.clock(&mut src)).collect();

        for (cycle, px) in out.iter().enumerate() {
            let expected = (18..20).contains(&cycle);

            assert_eq!(px.valid, expected, "cycle {cycle}");
            assert_eq!(px.timing.data_enable, expected, "cycle {cycle}");
        }

        assert_eq!(out[18].rgb, Rgb::new(255, 255, 255));
        assert_eq!(driver.stats().underflows, 19);
    }
}
