use crate::config::{ConfigError, PipelineConfig};
use crate::control::{GainFactor, MIXED_SOURCES, MixSettings};
use crate::pixel::{FloatRgb, PixelSample, SourceSet};
use crate::stages::{ChromaUpsampler, FloatAdd, FloatMult, RgbToFloat, YCbCrToRgb};
use crate::stream::{Pipelined, Stage, Token, join};
use std::collections::VecDeque;

/// Per source processing up to and including the gain
///
/// Gains take effect at packet starts. The mixer queues the gain it latched with every packet and
/// the branch loads it into the multiplier right when that packet's first pixel enters it, so
/// packets still in flight keep the gain they were latched with.
pub struct Branch {
    upsampler: ChromaUpsampler,
    csc: Pipelined<YCbCrToRgb>,
    encoder: Pipelined<RgbToFloat>,
    mult: Pipelined<FloatMult>,
    pending_gains: VecDeque<GainFactor>,
}

impl Branch {
    pub fn new(config: &PipelineConfig, gain: GainFactor) -> Self {
        let bits = config.bits_per_component;

        Self {
            upsampler: ChromaUpsampler::new(bits),
            csc: Pipelined::new(YCbCrToRgb::new(config.color, bits)),
            encoder: Pipelined::new(RgbToFloat::new(config.float, bits)),
            mult: Pipelined::new(FloatMult::new(config.float, gain)),
            pending_gains: VecDeque::new(),
        }
    }

    pub fn latency(&self) -> usize {
        self.upsampler.latency() + self.csc.latency() + self.encoder.latency() + self.mult.latency()
    }

    pub fn source(&self) -> Token<FloatRgb> {
        self.mult.source()
    }

    pub fn sink_ready(&self, source_ready: bool) -> bool {
        let mult = self.mult.sink_ready(source_ready);
        let encoder = self.encoder.sink_ready(mult);
        let csc = self.csc.sink_ready(encoder);

        self.upsampler.sink_ready(csc)
    }

    /// Gain currently loaded into the multiplier
    pub fn gain(&self) -> GainFactor {
        self.mult.inner().gain()
    }

    fn clock(
        &mut self,
        sink: Token<PixelSample>,
        packet_gain: Option<GainFactor>,
        source_ready: bool,
    ) -> Token<FloatRgb> {
        let mult_ready = self.mult.sink_ready(source_ready);
        let encoder_ready = self.encoder.sink_ready(mult_ready);
        let csc_ready = self.csc.sink_ready(encoder_ready);

        if let Some(gain) = packet_gain {
            self.pending_gains.push_back(gain);
        }

        let upsampled = self.upsampler.clock(sink, csc_ready);
        let rgb = self.csc.clock(upsampled, encoder_ready);
        let encoded = self.encoder.clock(rgb, mult_ready);

        if encoded.starts_packet() && mult_ready {
            if let Some(gain) = self.pending_gains.pop_front() {
                self.mult.inner_mut().set_gain(gain);
            }
        }

        self.mult.clock(encoded, source_ready)
    }
}

/// Both branches must deliver matching pixels into the join in the same cycle
pub fn check_join_latency(left: usize, right: usize) -> Result<(), ConfigError> {
    if left != right {
        return Err(ConfigError::BranchLatencyMismatch { left, right });
    }

    Ok(())
}

/// Two branch mixer, `out = gain[0] * src[select[0]] + gain[1] * src[select[1]]`
///
/// Source selection and gains are latched from the offered settings only on a valid start of
/// packet, so a line is always mixed with one consistent configuration.
pub struct Mixer {
    branches: [Branch; MIXED_SOURCES],
    adder: Pipelined<FloatAdd>,
    active: MixSettings,
}

impl Mixer {
    pub fn new(config: &PipelineConfig, initial: MixSettings) -> Result<Self, ConfigError> {
        let branches = [0, 1].map(|i| Branch::new(config, initial.gain[i]));
        check_join_latency(branches[0].latency(), branches[1].latency())?;

        Ok(Self {
            branches,
            adder: Pipelined::new(FloatAdd::new(config.float)),
            active: initial,
        })
    }

    pub fn latency(&self) -> usize {
        self.branches[0].latency() + self.adder.latency()
    }

    /// Settings latched with the most recent packet
    pub fn active(&self) -> &MixSettings {
        &self.active
    }

    pub fn branches(&self) -> &[Branch; MIXED_SOURCES] {
        &self.branches
    }

    pub fn source(&self) -> Token<FloatRgb> {
        self.adder.source()
    }

    /// Downstream acknowledge of both branches, only given together
    fn branch_ack(&self, source_ready: bool) -> bool {
        let joined = join(&self.branches[0].source(), &self.branches[1].source());

        self.adder.sink_ready(source_ready) && joined.valid
    }

    pub fn sink_ready(&self, source_ready: bool) -> bool {
        let ack = self.branch_ack(source_ready);

        self.branches.iter().all(|b| b.sink_ready(ack))
    }

    pub fn clock(
        &mut self,
        sink: Token<SourceSet>,
        settings: &MixSettings,
        source_ready: bool,
    ) -> Token<FloatRgb> {
        let joined = join(&self.branches[0].source(), &self.branches[1].source());
        let ack = self.branch_ack(source_ready);
        let accept = self.branches.iter().all(|b| b.sink_ready(ack));

        let sink = if accept && sink.valid {
            sink
        } else {
            Token::idle()
        };

        let mut packet_gains = [None; MIXED_SOURCES];

        if sink.starts_packet() {
            if self.active != *settings {
                tracing::trace!(?settings, "new mixer settings latched");
            }

            self.active = *settings;
            packet_gains = self.active.gain.map(Some);
        }

        let select = self.active.select;

        for (i, branch) in self.branches.iter_mut().enumerate() {
            let sample = sink
                .clone()
                .map(|set| set.get(select[i]).copied().unwrap_or_default());

            branch.clock(sample, packet_gains[i], ack);
        }

        self.adder.clock(joined, source_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float::FloatFormat;
    use smallvec::smallvec;

    fn settings(select: [usize; 2], gain: [f64; 2]) -> MixSettings {
        MixSettings {
            select,
            gain: gain.map(|g| GainFactor::from_f64(FloatFormat::BINARY16, g).unwrap()),
        }
    }

    fn line(len: usize, luma: [u16; 2]) -> Vec<Token<SourceSet>> {
        (0..len)
            .map(|x| {
                Token::new(
                    smallvec![PixelSample::new(luma[0], 128), PixelSample::new(luma[1], 128)],
                    x == 0,
                    x + 1 == len,
                )
            })
            .collect()
    }

    fn run(
        mixer: &mut Mixer,
        tokens: &[Token<SourceSet>],
        settings: &MixSettings,
    ) -> Vec<Token<FloatRgb>> {
        let mut out = vec![];

        for token in tokens {
            out.push(mixer.clock(token.clone(), settings, true));
        }

        for _ in 0..mixer.latency() {
            out.push(mixer.clock(Token::idle(), settings, true));
        }

        out.into_iter().filter(|t| t.valid).collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            color: crate::color::ColorInfo {
                full_range: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn latency_is_branch_plus_adder() {
        let config = config();
        let mixer = Mixer::new(&config, config.initial_settings().unwrap()).unwrap();

        assert_eq!(mixer.branches()[0].latency(), 11);
        assert_eq!(mixer.latency(), 15);
    }

    #[test]
    fn mixes_with_gains() {
        let config = config();
        let format = config.float;
        let s = settings([0, 1], [0.5, 0.5]);
        let mut mixer = Mixer::new(&config, s).unwrap();

        let out = run(&mut mixer, &line(4, [255, 0]), &s);
        assert_eq!(out.len(), 4);
        assert!(out[0].sop && out[3].eop);

        for token in out {
            assert_eq!(format.to_f64(token.payload.r), 0.5);
        }
    }

    #[test]
    fn settings_only_change_at_packet_start() {
        let config = config();
        let format = config.float;
        let first = settings([0, 1], [1.0, 0.0]);
        let second = settings([1, 0], [1.0, 0.0]);
        let mut mixer = Mixer::new(&config, first).unwrap();

        let tokens = line(4, [255, 0]);
        let mut out = vec![];

        // Settings change in the middle of the first line
        for (x, token) in tokens.iter().chain(tokens.iter()).enumerate() {
            let offered = if x < 2 { &first } else { &second };
            out.push(mixer.clock(token.clone(), offered, true));
        }
        for _ in 0..mixer.latency() {
            out.push(mixer.clock(Token::idle(), &second, true));
        }

        let red: Vec<f64> = out
            .iter()
            .filter(|t| t.valid)
            .map(|t| format.to_f64(t.payload.r))
            .collect();

        assert_eq!(red, [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(*mixer.active(), second);
    }

    #[test]
    fn gain_only_changes_at_packet_start() {
        let config = config();
        let format = config.float;
        let first = settings([0, 1], [1.0, 0.0]);
        let second = settings([0, 1], [0.5, 0.0]);
        let mut mixer = Mixer::new(&config, first).unwrap();

        let tokens = line(4, [255, 0]);
        let mut out = vec![];

        for (x, token) in tokens.iter().chain(tokens.iter()).enumerate() {
            let offered = if x < 2 { &first } else { &second };
            out.push(mixer.clock(token.clone(), offered, true));
        }

        // The second line is still in flight, the multiplier keeps the first line's gain
        assert_eq!(mixer.branches()[0].gain(), first.gain[0]);

        for _ in 0..mixer.latency() {
            out.push(mixer.clock(Token::idle(), &second, true));
        }

        let red: Vec<f64> = out
            .iter()
            .filter(|t| t.valid)
            .map(|t| format.to_f64(t.payload.r))
            .collect();

        assert_eq!(red, [1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(mixer.branches()[0].gain(), second.gain[0]);
    }

    #[test]
    fn rejects_mismatched_branches() {
        assert!(matches!(
            check_join_latency(11, 12),
            Err(ConfigError::BranchLatencyMismatch { left: 11, right: 12 })
        ));
    }
}
