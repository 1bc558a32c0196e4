//! Mixer configuration and its crossing from the system into the pixel clock domain
//!
//! The system domain writes registers through a [`ControlHandle`] at any time. The pixel domain
//! samples them through a two stage [`Synchronizer`] every clock and the mixer latches the
//! synchronized value only at packet starts.

use crate::config::{ConfigError, check_source};
use crate::float::{Float, FloatFormat};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Number of sources combined by the mixer
pub const MIXED_SOURCES: usize = 2;

/// Gain register word, encoded in the mixer's float format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GainFactor(Float);

impl GainFactor {
    pub const fn from_bits(bits: u32) -> Self {
        Self(Float::from_bits(bits))
    }

    pub const fn to_bits(self) -> u32 {
        self.0.to_bits()
    }

    pub fn from_f64(format: FloatFormat, value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidGain(value));
        }

        Ok(Self(format.from_f64(value)))
    }

    pub fn to_f64(self, format: FloatFormat) -> f64 {
        format.to_f64(self.0)
    }

    pub fn float(self) -> Float {
        self.0
    }
}

/// Which sources are mixed and with which gains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixSettings {
    pub select: [usize; MIXED_SOURCES],
    pub gain: [GainFactor; MIXED_SOURCES],
}

#[derive(Debug)]
struct ControlRegisters {
    select: [AtomicU32; MIXED_SOURCES],
    gain: [AtomicU32; MIXED_SOURCES],
}

/// System domain access to the mixer registers
#[derive(Debug, Clone)]
pub struct ControlHandle {
    regs: Arc<ControlRegisters>,
    sources: usize,
    format: FloatFormat,
}

impl ControlHandle {
    pub(crate) fn new(initial: MixSettings, sources: usize, format: FloatFormat) -> Self {
        let regs = ControlRegisters {
            select: initial.select.map(|s| AtomicU32::new(s as u32)),
            gain: initial.gain.map(|g| AtomicU32::new(g.to_bits())),
        };

        Self {
            regs: Arc::new(regs),
            sources,
            format,
        }
    }

    pub fn set_select(&self, branch: usize, index: usize) -> Result<(), ConfigError> {
        let reg = self
            .regs
            .select
            .get(branch)
            .ok_or(ConfigError::BranchOutOfRange(branch))?;
        check_source(index, self.sources)?;

        reg.store(index as u32, Ordering::Release);
        Ok(())
    }

    pub fn set_gain(&self, branch: usize, gain: GainFactor) -> Result<(), ConfigError> {
        let reg = self
            .regs
            .gain
            .get(branch)
            .ok_or(ConfigError::BranchOutOfRange(branch))?;

        reg.store(gain.to_bits(), Ordering::Release);
        Ok(())
    }

    pub fn set_gain_f64(&self, branch: usize, gain: f64) -> Result<(), ConfigError> {
        self.set_gain(branch, GainFactor::from_f64(self.format, gain)?)
    }

    /// Current register contents
    pub fn settings(&self) -> MixSettings {
        MixSettings {
            select: [0, 1].map(|i| self.regs.select[i].load(Ordering::Acquire) as usize),
            gain: [0, 1].map(|i| GainFactor::from_bits(self.regs.gain[i].load(Ordering::Acquire))),
        }
    }
}

/// Double flop synchronizer, a value sampled on one clock appears at the output two clocks later
#[derive(Debug, Clone)]
pub struct Synchronizer<T> {
    stages: [T; 2],
}

impl<T: Clone> Synchronizer<T> {
    pub fn new(initial: T) -> Self {
        Self {
            stages: [initial.clone(), initial],
        }
    }

    pub fn output(&self) -> &T {
        &self.stages[1]
    }

    pub fn clock(&mut self, input: T) -> T {
        let next = std::mem::replace(&mut self.stages[0], input);
        std::mem::replace(&mut self.stages[1], next)
    }
}

/// Rate at which a [`Fader`] moves one step
pub const FILL_RATE_HZ: u32 = 20;

/// Number of steps of the crossfade table
pub const FADE_STEPS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fade {
    /// Towards source 0
    Up,
    /// Towards source 1
    Down,
    #[default]
    Off,
}

/// Crossfades between the two mixed sources by stepping through a gain table
///
/// Step `c` writes gain `c / 20` to branch 0 and `(19 - c) / 20` to branch 1.
#[derive(Debug, Clone)]
pub struct Fader {
    table: [GainFactor; FADE_STEPS],
    counter: usize,
    fade: Fade,
    last_step: Option<Instant>,
}

impl Fader {
    pub fn new(format: FloatFormat) -> Self {
        let table = std::array::from_fn(|k| {
            GainFactor(format.from_f64(k as f64 / FADE_STEPS as f64))
        });

        Self {
            table,
            counter: 0,
            fade: Fade::Off,
            last_step: None,
        }
    }

    pub fn table(&self) -> &[GainFactor; FADE_STEPS] {
        &self.table
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn fade(&self) -> Fade {
        self.fade
    }

    pub fn set_fade(&mut self, fade: Fade) {
        if fade != self.fade {
            tracing::info!(?fade, counter = self.counter, "fade changed");
        }

        self.fade = fade;
    }

    /// Step the fade if a step period elapsed since the last one, then write both gains
    pub fn service(&mut self, now: Instant, control: &ControlHandle) -> Result<(), ConfigError> {
        let period = Duration::from_secs(1) / FILL_RATE_HZ;

        let due = self
            .last_step
            .is_none_or(|last| now.saturating_duration_since(last) >= period);

        if due {
            self.last_step = Some(now);

            match self.fade {
                Fade::Up => self.counter = (self.counter + 1).min(FADE_STEPS - 1),
                Fade::Down => self.counter = self.counter.saturating_sub(1),
                Fade::Off => {}
            }
        }

        control.set_gain(0, self.table[self.counter])?;
        control.set_gain(1, self.table[FADE_STEPS - 1 - self.counter])
    }
}
