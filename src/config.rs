use crate::color::ColorInfo;
use crate::control::{GainFactor, MIXED_SOURCES, MixSettings};
use crate::float::FloatFormat;
use crate::word::WordLayout;
use serde::{Deserialize, Serialize};

/// Structural errors, all of them are detected before the pipeline runs
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("pack factor must be a non zero power of two, got {0}")]
    PackFactorNotPowerOfTwo(usize),

    #[error("at least one source is required")]
    NoSources,

    #[error("unsupported bits per component {0}, expected 8 to 16")]
    UnsupportedBitsPerComponent(u8),

    #[error("unsupported float format e{exponent_bits}m{mantissa_bits}")]
    InvalidFloatFormat {
        exponent_bits: u32,
        mantissa_bits: u32,
    },

    #[error("float format {format:?} cannot represent every {bits_per_component} bit code exactly")]
    FloatFormatTooNarrow {
        format: FloatFormat,
        bits_per_component: u8,
    },

    #[error("source index {index} out of range, there are {sources} sources")]
    SourceOutOfRange { index: usize, sources: usize },

    #[error("mixer branch {0} does not exist")]
    BranchOutOfRange(usize),

    #[error("gain must be finite and not negative, got {0}")]
    InvalidGain(f64),

    #[error("mixer branches must have the same latency, got {left} and {right}")]
    BranchLatencyMismatch { left: usize, right: usize },

    #[error("fifo depth must not be zero")]
    ZeroFifoDepth,

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Initial source selection and gains, gains as plain numbers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixConfig {
    pub select: [usize; MIXED_SOURCES],
    pub gain: [f64; MIXED_SOURCES],
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            select: [0, 1],
            gain: [0.5, 0.5],
        }
    }
}

/// Build time parameters of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pixels per wide word, a power of two
    pub pack_factor: usize,
    /// Number of sources interleaved in every wide word
    pub sources: usize,
    pub bits_per_component: u8,
    pub color: ColorInfo,
    pub float: FloatFormat,
    pub mix: MixConfig,
    /// Depth in words of the domain crossing buffer
    pub fifo_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pack_factor: 2,
            sources: 2,
            bits_per_component: 8,
            color: ColorInfo::default(),
            float: FloatFormat::BINARY16,
            mix: MixConfig::default(),
            fifo_depth: 512,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout()?;

        if self.fifo_depth == 0 {
            return Err(ConfigError::ZeroFifoDepth);
        }

        validate_float_format(self.float, self.bits_per_component)?;

        self.initial_settings().map(drop)
    }

    pub fn layout(&self) -> Result<WordLayout, ConfigError> {
        WordLayout::new(self.pack_factor, self.sources, self.bits_per_component)
    }

    /// Mixer settings before the first register write
    pub fn initial_settings(&self) -> Result<MixSettings, ConfigError> {
        for index in self.mix.select {
            check_source(index, self.sources)?;
        }

        let [g0, g1] = self.mix.gain;

        Ok(MixSettings {
            select: self.mix.select,
            gain: [
                GainFactor::from_f64(self.float, g0)?,
                GainFactor::from_f64(self.float, g1)?,
            ],
        })
    }
}

pub(crate) fn check_source(index: usize, sources: usize) -> Result<(), ConfigError> {
    if index >= sources {
        return Err(ConfigError::SourceOutOfRange { index, sources });
    }

    Ok(())
}

/// The float format must hold every code exactly, its reciprocal step `1 / (2^bits - 1)`, and the
/// sum of two full scale values
fn validate_float_format(format: FloatFormat, bits: u8) -> Result<(), ConfigError> {
    if !(2..=8).contains(&format.exponent_bits) || !(1..=23).contains(&format.mantissa_bits) {
        return Err(ConfigError::InvalidFloatFormat {
            exponent_bits: format.exponent_bits,
            mantissa_bits: format.mantissa_bits,
        });
    }

    if format.mantissa_bits < u32::from(bits)
        || format.min_exponent() > -i32::from(bits)
        || format.max_exponent() < 1
    {
        return Err(ConfigError::FloatFormatTooNarrow {
            format,
            bits_per_component: bits,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        let settings = config.initial_settings().unwrap();
        assert_eq!(settings.select, [0, 1]);
        assert_eq!(settings.gain[0].to_bits(), 14336);
        assert_eq!(settings.gain[1].to_bits(), 14336);
    }

    #[test]
    fn initial_gains_are_validated() {
        let config = PipelineConfig {
            mix: MixConfig {
                select: [0, 1],
                gain: [1.0, -0.25],
            },
            ..Default::default()
        };

        assert!(matches!(
            config.initial_settings(),
            Err(ConfigError::InvalidGain(g)) if g == -0.25
        ));
    }

    #[test]
    fn parse_partial_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "pack_factor": 4,
                "sources": 3,
                "color": { "space": "BT709", "full_range": true },
                "mix": { "select": [2, 0], "gain": [1.0, 0.0] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.pack_factor, 4);
        assert_eq!(config.bits_per_component, 8);
        assert!(config.color.full_range);
        assert_eq!(config.mix.select, [2, 0]);
    }

    #[test]
    fn json_survives_serialization() {
        let config = PipelineConfig::default();
        let parsed = PipelineConfig::from_json(&config.to_json().unwrap()).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn rejects_structural_errors() {
        let mut config = PipelineConfig {
            pack_factor: 3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PackFactorNotPowerOfTwo(3))
        ));

        config.pack_factor = 2;
        config.mix.select = [0, 2];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceOutOfRange {
                index: 2,
                sources: 2
            })
        ));

        config.mix.select = [0, 1];
        config.bits_per_component = 12;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FloatFormatTooNarrow { .. })
        ));

        config.float = FloatFormat {
            exponent_bits: 6,
            mantissa_bits: 12,
        };
        config.validate().unwrap();

        config.mix.gain[1] = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGain(_))));

        assert!(matches!(
            PipelineConfig::from_json("{ \"sources\": \"two\" }"),
            Err(ConfigError::Json(_))
        ));
    }
}
