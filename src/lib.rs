//! Cycle-accurate model of a video mixing pixel pipeline
//!
//! Packed words carrying several interleaved YCbCr 4:2:2 sources cross from the system clock into
//! the pixel clock domain, get unpacked and framed into lines, and two selected sources are
//! converted to RGB, weighted with their gains in a narrow float format and summed.

pub use clock::{ClockSource, FixedClock};
pub use color::{ColorInfo, ColorSpace};
pub use config::{ConfigError, MixConfig, PipelineConfig};
pub use control::{
    ControlHandle, FADE_STEPS, FILL_RATE_HZ, Fade, Fader, GainFactor, MIXED_SOURCES, MixSettings,
    Synchronizer,
};
pub use driver::{Driver, DriverStats, PixelOut};
pub use fifo::{FifoReader, FifoWriter, WordSource, async_fifo};
pub use float::{Float, FloatFormat};
pub use frame::{FrameCapture, FrameError, FrameWriter, RgbFrame, YCbCr422Frame, render_frame};
pub use framer::PacketFramer;
pub use mixer::{Branch, Mixer, check_join_latency};
#[cfg(feature = "multi-thread")]
pub use multi_thread::mix_frame_multi_thread;
pub use pixel::{FloatRgb, PixelSample, Rgb, SourceSet, YCbCr444};
pub use reference::mix_frame;
pub use stream::{DelayLine, Pipelined, Stage, Token, Transform, join};
pub use timing::{TimingAligner, TimingSignal, VideoTiming};
pub use unpack::{StreamUnpacker, UnpackStats, Unpacked};
pub use word::{LayoutError, PackedWord, WordLayout};

mod clock;
mod color;
mod config;
mod control;
mod driver;
mod fifo;
mod float;
mod frame;
mod framer;
mod mixer;
#[cfg(feature = "multi-thread")]
mod multi_thread;
mod pixel;
mod reference;
pub mod stages;
mod stream;
mod timing;
mod unpack;
mod word;
