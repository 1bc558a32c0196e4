//! Raster timing signals and their alignment with the processed pixels

use crate::stream::DelayLine;
use serde::{Deserialize, Serialize};

/// Sync and data enable levels of one pixel clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimingSignal {
    pub hsync: bool,
    pub vsync: bool,
    pub data_enable: bool,
}

/// Delays the timing signals by the depth of the processing pipeline, so they leave together with
/// the pixel they were captured with
pub struct TimingAligner {
    line: DelayLine<TimingSignal>,
}

impl TimingAligner {
    pub fn new(depth: usize) -> Self {
        Self {
            line: DelayLine::new(depth),
        }
    }

    pub fn depth(&self) -> usize {
        self.line.depth()
    }

    pub fn clock(&mut self, timing: TimingSignal) -> TimingSignal {
        self.line.clock(timing)
    }
}

/// Horizontal and vertical raster of a video mode
///
/// Each line starts with the active pixels, followed by front porch, sync pulse and back porch.
/// Frames have the same structure in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoTiming {
    pub h_active: usize,
    pub h_front_porch: usize,
    pub h_sync: usize,
    pub h_back_porch: usize,

    pub v_active: usize,
    pub v_front_porch: usize,
    pub v_sync: usize,
    pub v_back_porch: usize,
}

impl VideoTiming {
    /// 640x480 at 60Hz with a 25.175MHz pixel clock
    pub const VGA: Self = Self {
        h_active: 640,
        h_front_porch: 16,
        h_sync: 96,
        h_back_porch: 48,

        v_active: 480,
        v_front_porch: 10,
        v_sync: 2,
        v_back_porch: 33,
    };

    /// A small raster with the given active area and short blanking, for tests and previews
    pub const fn with_active(width: usize, height: usize) -> Self {
        Self {
            h_active: width,
            h_front_porch: 4,
            h_sync: 8,
            h_back_porch: 4,

            v_active: height,
            v_front_porch: 1,
            v_sync: 1,
            v_back_porch: 1,
        }
    }

    pub const fn h_total(&self) -> usize {
        self.h_active + self.h_front_porch + self.h_sync + self.h_back_porch
    }

    pub const fn v_total(&self) -> usize {
        self.v_active + self.v_front_porch + self.v_sync + self.v_back_porch
    }

    /// Signal levels at raster position `x`, `y`
    pub fn signal_at(&self, x: usize, y: usize) -> TimingSignal {
        let h_sync_start = self.h_active + self.h_front_porch;
        let v_sync_start = self.v_active + self.v_front_porch;

        TimingSignal {
            hsync: (h_sync_start..h_sync_start + self.h_sync).contains(&x),
            vsync: (v_sync_start..v_sync_start + self.v_sync).contains(&y),
            data_enable: x < self.h_active && y < self.v_active,
        }
    }

    /// Signal levels of one whole frame in raster order
    pub fn signals(&self) -> impl Iterator<Item = TimingSignal> + '_ {
        (0..self.v_total())
            .flat_map(move |y| (0..self.h_total()).map(move |x| self.signal_at(x, y)))
    }
}
