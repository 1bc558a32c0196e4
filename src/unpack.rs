use crate::fifo::WordSource;
use crate::pixel::{PixelSample, SourceSet};
use crate::timing::TimingSignal;
use crate::word::{PackedWord, WordLayout};

/// One pixel clock worth of unpacked data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unpacked {
    pub timing: TimingSignal,
    pub samples: SourceSet,
    /// Buffer advance, set on the last sub-word of every word
    pub advance: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    /// Words read from the buffer
    pub words: u64,
    /// Words substituted by a blank word because the buffer was empty
    pub underflows: u64,
}

/// Splits wide words into one pixel per clock
///
/// A word is captured when the previous one is exhausted and the buffer head is only released
/// after its last pixel was emitted. The timing signals of a word apply to all its pixels.
pub struct StreamUnpacker {
    layout: WordLayout,
    current: Option<Captured>,
    index: usize,
    underflowing: bool,
    stats: UnpackStats,
}

struct Captured {
    word: PackedWord,
    from_buffer: bool,
}

impl StreamUnpacker {
    pub fn new(layout: WordLayout) -> Self {
        Self {
            layout,
            current: None,
            index: 0,
            underflowing: false,
            stats: UnpackStats::default(),
        }
    }

    pub fn layout(&self) -> &WordLayout {
        &self.layout
    }

    pub fn stats(&self) -> UnpackStats {
        self.stats
    }

    /// Index of the sub-word emitted next
    pub fn index(&self) -> usize {
        self.index
    }

    fn capture(&mut self, src: &dyn WordSource) -> Captured {
        match src.dout().filter(|_| src.readable()) {
            Some(word) => {
                if self.underflowing {
                    tracing::debug!(underflows = self.stats.underflows, "word buffer recovered");
                    self.underflowing = false;
                }

                Captured {
                    word,
                    from_buffer: true,
                }
            }
            None => {
                if !self.underflowing {
                    tracing::warn!("word buffer underflow, emitting blanking");
                    self.underflowing = true;
                }

                self.stats.underflows += 1;

                Captured {
                    word: PackedWord::blank(&self.layout),
                    from_buffer: false,
                }
            }
        }
    }

    /// Emit the current sub-word, the counter only moves if `ready` is set
    pub fn clock(&mut self, src: &mut dyn WordSource, ready: bool) -> Unpacked {
        let captured = match self.current.take() {
            Some(captured) => captured,
            None => self.capture(src),
        };

        let word = &captured.word;
        let sources = self.layout.sources();

        let samples = match word.pixels.get(self.index) {
            Some(set) => (0..sources)
                .map(|s| set.get(s).copied().unwrap_or_default())
                .collect(),
            None => SourceSet::from_elem(PixelSample::default(), sources),
        };

        let mut out = Unpacked {
            timing: TimingSignal {
                hsync: word.hsync,
                vsync: word.vsync,
                data_enable: word.de,
            },
            samples,
            advance: false,
        };

        if !ready {
            self.current = Some(captured);
            return out;
        }

        if self.index + 1 == self.layout.pack_factor() {
            out.advance = true;
            self.index = 0;

            if captured.from_buffer {
                src.read_enable();
                self.stats.words += 1;
            }
        } else {
            self.index += 1;
            self.current = Some(captured);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn layout(pack: usize) -> WordLayout {
        WordLayout::new(pack, 2, 8).unwrap()
    }

    fn word(layout: &WordLayout, first: u16) -> PackedWord {
        PackedWord {
            hsync: false,
            vsync: true,
            de: true,
            pixels: (0..layout.pack_factor() as u16)
                .map(|i| {
                    [0, 1]
                        .into_iter()
                        .map(|s| PixelSample::new(first + i, 100 * s + first + i))
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn one_read_per_pack_factor_clocks() {
        let layout = layout(4);
        let mut src: VecDeque<_> = [word(&layout, 0), word(&layout, 4)].into();
        let mut unpacker = StreamUnpacker::new(layout);

        let out: Vec<Unpacked> = (0..8).map(|_| unpacker.clock(&mut src, true)).collect();

        let luma: Vec<u16> = out.iter().map(|o| o.samples[0].y).collect();
        assert_eq!(luma, [0, 1, 2, 3, 4, 5, 6, 7]);

        let advance: Vec<usize> = (0..8).filter(|&i| out[i].advance).collect();
        assert_eq!(advance, [3, 7]);

        assert!(src.is_empty());
        assert_eq!(unpacker.stats().words, 2);
        assert_eq!(unpacker.stats().underflows, 0);
    }

    #[test]
    fn head_is_kept_until_last_pixel() {
        let layout = layout(2);
        let mut src: VecDeque<_> = [word(&layout, 10)].into();
        let mut unpacker = StreamUnpacker::new(layout);

        let first = unpacker.clock(&mut src, true);
        assert_eq!(src.len(), 1);
        assert!(first.timing.vsync && first.timing.data_enable);
        assert_eq!(first.samples[1].cb_cr, 110);

        unpacker.clock(&mut src, true);
        assert!(src.is_empty());
    }

    #[test]
    fn stall_repeats_pixel() {
        let layout = layout(2);
        let mut src: VecDeque<_> = [word(&layout, 0)].into();
        let mut unpacker = StreamUnpacker::new(layout);

        let a = unpacker.clock(&mut src, false);
        let b = unpacker.clock(&mut src, false);
        assert_eq!(a, b);
        assert_eq!(unpacker.index(), 0);

        unpacker.clock(&mut src, true);
        assert_eq!(unpacker.clock(&mut src, true).samples[0].y, 1);
    }

    #[test]
    fn underflow_emits_blanking() {
        let layout = layout(2);
        let mut src: VecDeque<PackedWord> = VecDeque::new();
        let mut unpacker = StreamUnpacker::new(layout);

        for _ in 0..4 {
            let out = unpacker.clock(&mut src, true);
            assert_eq!(out.timing, TimingSignal::default());
            assert_eq!(out.samples.len(), 2);
        }
        assert_eq!(unpacker.stats().underflows, 2);

        // A word arriving mid blank word waits for the next word boundary
        unpacker.clock(&mut src, true);
        src.push_back(word(&layout, 0));
        assert!(!unpacker.clock(&mut src, true).timing.data_enable);
        assert!(unpacker.clock(&mut src, true).timing.data_enable);
        assert_eq!(unpacker.stats().words, 0);
    }
}
