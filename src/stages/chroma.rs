use crate::pixel::{PixelSample, YCbCr444};
use crate::stream::{Stage, Token};

/// 4:2:2 to 4:4:4 upsampler using nearest neighbour chroma
///
/// Counting from the start of a packet, even pixels carry Cb and odd pixels carry Cr. Both pixels
/// of a pair get the pair's Cb and Cr. An even pixel without partner at the end of a packet reuses
/// the Cr of the previous pair, or neutral chroma if it is alone in its packet.
pub struct ChromaUpsampler {
    neutral: u16,
    /// `[newest, oldest]`, the oldest slot is presented
    regs: [Slot; 2],
    next_odd: bool,
    last_cb: u16,
    last_cr: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    token: Token<PixelSample>,
    odd: bool,
}

impl ChromaUpsampler {
    pub const LATENCY: usize = 2;

    pub fn new(bits_per_component: u8) -> Self {
        let neutral = 1 << (bits_per_component - 1);

        Self {
            neutral,
            regs: [Slot::default(); 2],
            next_odd: false,
            last_cb: neutral,
            last_cr: neutral,
        }
    }
}

impl Stage for ChromaUpsampler {
    type Input = PixelSample;
    type Output = YCbCr444;

    fn latency(&self) -> usize {
        Self::LATENCY
    }

    fn source(&self) -> Token<YCbCr444> {
        let [next, current] = &self.regs;

        if !current.token.valid {
            return Token::idle();
        }

        let sample = current.token.payload;

        let (cb, cr) = if current.odd {
            (self.last_cb, sample.cb_cr)
        } else if next.token.valid && next.odd {
            (sample.cb_cr, next.token.payload.cb_cr)
        } else if current.token.sop {
            (sample.cb_cr, self.neutral)
        } else {
            (sample.cb_cr, self.last_cr)
        };

        current.token.map(|s| YCbCr444 { y: s.y, cb, cr })
    }

    fn sink_ready(&self, source_ready: bool) -> bool {
        source_ready || !self.regs[1].token.valid
    }

    fn clock(&mut self, sink: Token<PixelSample>, source_ready: bool) -> Token<YCbCr444> {
        let out = self.source();

        if !self.sink_ready(source_ready) {
            return out;
        }

        if out.valid {
            if self.regs[1].odd {
                self.last_cr = out.payload.cr;
            } else {
                self.last_cb = out.payload.cb;
            }
        }

        let odd = sink.valid && !sink.sop && self.next_odd;
        if sink.valid {
            self.next_odd = !odd;
        }

        let sink = if sink.valid { sink } else { Token::idle() };

        self.regs = [Slot { token: sink, odd }, self.regs[0]];

        out
    }
}

/// Untimed version of [`ChromaUpsampler`] for one complete packet
pub fn upsample_line(line: &[PixelSample], bits_per_component: u8) -> Vec<YCbCr444> {
    let neutral = 1 << (bits_per_component - 1);

    line.iter()
        .enumerate()
        .map(|(x, sample)| {
            let (cb, cr) = if x % 2 == 1 {
                (line[x - 1].cb_cr, sample.cb_cr)
            } else if let Some(partner) = line.get(x + 1) {
                (sample.cb_cr, partner.cb_cr)
            } else if x == 0 {
                (sample.cb_cr, neutral)
            } else {
                (sample.cb_cr, line[x - 1].cb_cr)
            };

            YCbCr444 {
                y: sample.y,
                cb,
                cr,
            }
        })
        .collect()
}
