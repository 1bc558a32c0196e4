//! Token passing between pipeline stages
//!
//! Every call to [`Stage::clock`] is one rising edge of the pixel clock. A stage returns the token
//! presented on its source port during that cycle, which is always registered state, so chaining
//! `b.clock(a.clock(x, ..), ..)` wires `a`'s source to `b`'s sink combinationally. A token passed
//! into a stage with latency `L` comes back out of the call `L` clocks later.

use std::collections::VecDeque;

/// One unit of pipeline data with its control bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Token<T> {
    pub valid: bool,
    /// Start of packet (first pixel of a line)
    pub sop: bool,
    /// End of packet (last pixel of a line)
    pub eop: bool,
    pub payload: T,
}

impl<T> Token<T> {
    pub fn new(payload: T, sop: bool, eop: bool) -> Self {
        Self {
            valid: true,
            sop,
            eop,
            payload,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Token<U> {
        Token {
            valid: self.valid,
            sop: self.sop,
            eop: self.eop,
            payload: f(self.payload),
        }
    }

    /// Valid token carrying the first pixel of a packet
    pub fn starts_packet(&self) -> bool {
        self.valid && self.sop
    }
}

impl<T: Default> Token<T> {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// A clocked pipeline stage with a registered source port
pub trait Stage {
    type Input: Clone + Default;
    type Output: Clone + Default;

    /// Pixel clocks between a token entering the sink and leaving the source
    fn latency(&self) -> usize;

    /// Token presented on the source port this cycle
    fn source(&self) -> Token<Self::Output>;

    /// Whether the sink accepts a token this cycle, given the downstream `ready`
    fn sink_ready(&self, source_ready: bool) -> bool;

    /// Advance one clock. The sink token is only captured if [`Stage::sink_ready`] holds.
    fn clock(&mut self, sink: Token<Self::Input>, source_ready: bool) -> Token<Self::Output>;
}

/// Fixed function transform of a single token
pub trait Transform {
    type Input: Clone + Default;
    type Output: Clone + Default;

    const LATENCY: usize;

    fn transform(&self, input: &Self::Input) -> Self::Output;
}

/// Register chain around a [`Transform`]
///
/// The whole chain moves when the downstream is ready or the last register holds no valid token,
/// otherwise every register keeps its value.
pub struct Pipelined<T: Transform> {
    transform: T,
    regs: VecDeque<Token<T::Output>>,
}

impl<T: Transform> Pipelined<T> {
    pub fn new(transform: T) -> Self {
        assert!(T::LATENCY > 0, "pipelined stages need at least one register");

        Self {
            transform,
            regs: (0..T::LATENCY).map(|_| Token::idle()).collect(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.transform
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.transform
    }
}

impl<T: Transform> Stage for Pipelined<T> {
    type Input = T::Input;
    type Output = T::Output;

    fn latency(&self) -> usize {
        T::LATENCY
    }

    fn source(&self) -> Token<T::Output> {
        self.regs.back().cloned().unwrap_or_default()
    }

    fn sink_ready(&self, source_ready: bool) -> bool {
        source_ready || !self.regs.back().is_some_and(|t| t.valid)
    }

    fn clock(&mut self, sink: Token<T::Input>, source_ready: bool) -> Token<T::Output> {
        let out = self.source();

        if self.sink_ready(source_ready) {
            self.regs.pop_back();

            let captured = if sink.valid {
                let payload = self.transform.transform(&sink.payload);
                Token::new(payload, sink.sop, sink.eop)
            } else {
                Token::idle()
            };

            self.regs.push_front(captured);
        }

        out
    }
}

/// Free running shift register, never stalls
pub struct DelayLine<T> {
    regs: VecDeque<T>,
}

impl<T: Clone + Default> DelayLine<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            regs: (0..depth).map(|_| T::default()).collect(),
        }
    }

    pub fn depth(&self) -> usize {
        self.regs.len()
    }

    /// Push `input`, returns the value pushed `depth` clocks ago
    pub fn clock(&mut self, input: T) -> T {
        self.regs.push_front(input);
        self.regs.pop_back().unwrap_or_default()
    }
}

/// Join barrier: a combined token exists only when both sides present one in the same cycle
pub fn join<A: Clone, B: Clone>(a: &Token<A>, b: &Token<B>) -> Token<(A, B)> {
    Token {
        valid: a.valid && b.valid,
        sop: a.sop && b.sop,
        eop: a.eop && b.eop,
        payload: (a.payload.clone(), b.payload.clone()),
    }
}
