use crate::stream::{Stage, Token};

/// Turns a data enable qualified sample stream into packets, one packet per active line
///
/// The sink token's `valid` carries the data enable level, its `sop` and `eop` are ignored. The
/// first enabled pixel after a disabled one starts a packet. One register of lookahead marks the
/// last enabled pixel as end of packet, which costs one clock of latency.
pub struct PacketFramer<T> {
    held: Token<T>,
}

impl<T: Clone + Default> PacketFramer<T> {
    pub const LATENCY: usize = 1;

    pub fn new() -> Self {
        Self {
            held: Token::default(),
        }
    }

    /// The held token is emitted with `eop` set once the next sample is known to be disabled
    fn present(&self, sink: &Token<T>) -> Token<T> {
        Token {
            eop: self.held.valid && !sink.valid,
            ..self.held.clone()
        }
    }
}

impl<T: Clone + Default> Default for PacketFramer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Default> Stage for PacketFramer<T> {
    type Input = T;
    type Output = T;

    fn latency(&self) -> usize {
        Self::LATENCY
    }

    /// `eop` is not known before the next sink token, so this never sets it
    fn source(&self) -> Token<T> {
        self.held.clone()
    }

    fn sink_ready(&self, source_ready: bool) -> bool {
        source_ready || !self.held.valid
    }

    fn clock(&mut self, sink: Token<T>, source_ready: bool) -> Token<T> {
        let out = self.present(&sink);

        if self.sink_ready(source_ready) {
            self.held = Token {
                valid: sink.valid,
                sop: sink.valid && !self.held.valid,
                eop: false,
                payload: if sink.valid { sink.payload } else { T::default() },
            };
        }

        out
    }
}
