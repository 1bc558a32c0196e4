//! Asynchronous buffer between the system clock writer and the pixel clock reader

use crate::word::PackedWord;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;

/// Read side of the domain crossing buffer, as seen from the pixel clock
pub trait WordSource {
    fn readable(&self) -> bool;

    /// Word at the head of the buffer
    fn dout(&self) -> Option<PackedWord>;

    /// Drop the head word
    fn read_enable(&mut self);
}

impl WordSource for VecDeque<PackedWord> {
    fn readable(&self) -> bool {
        !self.is_empty()
    }

    fn dout(&self) -> Option<PackedWord> {
        self.front().cloned()
    }

    fn read_enable(&mut self) {
        self.pop_front();
    }
}

struct Shared {
    words: Mutex<VecDeque<PackedWord>>,
    depth: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<PackedWord>> {
        self.words.lock()
    }
}

/// Create a bounded buffer holding at most `depth` words
pub fn async_fifo(depth: usize) -> (FifoWriter, FifoReader) {
    let shared = Arc::new(Shared {
        words: Mutex::new(VecDeque::with_capacity(depth)),
        depth,
    });

    (
        FifoWriter {
            shared: shared.clone(),
        },
        FifoReader { shared },
    )
}

/// System clock side of [`async_fifo`]
#[derive(Clone)]
pub struct FifoWriter {
    shared: Arc<Shared>,
}

impl FifoWriter {
    pub fn writable(&self) -> bool {
        self.shared.lock().len() < self.shared.depth
    }

    /// Write enable, hands the word back if the buffer is full
    pub fn write(&self, word: PackedWord) -> Result<(), PackedWord> {
        let mut words = self.shared.lock();

        if words.len() >= self.shared.depth {
            return Err(word);
        }

        words.push_back(word);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pixel clock side of [`async_fifo`]
pub struct FifoReader {
    shared: Arc<Shared>,
}

impl WordSource for FifoReader {
    fn readable(&self) -> bool {
        !self.shared.lock().is_empty()
    }

    fn dout(&self) -> Option<PackedWord> {
        self.shared.lock().front().cloned()
    }

    fn read_enable(&mut self) {
        self.shared.lock().pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(de: bool) -> PackedWord {
        PackedWord {
            de,
            ..Default::default()
        }
    }

    #[test]
    fn bounded_write() {
        let (writer, mut reader) = async_fifo(2);

        assert!(writer.write(word(true)).is_ok());
        assert!(writer.write(word(false)).is_ok());
        assert!(!writer.writable());
        assert_eq!(writer.write(word(true)), Err(word(true)));

        assert!(reader.readable());
        assert_eq!(reader.dout(), Some(word(true)));
        reader.read_enable();
        assert_eq!(reader.dout(), Some(word(false)));
        assert!(writer.writable());
    }

    #[test]
    fn writer_on_another_thread() {
        let (writer, mut reader) = async_fifo(512);

        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                let mut w = word(i % 2 == 0);
                while let Err(back) = writer.write(w) {
                    w = back;
                    std::thread::yield_now();
                }
            }
        });

        handle.join().unwrap();

        let mut des = vec![];
        while let Some(w) = reader.dout() {
            des.push(w.de);
            reader.read_enable();
        }

        assert_eq!(des.len(), 100);
        assert!(des.iter().step_by(2).all(|de| *de));
    }

    #[test]
    fn panic_while_locked_keeps_buffer_usable() {
        let (writer, mut reader) = async_fifo(4);
        writer.write(word(true)).unwrap();

        let shared = writer.shared.clone();
        let result = std::thread::spawn(move || {
            let _words = shared.lock();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());

        assert!(reader.readable());
        reader.read_enable();
        assert!(writer.write(word(false)).is_ok());
        assert_eq!(reader.dout(), Some(word(false)));
    }
}
