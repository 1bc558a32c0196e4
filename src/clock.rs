//! Pixel clock provider
//!
//! The pipeline only consumes a clock, it never configures one. Until the provider reports a lock
//! the driver holds every stage in reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait ClockSource {
    /// Pixel clock frequency in Hz
    fn pixel_clock(&self) -> u64;

    /// Serializer clock, twice the pixel clock
    fn double_clock(&self) -> u64 {
        self.pixel_clock() * 2
    }

    fn locked(&self) -> bool;
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn pixel_clock(&self) -> u64 {
        (**self).pixel_clock()
    }

    fn double_clock(&self) -> u64 {
        (**self).double_clock()
    }

    fn locked(&self) -> bool {
        (**self).locked()
    }
}

/// Clock with a fixed frequency and a lock flag that can be toggled from any thread
#[derive(Debug)]
pub struct FixedClock {
    pixel_hz: u64,
    locked: AtomicBool,
}

impl FixedClock {
    /// 25.175MHz, the VGA pixel clock
    pub const VGA_HZ: u64 = 25_175_000;

    pub fn new(pixel_hz: u64) -> Self {
        Self {
            pixel_hz,
            locked: AtomicBool::new(true),
        }
    }

    pub fn unlocked(pixel_hz: u64) -> Self {
        Self {
            pixel_hz,
            locked: AtomicBool::new(false),
        }
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }
}

impl ClockSource for FixedClock {
    fn pixel_clock(&self) -> u64 {
        self.pixel_hz
    }

    fn locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_clock_follows_lock() {
        let clock = Arc::new(FixedClock::unlocked(FixedClock::VGA_HZ));
        let shared = clock.clone();

        assert!(!shared.locked());
        assert_eq!(shared.double_clock(), 50_350_000);

        clock.set_locked(true);
        assert!(shared.locked());
    }
}
