//! # Tick Source
//!
//! Hardware-abstract periodic interrupt that drives the scheduler.
//! On target this is SysTick (see `arch::cortex_m4`); host tests use a
//! software stand-in and call `Scheduler::tick()` directly.

use crate::config::TICK_HZ;

/// A periodic interrupt source with a fixed, known period.
///
/// Implementations only start and stop the interrupt. The interrupt vector
/// itself must call [`crate::kernel::tick_handler`] (or `Scheduler::tick`
/// on the instance being driven).
pub trait TickSource {
    /// Start firing tick interrupts.
    fn arm(&mut self);

    /// Stop firing tick interrupts. A tick already pending may still run.
    fn disarm(&mut self);

    /// Tick frequency in Hz.
    fn tick_hz(&self) -> u32 {
        TICK_HZ
    }
}

/// Convert a tick count to milliseconds at [`TICK_HZ`].
#[inline]
pub const fn ticks_to_ms(ticks: u32) -> u64 {
    ticks as u64 * 1000 / TICK_HZ as u64
}

/// Convert milliseconds to whole ticks at [`TICK_HZ`], rounding down.
#[inline]
pub const fn ms_to_ticks(ms: u32) -> u32 {
    (ms as u64 * TICK_HZ as u64 / 1000) as u32
}

/// Ticks elapsed from `since` to `now` on the wrapping tick counter.
#[inline]
pub const fn elapsed(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Software tick source for host tests. Counts arm/disarm calls.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualTickSource {
    pub armed: bool,
    pub arm_calls: u32,
    pub disarm_calls: u32,
}

#[cfg(test)]
impl TickSource for ManualTickSource {
    fn arm(&mut self) {
        self.armed = true;
        self.arm_calls += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.disarm_calls += 1;
    }
}
