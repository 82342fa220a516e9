//! # Scheduler Configuration
//!
//! Compile-time constants governing the scheduler and the tick source.
//! All limits are fixed at compile time — no dynamic allocation.

/// Capacity of the system task table used by [`crate::kernel`].
/// Each slot costs a few dozen bytes of RAM; stand-alone
/// [`crate::scheduler::Scheduler`] instances pick their own capacity.
pub const MAX_TASKS: usize = 8;

/// Tick frequency in Hz. One tick is the scheduler's unit of time,
/// so at 1 kHz task offsets and periods are expressed in milliseconds.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Largest offset or period accepted at registration.
///
/// The tick counter wraps at `u32::MAX`; elapsed times are computed with
/// wrapping subtraction and stay unambiguous only below half the range.
pub const MAX_INTERVAL_TICKS: u32 = u32::MAX / 2;

/// SysTick exception priority. Task bodies run in Thread mode and are
/// preempted by any exception; keep the tick below latency-critical
/// peripheral interrupts (higher number = lower urgency).
pub const SYSTICK_PRIORITY: u8 = 0x40;
