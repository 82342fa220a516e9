//! # Synchronization Primitives
//!
//! Interrupt-safe critical section used while the task table is being
//! configured. On Cortex-M the `critical-section` implementation comes from
//! `cortex-m` (`critical-section-single-core`: interrupts masked on entry,
//! restored on exit); host tests link the `std` implementation.
//!
//! The tick/dispatch hot path never enters a critical section. A task body
//! runs with interrupts enabled so the tick can keep time while it executes.

pub use critical_section::CriticalSection;

/// Execute a closure within a critical section (interrupts disabled).
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     // configure the task table
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}
