//! # Cortex-M4 Port Layer
//!
//! Hardware-specific glue for the ARM Cortex-M4 (also usable on any
//! Armv7-M / Armv7E-M core): the SysTick tick source, the SysTick exception
//! entry and the idle wait between dispatch scans.
//!
//! ## Interrupt Model
//!
//! - SysTick fires at `TICK_HZ` and runs `kernel::tick_handler()` in
//!   Handler mode, preempting whatever task body is executing
//! - Task bodies and the dispatcher run in Thread mode on the main stack
//! - There is no context switch: every task runs to completion

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::{SYSTEM_CLOCK_HZ, SYSTICK_PRIORITY, TICK_HZ};
use crate::timer::TickSource;

// ---------------------------------------------------------------------------
// SysTick tick source
// ---------------------------------------------------------------------------

/// SysTick reload value for one scheduler tick.
pub const SYSTICK_RELOAD: u32 = SYSTEM_CLOCK_HZ / TICK_HZ - 1;

/// [`TickSource`] backed by the core SysTick timer.
pub struct SysTickSource {
    syst: SYST,
}

impl SysTickSource {
    /// Take ownership of SysTick. The counter stays disabled until `arm()`.
    pub fn new(mut syst: SYST) -> Self {
        syst.disable_interrupt();
        syst.disable_counter();
        Self { syst }
    }

    /// Give SysTick back.
    pub fn free(self) -> SYST {
        self.syst
    }
}

impl TickSource for SysTickSource {
    /// Configure SysTick to fire at `TICK_HZ` from the processor clock.
    fn arm(&mut self) {
        self.syst.set_reload(SYSTICK_RELOAD);
        self.syst.clear_current();
        self.syst.set_clock_source(SystClkSource::Core);
        self.syst.enable_counter();
        self.syst.enable_interrupt();
    }

    fn disarm(&mut self) {
        self.syst.disable_interrupt();
        self.syst.disable_counter();
    }

    fn tick_hz(&self) -> u32 {
        TICK_HZ
    }
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set the SysTick exception to `SYSTICK_PRIORITY`.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // SAFETY: changing the SysTick priority cannot break a priority-based
    // critical section here; the scheduler only uses PRIMASK masking.
    unsafe {
        scb.set_priority(SystemHandler::SysTick, SYSTICK_PRIORITY);
    }
}

// ---------------------------------------------------------------------------
// Idle
// ---------------------------------------------------------------------------

/// Sleep until the next interrupt. Pass to `kernel::run()` as the idle hook.
///
/// A tick that marks a task due between the last scan and the WFI wakes
/// the core on the following tick at the latest.
#[inline]
pub fn wait_for_tick() {
    cortex_m::asm::wfi();
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — scheduler tick entry point.
///
/// Called at `TICK_HZ` frequency. Only marks tasks due; task bodies run
/// later from the main loop.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn SysTick() {
    crate::kernel::tick_handler();
}
