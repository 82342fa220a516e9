//! # Kernel
//!
//! Process-wide scheduler instance and the flat call surface applications
//! use: `init` → `add_task` (×N) → `start` → `dispatch` in a loop, with
//! `tick_handler` wired to the hardware timer interrupt.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Empty the task table
//!         ├─► kernel::add_task()    ← Register periodic jobs (×N)
//!         ├─► kernel::start()       ← Arm SysTick
//!         └─► kernel::run()         ← dispatch() / WFI forever
//!
//! SysTick (every 1/TICK_HZ s)
//!   └─► kernel::tick_handler()      ← Mark due tasks
//! ```

use crate::config::MAX_TASKS;
use crate::error::SchedulerError;
use crate::scheduler::{Scheduler, SchedulerState};
use crate::task::{OverrunHook, TaskFn, TaskId, TaskStats};
use crate::timer::TickSource;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Scheduler type used by the process-wide instance.
pub type SystemScheduler = Scheduler<MAX_TASKS>;

/// The process-wide scheduler. Shared between the SysTick handler and the
/// main loop; the scheduler itself arbitrates access (see `Scheduler`).
static SCHEDULER: SystemScheduler = SystemScheduler::new();

/// The process-wide scheduler, for callers that prefer the method API.
#[inline]
pub fn scheduler() -> &'static SystemScheduler {
    &SCHEDULER
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Reset the task table and enter the configuring state.
pub fn init() -> Result<(), SchedulerError> {
    SCHEDULER.init()
}

/// Register a periodic job. See [`Scheduler::add_task`].
///
/// # Example
/// ```ignore
/// kernel::add_task(link_led_toggle_task, 0, 500)?;
/// kernel::add_task(can_write_task, 3, 250)?;
/// ```
pub fn add_task(action: TaskFn, offset: u32, period: u32) -> Result<TaskId, SchedulerError> {
    SCHEDULER.add_task(action, offset, period)
}

/// Install the application's overrun callback.
pub fn set_overrun_hook(hook: OverrunHook) -> Result<(), SchedulerError> {
    SCHEDULER.set_overrun_hook(hook)
}

/// Arm the tick source and let tasks become due.
pub fn start<T: TickSource>(source: &mut T) -> Result<(), SchedulerError> {
    SCHEDULER.start(source)
}

/// Disarm the tick source.
pub fn stop<T: TickSource>(source: &mut T) -> Result<(), SchedulerError> {
    SCHEDULER.stop(source)
}

/// One scan of the task table. Call from the main loop without condition.
#[inline]
pub fn dispatch() -> usize {
    SCHEDULER.dispatch()
}

/// Dispatch forever, calling `idle` when a scan found nothing to run.
pub fn run<F: FnMut()>(idle: F) -> ! {
    SCHEDULER.run(idle)
}

/// Interrupt entry point. Wire to the timer interrupt vector.
#[inline]
pub fn tick_handler() {
    SCHEDULER.tick();
}

/// Ticks handled while running since `init()`.
#[inline]
pub fn ticks() -> u32 {
    SCHEDULER.ticks()
}

pub fn uptime_ms() -> u64 {
    SCHEDULER.uptime_ms()
}

pub fn state() -> SchedulerState {
    SCHEDULER.state()
}

pub fn stats(id: TaskId) -> Option<TaskStats> {
    SCHEDULER.stats(id)
}

pub fn total_overruns() -> u32 {
    SCHEDULER.total_overruns()
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
