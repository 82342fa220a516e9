//! # Task Descriptors
//!
//! Defines the periodic task model. Each registered job occupies one slot
//! in the scheduler's fixed task table and is addressed by its index.
//!
//! ## Interrupt / Thread Handoff
//!
//! A slot is shared between the tick handler (interrupt context) and the
//! dispatcher (Thread mode). No lock guards it; instead every runtime field
//! has exactly one writer:
//!
//! | Field | Written by |
//! |-------|------------|
//! | `delay`, `expired`, `due_at`, `overruns` | tick handler |
//! | `due = true` | tick handler |
//! | `due = false` | dispatcher |
//! | `runs`, `run_time_*`, `latency_*`, `overruns_reported` | dispatcher |
//!
//! Only `load`/`store` are used on the atomics, which are single
//! instructions on every Cortex-M profile (including Armv6-M).

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::MAX_INTERVAL_TICKS;
use crate::error::SchedulerError;
use crate::scheduler::Scheduler;
use crate::timer;

/// Body of a periodic task.
///
/// Must return promptly and never block: a body that does not return
/// stalls every other task, and the scheduler has no way to reclaim the CPU.
pub type TaskFn = fn();

/// Callback invoked by the dispatcher when a task has missed periods.
///
/// Receives the task and the number of periods missed since the previous
/// report. Runs in Thread mode, after the task body returned.
pub type OverrunHook = fn(TaskId, u32);

// ---------------------------------------------------------------------------
// Task handle
// ---------------------------------------------------------------------------

/// Handle to a registered task: its index in the task table.
///
/// Handles order like dispatch priority; a lower index is registered
/// earlier and runs first when several tasks are due in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Position of the task in the table (registration order).
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Task configuration (immutable after registration)
// ---------------------------------------------------------------------------

/// Registration parameters of a task.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// Task body. `None` only for unused slots.
    pub action: Option<TaskFn>,
    /// Ticks before the first firing. `0` fires on the first tick.
    pub offset: u32,
    /// Ticks between firings. `0` makes the task one-shot.
    pub period: u32,
}

impl TaskConfig {
    /// Configuration of an unused slot.
    pub const EMPTY: Self = Self {
        action: None,
        offset: 0,
        period: 0,
    };

    /// Check the configuration against the registration rules.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.action.is_none()
            || self.offset > MAX_INTERVAL_TICKS
            || self.period > MAX_INTERVAL_TICKS
        {
            return Err(SchedulerError::InvalidArgument);
        }
        Ok(())
    }

    /// Whether the task fires exactly once.
    #[inline]
    pub const fn is_one_shot(&self) -> bool {
        self.period == 0
    }
}

// ---------------------------------------------------------------------------
// Diagnostics snapshot
// ---------------------------------------------------------------------------

/// Point-in-time copy of a task's counters, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Configured period (`0` for one-shot tasks).
    pub period: u32,
    /// Ticks left before the next firing.
    pub delay: u32,
    /// Whether the task is waiting for the dispatcher.
    pub due: bool,
    /// Whether a one-shot task has already fired.
    pub expired: bool,
    /// Completed invocations.
    pub runs: u32,
    /// Periods missed because the previous firing was still pending.
    pub overruns: u32,
    /// Ticks consumed by the most recent invocation.
    pub run_time_last: u32,
    /// Largest number of ticks consumed by any invocation.
    pub run_time_max: u32,
    /// Ticks the most recent invocation waited between becoming due and
    /// starting.
    pub latency_last: u32,
    /// Longest wait between becoming due and starting.
    pub latency_max: u32,
}

// ---------------------------------------------------------------------------
// Task slot
// ---------------------------------------------------------------------------

/// One entry of the task table.
///
/// `config` lives in an `UnsafeCell` because it is written only at
/// configuration time (under a critical section, scheduler not running)
/// and is read-only afterwards.
pub struct TaskSlot {
    config: UnsafeCell<TaskConfig>,
    delay: AtomicU32,
    due: AtomicBool,
    expired: AtomicBool,
    due_at: AtomicU32,
    overruns: AtomicU32,
    overruns_reported: AtomicU32,
    runs: AtomicU32,
    run_time_last: AtomicU32,
    run_time_max: AtomicU32,
    latency_last: AtomicU32,
    latency_max: AtomicU32,
}

impl TaskSlot {
    /// An unused slot. Used to build the static table.
    #[allow(clippy::declare_interior_mutable_const)]
    pub const EMPTY: Self = Self {
        config: UnsafeCell::new(TaskConfig::EMPTY),
        delay: AtomicU32::new(0),
        due: AtomicBool::new(false),
        expired: AtomicBool::new(false),
        due_at: AtomicU32::new(0),
        overruns: AtomicU32::new(0),
        overruns_reported: AtomicU32::new(0),
        runs: AtomicU32::new(0),
        run_time_last: AtomicU32::new(0),
        run_time_max: AtomicU32::new(0),
        latency_last: AtomicU32::new(0),
        latency_max: AtomicU32::new(0),
    };

    /// Load a fresh configuration and clear all counters.
    ///
    /// # Safety
    /// The caller must have exclusive access to the slot: the slot is not
    /// yet published to the tick handler, or the scheduler is not running,
    /// and no other configuration call runs concurrently.
    pub(crate) unsafe fn load(&self, config: TaskConfig) {
        *self.config.get() = config;
        self.delay.store(config.offset, Ordering::Relaxed);
        self.due.store(false, Ordering::Relaxed);
        self.expired.store(false, Ordering::Relaxed);
        self.due_at.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.overruns_reported.store(0, Ordering::Relaxed);
        self.runs.store(0, Ordering::Relaxed);
        self.run_time_last.store(0, Ordering::Relaxed);
        self.run_time_max.store(0, Ordering::Relaxed);
        self.latency_last.store(0, Ordering::Relaxed);
        self.latency_max.store(0, Ordering::Relaxed);
    }

    /// Registration parameters of this slot.
    #[inline]
    pub fn config(&self) -> TaskConfig {
        // SAFETY: `config` is only written through `load()`, whose contract
        // excludes concurrent readers.
        unsafe { *self.config.get() }
    }

    /// Whether the dispatcher should run this task.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.due.load(Ordering::Acquire)
    }

    /// Tick counter value right after the firing tick of the pending run.
    /// A dispatch that starts before the next tick sees zero latency.
    #[inline]
    pub fn due_at(&self) -> u32 {
        self.due_at.load(Ordering::Relaxed)
    }

    /// Tick-handler step for this slot. `now` is the index of the tick.
    ///
    /// Counts the offset down; on reaching zero the task is marked due and
    /// the countdown is reloaded from the period. The reloading tick counts
    /// as the first tick of the new period, hence `period - 1`.
    pub(crate) fn on_tick(&self, now: u32) {
        if self.expired.load(Ordering::Relaxed) {
            return;
        }

        let delay = self.delay.load(Ordering::Relaxed);
        if delay > 0 {
            self.delay.store(delay - 1, Ordering::Relaxed);
            return;
        }

        if self.due.load(Ordering::Acquire) {
            // Previous firing not yet dispatched: fold this one into it.
            self.record_overrun();
        } else {
            self.due_at.store(now.wrapping_add(1), Ordering::Relaxed);
            self.due.store(true, Ordering::Release);
        }

        let period = self.config().period;
        if period == 0 {
            self.expired.store(true, Ordering::Relaxed);
        } else {
            self.delay.store(period - 1, Ordering::Relaxed);
        }
    }

    /// Record a missed period. Tick handler only.
    fn record_overrun(&self) {
        let overruns = self.overruns.load(Ordering::Relaxed);
        self.overruns.store(overruns.wrapping_add(1), Ordering::Relaxed);
    }

    /// Dispatcher bookkeeping after the body returned.
    ///
    /// Clears the due flag, updates the latency and run-time figures and
    /// returns the number of overruns recorded since the previous completion.
    pub(crate) fn complete(&self, started: u32, finished: u32) -> u32 {
        // Read before clearing `due`: the next firing may rewrite `due_at`.
        let latency = timer::elapsed(self.due_at(), started);
        self.due.store(false, Ordering::Release);

        self.latency_last.store(latency, Ordering::Relaxed);
        if latency > self.latency_max.load(Ordering::Relaxed) {
            self.latency_max.store(latency, Ordering::Relaxed);
        }

        let runs = self.runs.load(Ordering::Relaxed);
        self.runs.store(runs.wrapping_add(1), Ordering::Relaxed);

        let run_time = timer::elapsed(started, finished);
        self.run_time_last.store(run_time, Ordering::Relaxed);
        if run_time > self.run_time_max.load(Ordering::Relaxed) {
            self.run_time_max.store(run_time, Ordering::Relaxed);
        }

        let overruns = self.overruns.load(Ordering::Relaxed);
        let reported = self.overruns_reported.load(Ordering::Relaxed);
        self.overruns_reported.store(overruns, Ordering::Relaxed);
        overruns.wrapping_sub(reported)
    }

    /// Copy of the slot's counters.
    pub fn stats(&self) -> TaskStats {
        TaskStats {
            period: self.config().period,
            delay: self.delay.load(Ordering::Relaxed),
            due: self.is_due(),
            expired: self.expired.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            run_time_last: self.run_time_last.load(Ordering::Relaxed),
            run_time_max: self.run_time_max.load(Ordering::Relaxed),
            latency_last: self.latency_last.load(Ordering::Relaxed),
            latency_max: self.latency_max.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent registration helper.
///
/// ```ignore
/// let id = TaskBuilder::new()
///     .action(blink)
///     .offset(100)
///     .period(500)
///     .register(&SCHEDULER)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskBuilder {
    action: Option<TaskFn>,
    offset: u32,
    period: u32,
}

impl TaskBuilder {
    pub const fn new() -> Self {
        Self {
            action: None,
            offset: 0,
            period: 0,
        }
    }

    pub fn action(mut self, action: TaskFn) -> Self {
        self.action = Some(action);
        self
    }

    pub fn offset(mut self, ticks: u32) -> Self {
        self.offset = ticks;
        self
    }

    pub fn period(mut self, ticks: u32) -> Self {
        self.period = ticks;
        self
    }

    /// The configuration this builder describes.
    pub const fn config(&self) -> TaskConfig {
        TaskConfig {
            action: self.action,
            offset: self.offset,
            period: self.period,
        }
    }

    /// Register the task. Fails with `InvalidArgument` if no action was set.
    pub fn register<const N: usize>(
        self,
        scheduler: &Scheduler<N>,
    ) -> Result<TaskId, SchedulerError> {
        scheduler.register(self.config())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
