//! # Scheduler
//!
//! Time-triggered, cooperative scheduling core. A fixed table of periodic
//! tasks is driven by one hardware tick; due tasks run to completion in
//! Thread mode, in registration order.
//!
//! ## Scheduling Algorithm
//!
//! At each tick interrupt (`tick()`):
//! 1. **Count down**: every live task decrements its delay
//! 2. **Mark due**: a task at zero delay gets its `due` flag set and its
//!    delay reloaded from the period (one-shot tasks expire instead)
//! 3. **Detect overrun**: a task that is still due from its previous
//!    firing records an overrun instead of queueing a second run
//! 4. **Advance time**: the monotonic tick counter is incremented
//!
//! In the main loop (`dispatch()`):
//! 1. **Scan** the table in registration order
//! 2. **Run** every due task synchronously, timing it in ticks
//! 3. **Clear** its due flag once the body returns
//! 4. **Report** overruns recorded while it was pending or running
//!
//! ## Lifecycle
//!
//! ```text
//!  ┌───────────────┐ init() ┌─────────────┐ start() ┌─────────┐
//!  │ Uninitialized │ ─────► │ Configuring │ ──────► │ Running │
//!  └───────────────┘        └─────────────┘         └─────────┘
//!                                 ▲                   │    ▲
//!                                 │ init()     stop() │    │ start()
//!                                 │                   ▼    │
//!                                 │               ┌─────────┐
//!                                 └────────────── │ Stopped │
//!                                                 └─────────┘
//! ```

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

use crate::error::SchedulerError;
use crate::sync;
use crate::task::{OverrunHook, TaskConfig, TaskFn, TaskId, TaskSlot, TaskStats};
use crate::timer::{self, TickSource};

// ---------------------------------------------------------------------------
// Lifecycle state
// ---------------------------------------------------------------------------

/// Lifecycle of a scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Created but `init()` not yet called.
    Uninitialized = 0,
    /// Accepting task registrations.
    Configuring = 1,
    /// Tick source armed; table membership is fixed.
    Running = 2,
    /// Tick source disarmed after running; tasks keep their phase.
    Stopped = 3,
}

impl SchedulerState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SchedulerState::Configuring,
            2 => SchedulerState::Running,
            3 => SchedulerState::Stopped,
            _ => SchedulerState::Uninitialized,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// A time-triggered scheduler with a task table of capacity `N`.
///
/// The scheduler is a self-contained context object: it can live in a
/// `static` (see [`crate::kernel`]) or on the stack of a test, and several
/// instances never share state.
///
/// ## Design Notes
///
/// - All tasks are stored inline in a fixed-size array (no heap)
/// - Every method takes `&self`; runtime fields are atomics with a single
///   writer context each (see [`crate::task`])
/// - Configuration writes happen under a critical section and only while
///   the scheduler is not running
pub struct Scheduler<const N: usize> {
    /// Fixed-size task table; the first `task_count` slots are live.
    tasks: [TaskSlot; N],

    /// Number of registered tasks. Published with `Release` after the slot
    /// has been written.
    task_count: AtomicUsize,

    /// Monotonic tick counter, wrapping. Written by `tick()` only.
    tick_count: AtomicU32,

    /// Current [`SchedulerState`].
    state: AtomicU8,

    /// Overrun callback, set while configuring.
    overrun_hook: UnsafeCell<Option<OverrunHook>>,
}

// SAFETY: the only non-atomic state (`TaskSlot::config` and `overrun_hook`)
// is written under a critical section while the scheduler is not running,
// at which point neither the tick handler nor the dispatcher reads it
// concurrently on a single-core target.
unsafe impl<const N: usize> Sync for Scheduler<N> {}

impl<const N: usize> Scheduler<N> {
    /// Create an uninitialized scheduler with an empty task table.
    pub const fn new() -> Self {
        Self {
            tasks: [TaskSlot::EMPTY; N],
            task_count: AtomicUsize::new(0),
            tick_count: AtomicU32::new(0),
            state: AtomicU8::new(SchedulerState::Uninitialized as u8),
            overrun_hook: UnsafeCell::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enter the configuring state with an empty table and a zero tick count.
    ///
    /// Fails with `SchedulerRunning` while the tick source is armed.
    pub fn init(&self) -> Result<(), SchedulerError> {
        sync::critical_section(|_cs| {
            if self.state() == SchedulerState::Running {
                return Err(SchedulerError::SchedulerRunning);
            }

            let count = self.task_count.load(Ordering::Relaxed);
            self.task_count.store(0, Ordering::Release);
            for slot in &self.tasks[..count] {
                // SAFETY: not running and inside a critical section; the
                // slot is no longer published.
                unsafe { slot.load(TaskConfig::EMPTY) };
            }
            self.tick_count.store(0, Ordering::Relaxed);
            // SAFETY: as above, nothing reads the hook concurrently.
            unsafe { *self.overrun_hook.get() = None };
            self.set_state(SchedulerState::Configuring);
            Ok(())
        })?;

        log::info!("scheduler initialized, capacity {}", N);
        Ok(())
    }

    /// Arm the tick source and start marking tasks due.
    ///
    /// Starting a stopped scheduler resumes it; every task keeps the phase
    /// it had when it was stopped.
    pub fn start<T: TickSource>(&self, source: &mut T) -> Result<(), SchedulerError> {
        sync::critical_section(|_cs| match self.state() {
            SchedulerState::Uninitialized => Err(SchedulerError::NotConfigured),
            SchedulerState::Running => Err(SchedulerError::AlreadyRunning),
            SchedulerState::Configuring | SchedulerState::Stopped => {
                // Running must be visible before the first tick can fire.
                self.set_state(SchedulerState::Running);
                Ok(())
            }
        })?;
        source.arm();

        let count = self.task_count();
        if count == 0 {
            log::warn!("scheduler started with an empty task table");
        }
        log::info!("scheduler started: {} task(s) at {} Hz", count, source.tick_hz());
        Ok(())
    }

    /// Disarm the tick source. Ticks that still arrive are ignored.
    pub fn stop<T: TickSource>(&self, source: &mut T) -> Result<(), SchedulerError> {
        sync::critical_section(|_cs| {
            if self.state() != SchedulerState::Running {
                return Err(SchedulerError::NotRunning);
            }
            self.set_state(SchedulerState::Stopped);
            Ok(())
        })?;
        source.disarm();

        log::info!("scheduler stopped at tick {}", self.ticks());
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a periodic task.
    ///
    /// The task first runs on tick `offset` and then every `period` ticks.
    /// A `period` of 0 makes it one-shot. Earlier registrations run first
    /// when several tasks are due on the same tick.
    pub fn add_task(
        &self,
        action: TaskFn,
        offset: u32,
        period: u32,
    ) -> Result<TaskId, SchedulerError> {
        self.register(TaskConfig {
            action: Some(action),
            offset,
            period,
        })
    }

    /// Register a task from a full configuration.
    ///
    /// On failure the table is left unchanged.
    pub fn register(&self, config: TaskConfig) -> Result<TaskId, SchedulerError> {
        let id = sync::critical_section(|_cs| {
            self.ensure_configuring()?;
            config.validate()?;

            let index = self.task_count.load(Ordering::Relaxed);
            let slot = self
                .tasks
                .get(index)
                .ok_or(SchedulerError::CapacityExceeded)?;
            // SAFETY: configuring, inside a critical section, and the slot
            // is beyond the published count.
            unsafe { slot.load(config) };
            self.task_count.store(index + 1, Ordering::Release);
            Ok(TaskId(index))
        })?;

        log::debug!(
            "task {} registered: offset {} period {}",
            id.index(),
            config.offset,
            config.period
        );
        Ok(id)
    }

    /// Install the callback that receives overrun reports.
    pub fn set_overrun_hook(&self, hook: OverrunHook) -> Result<(), SchedulerError> {
        sync::critical_section(|_cs| {
            self.ensure_configuring()?;
            // SAFETY: configuring, inside a critical section.
            unsafe { *self.overrun_hook.get() = Some(hook) };
            Ok(())
        })
    }

    fn ensure_configuring(&self) -> Result<(), SchedulerError> {
        match self.state() {
            SchedulerState::Configuring => Ok(()),
            SchedulerState::Uninitialized => Err(SchedulerError::NotConfigured),
            SchedulerState::Running | SchedulerState::Stopped => {
                Err(SchedulerError::SchedulerRunning)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick handler (interrupt context)
    // -----------------------------------------------------------------------

    /// Advance scheduler time by one tick.
    ///
    /// Called from the tick interrupt. Bounded by the table capacity; never
    /// blocks, never logs and never runs a task body.
    pub fn tick(&self) {
        if !self.is_running() {
            return;
        }

        let now = self.tick_count.load(Ordering::Relaxed);
        for slot in self.live() {
            slot.on_tick(now);
        }
        self.tick_count.store(now.wrapping_add(1), Ordering::Relaxed);
    }

    // -----------------------------------------------------------------------
    // Dispatcher (Thread mode)
    // -----------------------------------------------------------------------

    /// Run every due task once, in registration order.
    ///
    /// Returns the number of task bodies executed. Never sleeps; callers
    /// decide whether to idle between scans.
    pub fn dispatch(&self) -> usize {
        let mut ran = 0;

        for (index, slot) in self.live().iter().enumerate() {
            if !slot.is_due() {
                continue;
            }
            let Some(action) = slot.config().action else {
                continue;
            };

            let started = self.ticks();
            action();
            let finished = self.ticks();

            let missed = slot.complete(started, finished);
            ran += 1;
            if missed > 0 {
                self.report_overrun(TaskId(index), missed);
            }
        }

        ran
    }

    /// Dispatch forever, calling `idle` after every scan that ran nothing.
    ///
    /// `idle` may enter a low-power wait; the next tick interrupt wakes it.
    pub fn run<F: FnMut()>(&self, mut idle: F) -> ! {
        loop {
            if self.dispatch() == 0 {
                idle();
            }
        }
    }

    fn report_overrun(&self, id: TaskId, missed: u32) {
        log::warn!(
            "task {} overran: {} period(s) missed, {} tick(s) last run",
            id.index(),
            missed,
            self.tasks[id.index()].stats().run_time_last
        );
        // SAFETY: the hook is only written while configuring.
        if let Some(hook) = unsafe { *self.overrun_hook.get() } {
            hook(id, missed);
        }
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Registered slots.
    #[inline]
    fn live(&self) -> &[TaskSlot] {
        let count = self.task_count.load(Ordering::Acquire);
        &self.tasks[..count]
    }

    /// Ticks handled while running since `init()`. Wraps at `u32::MAX`.
    #[inline]
    pub fn ticks(&self) -> u32 {
        self.tick_count.load(Ordering::Relaxed)
    }

    /// Running time since `init()` in milliseconds, from the tick count.
    /// Time spent stopped is not counted.
    pub fn uptime_ms(&self) -> u64 {
        timer::ticks_to_ms(self.ticks())
    }

    /// Number of registered tasks.
    #[inline]
    pub fn task_count(&self) -> usize {
        self.task_count.load(Ordering::Acquire)
    }

    /// Fixed capacity of the task table.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Counters of one task, `None` if the handle is not registered.
    pub fn stats(&self, id: TaskId) -> Option<TaskStats> {
        self.live().get(id.index()).map(TaskSlot::stats)
    }

    /// Overruns recorded across all tasks.
    pub fn total_overruns(&self) -> u32 {
        self.live()
            .iter()
            .fold(0u32, |sum, slot| sum.wrapping_add(slot.stats().overruns))
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskBuilder;
    use crate::timer::ManualTickSource;
    use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

    fn noop() {}

    /// One tick interrupt followed by one main-loop scan.
    fn step<const N: usize>(scheduler: &Scheduler<N>, ticks: u32) {
        for _ in 0..ticks {
            scheduler.tick();
            scheduler.dispatch();
        }
    }

    fn running<const N: usize>(scheduler: &Scheduler<N>, source: &mut ManualTickSource) {
        scheduler.start(source).unwrap();
    }

    #[test]
    fn test_new_scheduler_is_uninitialized() {
        let scheduler = Scheduler::<4>::new();
        assert_eq!(scheduler.state(), SchedulerState::Uninitialized);
        assert_eq!(scheduler.task_count(), 0);
        assert_eq!(scheduler.capacity(), 4);
    }

    #[test]
    fn test_add_task_before_init_fails() {
        let scheduler = Scheduler::<4>::new();
        assert_eq!(
            scheduler.add_task(noop, 0, 10),
            Err(SchedulerError::NotConfigured)
        );
    }

    #[test]
    fn test_handles_follow_registration_order() {
        let scheduler = Scheduler::<4>::new();
        scheduler.init().unwrap();
        for expected in 0..4 {
            let id = scheduler.add_task(noop, expected as u32, 10).unwrap();
            assert_eq!(id.index(), expected);
        }
        assert_eq!(scheduler.task_count(), 4);
    }

    #[test]
    fn test_capacity_exceeded_leaves_table_unchanged() {
        let scheduler = Scheduler::<2>::new();
        scheduler.init().unwrap();
        let first = scheduler.add_task(noop, 1, 10).unwrap();
        scheduler.add_task(noop, 2, 20).unwrap();

        for _ in 0..3 {
            assert_eq!(
                scheduler.add_task(noop, 3, 30),
                Err(SchedulerError::CapacityExceeded)
            );
        }
        assert_eq!(scheduler.task_count(), 2);
        assert_eq!(scheduler.stats(TaskId(2)), None);
        let stats = scheduler.stats(first).unwrap();
        assert_eq!((stats.delay, stats.period), (1, 10));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        let scheduler = Scheduler::<4>::new();
        scheduler.init().unwrap();
        assert_eq!(
            TaskBuilder::new().period(10).register(&scheduler),
            Err(SchedulerError::InvalidArgument)
        );
        assert_eq!(
            scheduler.add_task(noop, -5i32 as u32, 10),
            Err(SchedulerError::InvalidArgument)
        );
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_builder_registration() {
        let scheduler = Scheduler::<4>::new();
        scheduler.init().unwrap();
        let id = TaskBuilder::new()
            .action(noop)
            .offset(3)
            .period(250)
            .register(&scheduler)
            .unwrap();
        assert_eq!(id, TaskId(0));
        assert_eq!(scheduler.stats(id).unwrap().period, 250);
    }

    #[test]
    fn test_lifecycle_errors() {
        let scheduler = Scheduler::<4>::new();
        let mut source = ManualTickSource::default();

        assert_eq!(scheduler.start(&mut source), Err(SchedulerError::NotConfigured));
        assert_eq!(scheduler.stop(&mut source), Err(SchedulerError::NotRunning));
        assert_eq!(source.arm_calls, 0);

        scheduler.init().unwrap();
        scheduler.add_task(noop, 0, 10).unwrap();
        scheduler.start(&mut source).unwrap();
        assert!(source.armed);
        assert_eq!(scheduler.state(), SchedulerState::Running);

        assert_eq!(scheduler.start(&mut source), Err(SchedulerError::AlreadyRunning));
        assert_eq!(scheduler.add_task(noop, 0, 10), Err(SchedulerError::SchedulerRunning));
        assert_eq!(scheduler.set_overrun_hook(|_, _| {}), Err(SchedulerError::SchedulerRunning));
        assert_eq!(scheduler.init(), Err(SchedulerError::SchedulerRunning));
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(source.arm_calls, 1);

        scheduler.stop(&mut source).unwrap();
        assert!(!source.armed);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.stop(&mut source), Err(SchedulerError::NotRunning));
        assert_eq!(scheduler.add_task(noop, 0, 10), Err(SchedulerError::SchedulerRunning));
    }

    #[test]
    fn test_periodic_task_fires_at_offset_then_every_period() {
        static RUNS: AtomicU32 = AtomicU32::new(0);
        fn count() {
            RUNS.fetch_add(1, Ordering::Relaxed);
        }

        let scheduler = Scheduler::<4>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        let id = scheduler.add_task(count, 3, 5).unwrap();
        running(&scheduler, &mut source);

        // Ticks 0..=2: still counting down the offset.
        step(&scheduler, 3);
        assert_eq!(RUNS.load(Ordering::Relaxed), 0);
        // Tick 3: first firing.
        step(&scheduler, 1);
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
        // Ticks 4..=7: idle; tick 8 fires again.
        step(&scheduler, 4);
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
        step(&scheduler, 1);
        assert_eq!(RUNS.load(Ordering::Relaxed), 2);
        // Ticks 9..=102 hold the 18 firings 13, 18, ..., 98.
        step(&scheduler, 94);
        assert_eq!(RUNS.load(Ordering::Relaxed), 20);

        let stats = scheduler.stats(id).unwrap();
        assert_eq!(stats.runs, 20);
        assert_eq!(stats.overruns, 0);
        assert!(!stats.due);
    }

    #[test]
    fn test_led_phase_scenario() {
        static LINK: AtomicU32 = AtomicU32::new(0);
        static CONNECT: AtomicU32 = AtomicU32::new(0);
        fn link_toggle() {
            LINK.fetch_add(1, Ordering::Relaxed);
        }
        fn connect_toggle() {
            CONNECT.fetch_add(1, Ordering::Relaxed);
        }

        let scheduler = Scheduler::<4>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        scheduler.add_task(link_toggle, 0, 500).unwrap();
        scheduler.add_task(connect_toggle, 100, 500).unwrap();
        running(&scheduler, &mut source);

        step(&scheduler, 100);
        assert_eq!(LINK.load(Ordering::Relaxed), 1);
        assert_eq!(CONNECT.load(Ordering::Relaxed), 0);

        step(&scheduler, 500);
        assert_eq!(scheduler.ticks(), 600);
        assert_eq!(LINK.load(Ordering::Relaxed), 2);
        assert_eq!(CONNECT.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_one_shot_task_fires_once() {
        static RUNS: AtomicU32 = AtomicU32::new(0);
        fn once() {
            RUNS.fetch_add(1, Ordering::Relaxed);
        }

        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        let id = scheduler.add_task(once, 7, 0).unwrap();
        running(&scheduler, &mut source);

        step(&scheduler, 1000);
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
        let stats = scheduler.stats(id).unwrap();
        assert!(stats.expired);
        assert_eq!(stats.overruns, 0);
    }

    #[test]
    fn test_same_tick_tasks_run_in_registration_order() {
        static ORDER: [AtomicUsize; 9] = [
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
        ];
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        fn record(tag: usize) {
            let pos = NEXT.fetch_add(1, Ordering::Relaxed);
            ORDER[pos].store(tag, Ordering::Relaxed);
        }
        fn first() {
            record(1);
        }
        fn second() {
            record(2);
        }
        fn third() {
            record(3);
        }

        let scheduler = Scheduler::<4>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        scheduler.add_task(third, 2, 4).unwrap();
        scheduler.add_task(first, 2, 4).unwrap();
        scheduler.add_task(second, 2, 4).unwrap();
        running(&scheduler, &mut source);

        // Firings on ticks 2, 6 and 10.
        step(&scheduler, 11);
        assert_eq!(NEXT.load(Ordering::Relaxed), 9);
        for round in ORDER.chunks(3) {
            let tags: [usize; 3] = [
                round[0].load(Ordering::Relaxed),
                round[1].load(Ordering::Relaxed),
                round[2].load(Ordering::Relaxed),
            ];
            assert_eq!(tags, [3, 1, 2]);
        }
    }

    #[test]
    fn test_slow_task_records_one_overrun_per_missed_period() {
        static SLOW: Scheduler<2> = Scheduler::new();
        static FIRST_RUN: AtomicBool = AtomicBool::new(true);
        static HOOK_MISSED: AtomicU32 = AtomicU32::new(0);
        static HOOK_TASK: AtomicUsize = AtomicUsize::new(usize::MAX);

        // Consumes 300 ticks the first time it runs.
        fn can_write() {
            if FIRST_RUN.swap(false, Ordering::Relaxed) {
                for _ in 0..300 {
                    SLOW.tick();
                }
            }
        }
        fn on_overrun(id: TaskId, missed: u32) {
            HOOK_TASK.store(id.index(), Ordering::Relaxed);
            HOOK_MISSED.fetch_add(missed, Ordering::Relaxed);
        }

        let mut source = ManualTickSource::default();
        SLOW.init().unwrap();
        SLOW.set_overrun_hook(on_overrun).unwrap();
        let id = SLOW.add_task(can_write, 3, 250).unwrap();
        SLOW.start(&mut source).unwrap();

        // Ticks 0..=3; the body runs after tick 3 and spans ticks 4..=303.
        step(&SLOW, 4);
        assert_eq!(SLOW.ticks(), 304);

        // Tick 253 found the task still pending.
        let stats = SLOW.stats(id).unwrap();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.run_time_last, 300);
        assert_eq!(stats.run_time_max, 300);
        assert_eq!(stats.latency_last, 0);
        assert!(!stats.due);
        assert_eq!(HOOK_MISSED.load(Ordering::Relaxed), 1);
        assert_eq!(HOOK_TASK.load(Ordering::Relaxed), 0);

        // Phase is unaffected: the next firing is tick 503.
        step(&SLOW, 199);
        assert_eq!(SLOW.stats(id).unwrap().runs, 1);
        step(&SLOW, 1);
        let stats = SLOW.stats(id).unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.run_time_last, 0);
        assert_eq!(SLOW.total_overruns(), 1);
        assert_eq!(HOOK_MISSED.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_overrun_counts_each_missed_period() {
        static BUSY: Scheduler<2> = Scheduler::new();
        static FIRST_RUN: AtomicBool = AtomicBool::new(true);

        // Spans 35 ticks of a 10-tick period once.
        fn hog() {
            if FIRST_RUN.swap(false, Ordering::Relaxed) {
                for _ in 0..35 {
                    BUSY.tick();
                }
            }
        }

        let mut source = ManualTickSource::default();
        BUSY.init().unwrap();
        let id = BUSY.add_task(hog, 0, 10).unwrap();
        BUSY.start(&mut source).unwrap();

        // Tick 0 fires; firings at 10, 20 and 30 are missed.
        step(&BUSY, 1);
        assert_eq!(BUSY.stats(id).unwrap().overruns, 3);

        // Back in phase: ticks 36..=39 idle, tick 40 fires.
        step(&BUSY, 4);
        assert_eq!(BUSY.stats(id).unwrap().runs, 1);
        step(&BUSY, 1);
        let stats = BUSY.stats(id).unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.overruns, 3);
    }

    #[test]
    fn test_late_dispatch_counts_overrun() {
        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        let id = scheduler.add_task(noop, 0, 2).unwrap();
        running(&scheduler, &mut source);

        // The main loop stalls for five ticks: firings at 0, 2, 4.
        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(scheduler.dispatch(), 1);
        let stats = scheduler.stats(id).unwrap();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.overruns, 2);
        // Due since tick 0, started after tick 4.
        assert_eq!(stats.latency_last, 4);
    }

    #[test]
    fn test_stalled_main_loop_records_dispatch_latency() {
        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        let id = scheduler.add_task(noop, 2, 10).unwrap();
        running(&scheduler, &mut source);

        // Due on tick 2; the main loop does not scan until after tick 6.
        for _ in 0..7 {
            scheduler.tick();
        }
        assert_eq!(scheduler.dispatch(), 1);
        let stats = scheduler.stats(id).unwrap();
        assert_eq!(stats.latency_last, 4);
        assert_eq!(stats.latency_max, 4);
        assert_eq!(stats.overruns, 0);

        // Ticks 7..=11 idle; tick 12 fires and is dispatched at once.
        step(&scheduler, 5);
        assert_eq!(scheduler.stats(id).unwrap().runs, 1);
        step(&scheduler, 1);
        let stats = scheduler.stats(id).unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.latency_last, 0);
        assert_eq!(stats.latency_max, 4);
    }

    #[test]
    fn test_ticks_ignored_unless_running() {
        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.tick();
        scheduler.init().unwrap();
        let id = scheduler.add_task(noop, 0, 1).unwrap();
        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(scheduler.ticks(), 0);
        assert!(!scheduler.stats(id).unwrap().due);
        assert_eq!(scheduler.dispatch(), 0);

        running(&scheduler, &mut source);
        scheduler.tick();
        assert_eq!(scheduler.ticks(), 1);
        assert!(scheduler.stats(id).unwrap().due);
    }

    #[test]
    fn test_stop_and_resume_keep_phase() {
        static RUNS: AtomicU32 = AtomicU32::new(0);
        fn count() {
            RUNS.fetch_add(1, Ordering::Relaxed);
        }

        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        let id = scheduler.add_task(count, 5, 10).unwrap();
        running(&scheduler, &mut source);

        step(&scheduler, 3);
        scheduler.stop(&mut source).unwrap();
        step(&scheduler, 100);
        assert_eq!(scheduler.ticks(), 3);
        assert_eq!(scheduler.stats(id).unwrap().delay, 2);

        scheduler.start(&mut source).unwrap();
        assert_eq!(source.arm_calls, 2);
        step(&scheduler, 2);
        assert_eq!(RUNS.load(Ordering::Relaxed), 0);
        step(&scheduler, 1);
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_init_resets_table_and_time() {
        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        scheduler.add_task(noop, 0, 1).unwrap();
        scheduler.add_task(noop, 0, 1).unwrap();
        running(&scheduler, &mut source);
        step(&scheduler, 10);
        scheduler.stop(&mut source).unwrap();

        scheduler.init().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Configuring);
        assert_eq!(scheduler.task_count(), 0);
        assert_eq!(scheduler.ticks(), 0);
        assert_eq!(scheduler.total_overruns(), 0);
        assert_eq!(scheduler.add_task(noop, 4, 8), Ok(TaskId(0)));
        assert_eq!(scheduler.stats(TaskId(0)).unwrap().runs, 0);
    }

    #[test]
    fn test_uptime_follows_ticks() {
        let scheduler = Scheduler::<1>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        running(&scheduler, &mut source);
        step(&scheduler, 1500);
        assert_eq!(scheduler.uptime_ms(), timer::ticks_to_ms(1500));

        // Time spent stopped does not count.
        scheduler.stop(&mut source).unwrap();
        for _ in 0..200 {
            scheduler.tick();
        }
        assert_eq!(scheduler.ticks(), 1500);
        scheduler.start(&mut source).unwrap();
        step(&scheduler, 10);
        assert_eq!(scheduler.ticks(), 1510);
        assert_eq!(scheduler.uptime_ms(), timer::ticks_to_ms(1510));
    }

    #[test]
    fn test_dispatch_with_nothing_due() {
        let scheduler = Scheduler::<2>::new();
        let mut source = ManualTickSource::default();
        scheduler.init().unwrap();
        scheduler.add_task(noop, 10, 10).unwrap();
        running(&scheduler, &mut source);
        scheduler.tick();
        assert_eq!(scheduler.dispatch(), 0);
    }
}
