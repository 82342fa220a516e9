//! # ttsched — Time-Triggered Cooperative Scheduler
//!
//! A minimal scheduler for bare-metal ARM Cortex-M microcontrollers that
//! runs a fixed set of periodic jobs at programmer-chosen offsets and
//! periods, driven by a single hardware tick, without preemption.
//!
//! ## Overview
//!
//! The workload is a handful of short, non-blocking jobs (toggling LEDs,
//! polling a CAN controller, refreshing a display). Deterministic timing
//! and a tiny footprint matter more than isolation between tasks:
//!
//! - **Each task has an offset and a period** in ticks; offsets spread
//!   tasks across ticks so their bodies do not pile up
//! - **Tasks run to completion** in Thread mode, in registration order
//! - **Overruns are detected, not prevented**: a task still pending when
//!   its next firing arrives is counted and reported
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │     init() · add_task() · start() · dispatch() · run() │
//! ├──────────────────────────────┬─────────────────────────┤
//! │  Scheduler (scheduler.rs)    │  Sync (sync.rs)         │
//! │  ─ tick()      [ISR]         │  ─ critical_section()   │
//! │  ─ dispatch()  [Thread]      │                         │
//! ├──────────────────────────────┴─────────────────────────┤
//! │   Task Table (task.rs)        Tick Source (timer.rs)    │
//! │   TaskSlot · TaskId · Stats   TickSource trait          │
//! ├────────────────────────────────────────────────────────┤
//! │        Arch Port (arch/cortex_m4.rs, logger.rs)         │
//! │          SysTick · WFI idle · ITM log output            │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timing Model
//!
//! Ticks are numbered from 0 after `start()`. A task registered with
//! offset `d` and period `p` becomes due on ticks `d`, `d + p`, `d + 2p`, …
//! A period of 0 makes the task one-shot. The sum of the bodies due on one
//! tick must fit in one tick period; the overrun counters help verify it.
//!
//! ## Memory Model
//!
//! - **No heap**: the task table is a fixed `[TaskSlot; N]`
//! - **No locks on the hot path**: each runtime field has one writer
//!   (tick handler or dispatcher), accessed with plain atomic load/store
//! - **Critical sections** only while configuring the table

#![no_std]

pub mod config;
pub mod error;
pub mod task;
pub mod timer;
pub mod sync;
pub mod scheduler;
pub mod kernel;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod arch;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod logger;

pub use error::SchedulerError;
pub use scheduler::{Scheduler, SchedulerState};
pub use task::{OverrunHook, TaskBuilder, TaskConfig, TaskFn, TaskId, TaskStats};
pub use timer::TickSource;
